use actix::Handler;
use diesel::{
    BoolExpressionMethods, ExpressionMethods, OptionalExtension, PgConnection, QueryDsl, RunQueryDsl,
    SelectableHelper,
};

use crate::auth::authorize;
use crate::error::ServiceError;
use crate::services::db_models::Address;
use crate::services::db_utils::PgActor;
use crate::services::messages::{CreateAddress, DeleteAddress, FetchAddresses, UpdateAddress};

/// Drops the default flag from every address of `owner_id` except `keep`.
fn clear_default(conn: &mut PgConnection, owner_id: i64, keep: Option<i64>) -> Result<usize, ServiceError> {
    use crate::schema::addresses::{dsl::addresses, id, is_default, user_id};

    let siblings = addresses.filter(user_id.eq(owner_id).and(is_default.eq(true)));

    let cleared = match keep {
        Some(keep_id) => diesel::update(siblings.filter(id.ne(keep_id)))
            .set(is_default.eq(false))
            .execute(conn)?,
        None => diesel::update(siblings).set(is_default.eq(false)).execute(conn)?,
    };

    Ok(cleared)
}

impl Handler<FetchAddresses> for PgActor {
    type Result = Result<Vec<Address>, ServiceError>;

    fn handle(&mut self, msg: FetchAddresses, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::addresses::{created_at, dsl::addresses, id, is_default, user_id};

        let mut conn = self.connection()?;

        Ok(addresses
            .filter(user_id.eq(msg.0.user_id))
            .order((is_default.desc(), created_at.desc(), id.desc()))
            .select(Address::as_select())
            .load(&mut conn)?)
    }
}

impl Handler<CreateAddress> for PgActor {
    type Result = Result<Address, ServiceError>;

    fn handle(&mut self, msg: CreateAddress, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::addresses::dsl::addresses;

        let mut conn = self.connection()?;
        let mut new_address = msg.address;
        new_address.user_id = msg.principal.user_id;

        conn.build_transaction().run(|trx_conn| {
            if new_address.is_default {
                clear_default(trx_conn, new_address.user_id, None)?;
            }

            Ok(diesel::insert_into(addresses)
                .values(&new_address)
                .returning(Address::as_returning())
                .get_result(trx_conn)?)
        })
    }
}

impl Handler<UpdateAddress> for PgActor {
    type Result = Result<Address, ServiceError>;

    fn handle(&mut self, msg: UpdateAddress, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::addresses::dsl::addresses;

        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| {
            let address = addresses
                .find(msg.address_id)
                .for_update()
                .select(Address::as_select())
                .first(trx_conn)
                .optional()?
                .ok_or_else(|| ServiceError::not_found(format!("Address {}", msg.address_id)))?;

            authorize(&msg.principal, address.user_id)?;

            if msg.changes.is_empty() {
                return Ok(address);
            }
            if msg.changes.is_default == Some(true) {
                clear_default(trx_conn, address.user_id, Some(address.id))?;
            }

            Ok(diesel::update(addresses.find(address.id))
                .set(&msg.changes)
                .returning(Address::as_returning())
                .get_result(trx_conn)?)
        })
    }
}

impl Handler<DeleteAddress> for PgActor {
    type Result = Result<(), ServiceError>;

    fn handle(&mut self, msg: DeleteAddress, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::addresses::{dsl::addresses, user_id};

        let mut conn = self.connection()?;

        let owner = addresses
            .find(msg.address_id)
            .select(user_id)
            .first::<i64>(&mut conn)
            .optional()?
            .ok_or_else(|| ServiceError::not_found(format!("Address {}", msg.address_id)))?;

        authorize(&msg.principal, owner)?;

        // Orders keep a reference to their address, so the FK refuses the delete.
        diesel::delete(addresses.find(msg.address_id))
            .execute(&mut conn)
            .map_err(|err| match ServiceError::from(err) {
                ServiceError::Conflict(_) => ServiceError::Conflict(
                    "The address is used by an existing order".to_owned(),
                ),
                other => other,
            })?;

        Ok(())
    }
}
