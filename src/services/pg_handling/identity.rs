use actix::Handler;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};

use crate::auth::{authorize, hash_password, require_admin, verify_password};
use crate::error::ServiceError;
use crate::services::db_models::User;
use crate::services::db_utils::PgActor;
use crate::services::insertable::NewUser;
use crate::services::messages::{
    ChangePassword, DeleteUser, FetchUser, FetchUserByEmail, RegisterUser, UpdateUser,
};
use crate::services::validate;
use crate::types::Role;

impl Handler<RegisterUser> for PgActor {
    type Result = Result<User, ServiceError>;

    fn handle(&mut self, msg: RegisterUser, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::users::dsl::users;

        let mut conn = self.connection()?;

        let user = diesel::insert_into(users)
            .values(NewUser {
                first_name: msg.first_name,
                last_name: msg.last_name,
                email: msg.email.trim().to_lowercase(),
                phone: msg.phone.trim().to_owned(),
                role: Role::Customer.to_string(),
                password_hash: hash_password(&msg.password)?,
            })
            .returning(User::as_returning())
            .get_result(&mut conn)?;

        tracing::info!(user_id = user.id, "registered user");

        Ok(user)
    }
}

impl Handler<FetchUserByEmail> for PgActor {
    type Result = Result<User, ServiceError>;

    fn handle(&mut self, msg: FetchUserByEmail, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::users::{dsl::users, email};

        let mut conn = self.connection()?;

        users
            .filter(email.eq(msg.0.trim().to_lowercase()))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| ServiceError::not_found("User"))
    }
}

impl Handler<FetchUser> for PgActor {
    type Result = Result<User, ServiceError>;

    fn handle(&mut self, msg: FetchUser, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::users::dsl::users;

        authorize(&msg.principal, msg.user_id)?;

        let mut conn = self.connection()?;

        users
            .find(msg.user_id)
            .select(User::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| ServiceError::not_found(format!("User {}", msg.user_id)))
    }
}

impl Handler<UpdateUser> for PgActor {
    type Result = Result<User, ServiceError>;

    fn handle(&mut self, msg: UpdateUser, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::users::dsl::users;

        authorize(&msg.principal, msg.user_id)?;

        let mut changes = msg.changes;
        if let Some(role) = &changes.role {
            require_admin(&msg.principal)?;
            role.parse::<Role>()?;
        }
        if let Some(new_email) = &changes.email {
            validate::email_address(new_email)?;
            changes.email = Some(new_email.trim().to_lowercase());
        }

        let mut conn = self.connection()?;

        if changes.is_empty() {
            return users
                .find(msg.user_id)
                .select(User::as_select())
                .first(&mut conn)
                .optional()?
                .ok_or_else(|| ServiceError::not_found(format!("User {}", msg.user_id)));
        }

        diesel::update(users.find(msg.user_id))
            .set(&changes)
            .returning(User::as_returning())
            .get_result(&mut conn)
            .optional()?
            .ok_or_else(|| ServiceError::not_found(format!("User {}", msg.user_id)))
    }
}

impl Handler<ChangePassword> for PgActor {
    type Result = Result<(), ServiceError>;

    fn handle(&mut self, msg: ChangePassword, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::users::{dsl::users, password_hash};

        let user_pk = msg.principal.user_id;
        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| {
            let stored = users
                .find(user_pk)
                .for_update()
                .select(password_hash)
                .first::<String>(trx_conn)
                .optional()?
                .ok_or_else(|| ServiceError::not_found(format!("User {user_pk}")))?;

            if !verify_password(&msg.current_password, &stored) {
                return Err(ServiceError::Unauthorized(
                    "Current password is incorrect".to_owned(),
                ));
            }

            diesel::update(users.find(user_pk))
                .set(password_hash.eq(hash_password(&msg.new_password)?))
                .execute(trx_conn)?;

            tracing::info!(user_id = user_pk, "password changed");

            Ok(())
        })
    }
}

impl Handler<DeleteUser> for PgActor {
    type Result = Result<(), ServiceError>;

    fn handle(&mut self, msg: DeleteUser, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::users::dsl::users;

        authorize(&msg.principal, msg.user_id)?;

        let mut conn = self.connection()?;

        match diesel::delete(users.find(msg.user_id)).execute(&mut conn)? {
            0 => Err(ServiceError::not_found(format!("User {}", msg.user_id))),
            _ => {
                tracing::info!(user_id = msg.user_id, "deleted user");
                Ok(())
            }
        }
    }
}
