use diesel::{OptionalExtension, PgConnection, QueryDsl, RunQueryDsl, SelectableHelper};

use crate::auth::{authorize, Principal};
use crate::error::ServiceError;
use crate::services::db_models::{Address, Order};

pub mod addresses;
pub mod cart;
pub mod catalog;
pub mod identity;
pub mod orders;
pub mod reviews;

#[cfg(test)]
mod tests;

/// Loads an order and checks the caller may see it.
fn get_order(conn: &mut PgConnection, principal: &Principal, order_id: i64) -> Result<Order, ServiceError> {
    use crate::schema::orders::dsl::orders;

    let order = orders
        .find(order_id)
        .select(Order::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found(format!("Order {order_id}")))?;

    authorize(principal, order.user_id)?;

    Ok(order)
}

/// Same as [`get_order`] but holds a row lock until the transaction ends.
fn lock_order(conn: &mut PgConnection, principal: &Principal, order_id: i64) -> Result<Order, ServiceError> {
    use crate::schema::orders::dsl::orders;

    let order = orders
        .find(order_id)
        .for_update()
        .select(Order::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found(format!("Order {order_id}")))?;

    authorize(principal, order.user_id)?;

    Ok(order)
}

/// Address lookup for checkout: the address must belong to the caller.
fn get_address(conn: &mut PgConnection, owner_id: i64, address_id: i64) -> Result<Address, ServiceError> {
    use crate::schema::addresses::dsl::addresses;

    let address = addresses
        .find(address_id)
        .select(Address::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found(format!("Address {address_id}")))?;

    if address.user_id != owner_id {
        return Err(ServiceError::Forbidden(
            "The address belongs to another user".to_owned(),
        ));
    }

    Ok(address)
}
