use actix::Handler;
use chrono::Utc;
use diesel::upsert::excluded;
use diesel::{ExpressionMethods, OptionalExtension, PgConnection, QueryDsl, RunQueryDsl, SelectableHelper};

use crate::auth::{authorize, Principal};
use crate::error::ServiceError;
use crate::services::checkout::{merged_quantity, validate_quantity};
use crate::services::db_models::{Cart, CartItem, CartLineView, CartView, Dish};
use crate::services::db_utils::PgActor;
use crate::services::insertable::{NewCart, NewCartItem};
use crate::services::messages::{
    AddCartItem, ClearCart, GetOrCreateCart, RemoveCartItem, UpdateCartItem,
};

/// One cart per user, created on first use.
pub(super) fn get_or_create_cart(conn: &mut PgConnection, owner_id: i64) -> Result<Cart, ServiceError> {
    use crate::schema::carts::{dsl::carts, user_id};

    diesel::insert_into(carts)
        .values(NewCart { user_id: owner_id })
        .on_conflict(user_id)
        .do_nothing()
        .execute(conn)?;

    Ok(carts
        .filter(user_id.eq(owner_id))
        .select(Cart::as_select())
        .first(conn)?)
}

pub(super) fn touch_cart(conn: &mut PgConnection, cart_pk: i64) -> Result<(), ServiceError> {
    use crate::schema::carts::{dsl::carts, updated_at};

    diesel::update(carts.find(cart_pk))
        .set(updated_at.eq(Utc::now()))
        .execute(conn)?;

    Ok(())
}

fn list_lines(conn: &mut PgConnection, cart_pk: i64) -> Result<Vec<CartLineView>, ServiceError> {
    use crate::schema::cart_items::{cart_id, dsl::cart_items, id};
    use crate::schema::dishes::dsl::dishes;

    let rows = cart_items
        .inner_join(dishes)
        .filter(cart_id.eq(cart_pk))
        .order(id.asc())
        .select((CartItem::as_select(), Dish::as_select()))
        .load::<(CartItem, Dish)>(conn)?;

    Ok(rows
        .into_iter()
        .map(|(item, dish)| CartLineView {
            id: item.id,
            dish_id: dish.id,
            dish_name: dish.name,
            unit_price_cents: dish.price_cents,
            is_available: dish.is_available,
            quantity: item.quantity,
            line_total_cents: dish.price_cents.saturating_mul(i64::from(item.quantity)),
        })
        .collect())
}

/// Loads a cart item together with its cart and checks ownership.
fn owned_item(
    conn: &mut PgConnection,
    principal: &Principal,
    item_pk: i64,
) -> Result<CartItem, ServiceError> {
    use crate::schema::cart_items::dsl::cart_items;
    use crate::schema::carts::{dsl::carts, user_id};

    let (item, owner) = cart_items
        .find(item_pk)
        .inner_join(carts)
        .select((CartItem::as_select(), user_id))
        .first::<(CartItem, i64)>(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found(format!("Cart item {item_pk}")))?;

    authorize(principal, owner)?;

    Ok(item)
}

impl Handler<GetOrCreateCart> for PgActor {
    type Result = Result<CartView, ServiceError>;

    fn handle(&mut self, msg: GetOrCreateCart, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let cart = get_or_create_cart(&mut conn, msg.0.user_id)?;
        let items = list_lines(&mut conn, cart.id)?;

        Ok(CartView { cart, items })
    }
}

impl Handler<ClearCart> for PgActor {
    type Result = Result<CartView, ServiceError>;

    fn handle(&mut self, msg: ClearCart, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::cart_items::{cart_id, dsl::cart_items};

        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| {
            let cart = get_or_create_cart(trx_conn, msg.0.user_id)?;
            touch_cart(trx_conn, cart.id)?;

            let removed = diesel::delete(cart_items.filter(cart_id.eq(cart.id))).execute(trx_conn)?;
            tracing::debug!(cart_id = cart.id, removed, "cart cleared");

            Ok(CartView { cart, items: Vec::new() })
        })
    }
}

impl Handler<AddCartItem> for PgActor {
    type Result = Result<CartItem, ServiceError>;

    fn handle(&mut self, msg: AddCartItem, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::cart_items::{cart_id, dish_id, dsl::cart_items, quantity};
        use crate::schema::dishes::{dsl::dishes, is_available};

        validate_quantity(msg.quantity)?;

        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| {
            let available = dishes
                .find(msg.dish_id)
                .select(is_available)
                .first::<bool>(trx_conn)
                .optional()?;

            if available != Some(true) {
                return Err(ServiceError::not_found(format!(
                    "Available dish {}",
                    msg.dish_id
                )));
            }

            let cart = get_or_create_cart(trx_conn, msg.principal.user_id)?;
            // Row lock on the cart; a checkout in flight finishes first.
            touch_cart(trx_conn, cart.id)?;

            let existing = cart_items
                .filter(cart_id.eq(cart.id))
                .filter(dish_id.eq(msg.dish_id))
                .select(quantity)
                .first::<i32>(trx_conn)
                .optional()?;
            merged_quantity(existing, msg.quantity)?;

            // The (cart_id, dish_id) unique key turns a repeat add into an atomic increment.
            let item = diesel::insert_into(cart_items)
                .values(NewCartItem {
                    cart_id: cart.id,
                    dish_id: msg.dish_id,
                    quantity: msg.quantity,
                })
                .on_conflict((cart_id, dish_id))
                .do_update()
                .set(quantity.eq(quantity + excluded(quantity)))
                .returning(CartItem::as_returning())
                .get_result(trx_conn)?;

            tracing::debug!(cart_id = cart.id, dish_id = msg.dish_id, quantity = item.quantity, "cart item merged");

            Ok(item)
        })
    }
}

impl Handler<UpdateCartItem> for PgActor {
    type Result = Result<CartItem, ServiceError>;

    fn handle(&mut self, msg: UpdateCartItem, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::cart_items::{dsl::cart_items, quantity};

        validate_quantity(msg.quantity)?;

        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| {
            let item = owned_item(trx_conn, &msg.principal, msg.item_id)?;

            let updated = diesel::update(cart_items.find(item.id))
                .set(quantity.eq(msg.quantity))
                .returning(CartItem::as_returning())
                .get_result(trx_conn)?;

            touch_cart(trx_conn, item.cart_id)?;

            Ok(updated)
        })
    }
}

impl Handler<RemoveCartItem> for PgActor {
    type Result = Result<(), ServiceError>;

    fn handle(&mut self, msg: RemoveCartItem, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::cart_items::dsl::cart_items;

        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| {
            let item = owned_item(trx_conn, &msg.principal, msg.item_id)?;

            diesel::delete(cart_items.find(item.id)).execute(trx_conn)?;
            touch_cart(trx_conn, item.cart_id)?;

            Ok(())
        })
    }
}
