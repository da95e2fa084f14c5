use actix::Handler;
use chrono::{Duration, Utc};
use diesel::{ExpressionMethods, OptionalExtension, PgConnection, QueryDsl, RunQueryDsl, SelectableHelper};

use super::cart::touch_cart;
use super::{get_address, get_order, lock_order};
use crate::auth::require_admin;
use crate::error::ServiceError;
use crate::services::checkout::{self, CartLine};
use crate::services::db_models::{
    Cart, CurrentStatus, Order, OrderDetail, OrderItem, Payment, StatusUpdate,
};
use crate::services::db_utils::PgActor;
use crate::services::insertable::{NewOrder, NewOrderItem, NewPayment, NewStatusUpdate};
use crate::services::messages::{
    AppendStatus, FetchCurrentStatus, FetchOrder, FetchOrders, FetchPayment, FetchStatusUpdates,
    PlaceOrder, RecordPayment, TransitionPayment,
};
use crate::types::{PaymentMethod, PaymentStatus};

/// Creates the single pending payment row of an order.
fn record_payment(
    conn: &mut PgConnection,
    order: &Order,
    method: PaymentMethod,
    amount_cents: i64,
) -> Result<Payment, ServiceError> {
    use crate::schema::payments::dsl::payments;

    checkout::validate_payment_amount(order.total_amount_cents, amount_cents)?;

    diesel::insert_into(payments)
        .values(NewPayment {
            order_id: order.id,
            amount_cents,
            method: method.to_string(),
            status: PaymentStatus::Pending.to_string(),
            transaction_id: String::new(),
        })
        .returning(Payment::as_returning())
        .get_result(conn)
        .map_err(|err| match ServiceError::from(err) {
            ServiceError::Conflict(_) => {
                ServiceError::Conflict(format!("Order {} already has a payment", order.id))
            }
            other => other,
        })
}

fn status_timeline(conn: &mut PgConnection, order_pk: i64) -> Result<Vec<StatusUpdate>, ServiceError> {
    use crate::schema::status_updates::{dsl::status_updates, id, order_id, time};

    Ok(status_updates
        .filter(order_id.eq(order_pk))
        .order((time.desc(), id.desc()))
        .select(StatusUpdate::as_select())
        .load(conn)?)
}

fn order_detail(conn: &mut PgConnection, order: Order) -> Result<OrderDetail, ServiceError> {
    use crate::schema::order_items::{dsl::order_items, id as item_pk, order_id as item_order};
    use crate::schema::payments::{dsl::payments, order_id as payment_order};

    let items = order_items
        .filter(item_order.eq(order.id))
        .order(item_pk.asc())
        .select(OrderItem::as_select())
        .load(conn)?;

    let payment = payments
        .filter(payment_order.eq(order.id))
        .select(Payment::as_select())
        .first(conn)
        .optional()?;

    let timeline = status_timeline(conn, order.id)?;
    let status = checkout::latest_status(&timeline)?;

    Ok(OrderDetail {
        order,
        items,
        payment,
        status,
        status_updates: timeline,
    })
}

impl Handler<PlaceOrder> for PgActor {
    type Result = Result<OrderDetail, ServiceError>;

    fn handle(&mut self, msg: PlaceOrder, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::cart_items::{cart_id, dsl::cart_items, id as line_pk};
        use crate::schema::carts::{dsl::carts, user_id as cart_owner};
        use crate::schema::dishes::{dsl::dishes, is_available, price_cents};
        use crate::schema::order_items::dsl::order_items;
        use crate::schema::orders::dsl::orders;

        let mut conn = self.connection()?;

        // Everything below commits together or not at all; a failure leaves the cart untouched.
        let detail = conn.build_transaction().run(|trx_conn| {
            // Locking the cart row serializes concurrent checkouts and add-to-cart merges.
            let cart = carts
                .filter(cart_owner.eq(msg.principal.user_id))
                .for_update()
                .select(Cart::as_select())
                .first(trx_conn)
                .optional()?
                .ok_or(ServiceError::EmptyCart)?;

            let lines: Vec<CartLine> = cart_items
                .inner_join(dishes)
                .filter(cart_id.eq(cart.id))
                .order(line_pk.asc())
                .select((
                    crate::schema::cart_items::dish_id,
                    crate::schema::cart_items::quantity,
                    price_cents,
                    is_available,
                ))
                .load::<(i64, i32, i64, bool)>(trx_conn)?
                .into_iter()
                .map(CartLine::from)
                .collect();

            if lines.is_empty() {
                return Err(ServiceError::EmptyCart);
            }

            let address = get_address(trx_conn, msg.principal.user_id, msg.address_id)?;
            let quote = checkout::quote(&lines, msg.delivery_fee_cents)?;

            let placed_at = Utc::now();
            let order = diesel::insert_into(orders)
                .values(NewOrder {
                    user_id: msg.principal.user_id,
                    address_id: address.id,
                    placed_at,
                    estimated_delivery: placed_at + Duration::minutes(msg.estimated_delivery_minutes),
                    subtotal_cents: quote.subtotal_cents,
                    delivery_fee_cents: quote.delivery_fee_cents,
                    total_amount_cents: quote.total_amount_cents,
                })
                .returning(Order::as_returning())
                .get_result(trx_conn)?;

            let new_items: Vec<NewOrderItem> = quote
                .lines
                .iter()
                .map(|line| NewOrderItem {
                    order_id: order.id,
                    dish_id: line.dish_id,
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price_cents,
                    subtotal_cents: line.subtotal_cents,
                })
                .collect();

            let items = diesel::insert_into(order_items)
                .values(&new_items)
                .returning(OrderItem::as_returning())
                .get_results(trx_conn)?;

            let payment = record_payment(trx_conn, &order, msg.method, order.total_amount_cents)?;

            diesel::delete(cart_items.filter(cart_id.eq(cart.id))).execute(trx_conn)?;
            touch_cart(trx_conn, cart.id)?;

            Ok(OrderDetail {
                order,
                items,
                payment: Some(payment),
                status: crate::types::OrderStatus::Placed,
                status_updates: Vec::new(),
            })
        })?;

        tracing::info!(
            order_id = detail.order.id,
            user_id = detail.order.user_id,
            total_amount_cents = detail.order.total_amount_cents,
            "order placed"
        );

        Ok(detail)
    }
}

impl Handler<FetchOrders> for PgActor {
    type Result = Result<Vec<Order>, ServiceError>;

    fn handle(&mut self, msg: FetchOrders, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::orders::{dsl::orders, id, placed_at, user_id};

        let mut query = orders
            .order((placed_at.desc(), id.desc()))
            .select(Order::as_select())
            .into_boxed();

        if msg.all_users {
            require_admin(&msg.principal)?;
        } else {
            query = query.filter(user_id.eq(msg.principal.user_id));
        }

        let mut conn = self.connection()?;

        Ok(query.load(&mut conn)?)
    }
}

impl Handler<FetchOrder> for PgActor {
    type Result = Result<OrderDetail, ServiceError>;

    fn handle(&mut self, msg: FetchOrder, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        // Repeatable read so items, payment and timeline come from one snapshot.
        conn.build_transaction().repeatable_read().read_only().run(|trx_conn| {
            let order = get_order(trx_conn, &msg.principal, msg.order_id)?;
            order_detail(trx_conn, order)
        })
    }
}

impl Handler<RecordPayment> for PgActor {
    type Result = Result<Payment, ServiceError>;

    fn handle(&mut self, msg: RecordPayment, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| {
            let order = lock_order(trx_conn, &msg.principal, msg.order_id)?;
            record_payment(trx_conn, &order, msg.method, msg.amount_cents)
        })
    }
}

impl Handler<FetchPayment> for PgActor {
    type Result = Result<Payment, ServiceError>;

    fn handle(&mut self, msg: FetchPayment, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::payments::{dsl::payments, order_id};

        let mut conn = self.connection()?;

        let order = get_order(&mut conn, &msg.principal, msg.order_id)?;

        payments
            .filter(order_id.eq(order.id))
            .select(Payment::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| ServiceError::not_found(format!("Payment for order {}", order.id)))
    }
}

impl Handler<TransitionPayment> for PgActor {
    type Result = Result<Payment, ServiceError>;

    fn handle(&mut self, msg: TransitionPayment, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::payments::{dsl::payments, status, transaction_id};

        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| {
            let payment = payments
                .find(msg.payment_id)
                .for_update()
                .select(Payment::as_select())
                .first(trx_conn)
                .optional()?
                .ok_or_else(|| ServiceError::not_found(format!("Payment {}", msg.payment_id)))?;

            get_order(trx_conn, &msg.principal, payment.order_id)?;

            let current: PaymentStatus = payment.status.parse()?;
            let next = current.transition(msg.status)?;

            let reference = msg.transaction_id.unwrap_or(payment.transaction_id);

            let updated = diesel::update(payments.find(payment.id))
                .set((status.eq(next.to_string()), transaction_id.eq(reference)))
                .returning(Payment::as_returning())
                .get_result(trx_conn)?;

            tracing::info!(payment_id = updated.id, from = %current, to = %next, "payment transitioned");

            Ok(updated)
        })
    }
}

impl Handler<AppendStatus> for PgActor {
    type Result = Result<StatusUpdate, ServiceError>;

    fn handle(&mut self, msg: AppendStatus, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::status_updates::dsl::status_updates;

        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| {
            // The order row lock keeps concurrent appends for one order in sequence.
            let order = lock_order(trx_conn, &msg.principal, msg.order_id)?;

            let current = checkout::latest_status(&status_timeline(trx_conn, order.id)?)?;
            checkout::check_status_append(current, msg.status)?;

            let update = diesel::insert_into(status_updates)
                .values(NewStatusUpdate {
                    order_id: order.id,
                    status: msg.status.to_string(),
                    time: Utc::now(),
                })
                .returning(StatusUpdate::as_returning())
                .get_result(trx_conn)?;

            tracing::info!(order_id = order.id, status = %msg.status, "order status appended");

            Ok(update)
        })
    }
}

impl Handler<FetchCurrentStatus> for PgActor {
    type Result = Result<CurrentStatus, ServiceError>;

    fn handle(&mut self, msg: FetchCurrentStatus, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::status_updates::{dsl::status_updates, id, order_id, time};

        let mut conn = self.connection()?;

        let order = get_order(&mut conn, &msg.principal, msg.order_id)?;

        let latest = status_updates
            .filter(order_id.eq(order.id))
            .order((time.desc(), id.desc()))
            .select(StatusUpdate::as_select())
            .first(&mut conn)
            .optional()?;

        let since = latest.as_ref().map(|update| update.time);
        let status = checkout::latest_status(&latest.into_iter().collect::<Vec<_>>())?;

        Ok(CurrentStatus {
            order_id: order.id,
            status,
            since,
        })
    }
}

impl Handler<FetchStatusUpdates> for PgActor {
    type Result = Result<Vec<StatusUpdate>, ServiceError>;

    fn handle(&mut self, msg: FetchStatusUpdates, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let order = get_order(&mut conn, &msg.principal, msg.order_id)?;

        status_timeline(&mut conn, order.id)
    }
}
