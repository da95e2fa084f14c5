//! Pricing and timeline rules for turning a cart into an order.
//!
//! Everything here is pure: the database handlers load rows, hand them to
//! these functions, and persist what comes back inside one transaction.

use crate::error::ServiceError;
use crate::services::db_models::StatusUpdate;
use crate::types::OrderStatus;

/// A cart line joined with the dish's current catalog state.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub dish_id: i64,
    pub quantity: i32,
    pub price_cents: i64,
    pub is_available: bool,
}

impl From<(i64, i32, i64, bool)> for CartLine {
    fn from((dish_id, quantity, price_cents, is_available): (i64, i32, i64, bool)) -> Self {
        Self { dish_id, quantity, price_cents, is_available }
    }
}

/// A line with its price frozen at checkout time.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub dish_id: i64,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub lines: Vec<PricedLine>,
    pub subtotal_cents: i64,
    pub delivery_fee_cents: i64,
    pub total_amount_cents: i64,
}

fn overflow() -> ServiceError {
    ServiceError::Validation("Order amount is out of range".to_owned())
}

pub fn quote(lines: &[CartLine], delivery_fee_cents: i64) -> Result<Quote, ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::EmptyCart);
    }
    if delivery_fee_cents < 0 {
        return Err(ServiceError::Validation(
            "Delivery fee cannot be negative".to_owned(),
        ));
    }

    let mut priced = Vec::with_capacity(lines.len());
    let mut subtotal_cents: i64 = 0;

    for line in lines {
        if !line.is_available {
            return Err(ServiceError::DishUnavailable(line.dish_id));
        }
        validate_quantity(line.quantity)?;
        if line.price_cents < 0 {
            return Err(ServiceError::Validation(format!(
                "Dish {} has a negative price",
                line.dish_id
            )));
        }

        let line_subtotal = line
            .price_cents
            .checked_mul(i64::from(line.quantity))
            .ok_or_else(overflow)?;
        subtotal_cents = subtotal_cents.checked_add(line_subtotal).ok_or_else(overflow)?;

        priced.push(PricedLine {
            dish_id: line.dish_id,
            quantity: line.quantity,
            unit_price_cents: line.price_cents,
            subtotal_cents: line_subtotal,
        });
    }

    let total_amount_cents = subtotal_cents
        .checked_add(delivery_fee_cents)
        .ok_or_else(overflow)?;

    Ok(Quote {
        lines: priced,
        subtotal_cents,
        delivery_fee_cents,
        total_amount_cents,
    })
}

pub fn validate_quantity(quantity: i32) -> Result<(), ServiceError> {
    if quantity < 1 {
        Err(ServiceError::Validation(format!(
            "Quantity must be at least 1, got {quantity}"
        )))
    } else {
        Ok(())
    }
}

/// Quantity after adding `added` to an existing cart line, if any.
pub fn merged_quantity(existing: Option<i32>, added: i32) -> Result<i32, ServiceError> {
    validate_quantity(added)?;

    existing.unwrap_or(0).checked_add(added).ok_or_else(|| {
        ServiceError::Validation(format!(
            "Quantity cannot exceed {} for one dish",
            i32::MAX
        ))
    })
}

pub fn validate_payment_amount(total_amount_cents: i64, amount_cents: i64) -> Result<(), ServiceError> {
    if total_amount_cents == amount_cents {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!(
            "Payment amount {amount_cents} does not match order total {total_amount_cents}"
        )))
    }
}

/// The most recent entry wins; ties on time are broken by insertion id.
pub fn latest_status(updates: &[StatusUpdate]) -> Result<OrderStatus, ServiceError> {
    updates
        .iter()
        .max_by_key(|update| (update.time, update.id))
        .map(|update| update.status.parse())
        .unwrap_or(Ok(OrderStatus::Placed))
}

/// Checks a new timeline entry against the current status.
pub fn check_status_append(current: OrderStatus, next: OrderStatus) -> Result<(), ServiceError> {
    if !next.is_recordable() {
        return Err(ServiceError::Validation(format!(
            "'{next}' cannot be recorded as a status update"
        )));
    }
    if !next.may_follow(current) {
        return Err(ServiceError::InvalidTransition(format!(
            "Order cannot move from {current} to {next}"
        )));
    }

    Ok(())
}
