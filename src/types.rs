use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

pub const MENU_KEY: &str = "menu";
pub const ACTIVE_MENU_KEY: &str = "menu_active";
pub const MENU_VERSION_KEY: &str = "menu_version";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Wallet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Delivery state of an order. `Placed` is never stored: it is what an order
/// reports before its first status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Placed,
    Ready,
    OnTheWay,
    Delivered,
    Cancelled,
}

macro_rules! string_enum {
    ($ty:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl Display for $ty {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ServiceError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(ServiceError::Validation(format!("Unknown {} '{other}'", $label))),
                }
            }
        }
    };
}

string_enum!(Role, "role", { Customer => "customer", Admin => "admin" });
string_enum!(PaymentMethod, "payment method", { Cash => "cash", Card => "card", Wallet => "wallet" });
string_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Refunded => "refunded",
});
string_enum!(OrderStatus, "order status", {
    Placed => "placed",
    Ready => "ready",
    OnTheWay => "on_the_way",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl PaymentStatus {
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;

        matches!(
            (self, next),
            (Pending, Paid) | (Pending, Failed) | (Paid, Refunded)
        )
    }

    pub fn transition(self, next: PaymentStatus) -> Result<PaymentStatus, ServiceError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ServiceError::InvalidTransition(format!(
                "Payment cannot move from {self} to {next}"
            )))
        }
    }
}

impl OrderStatus {
    /// Whether a status update with this value may be written to the timeline.
    pub fn is_recordable(self) -> bool {
        self != OrderStatus::Placed
    }

    #[cfg(feature = "strict-status")]
    pub fn may_follow(self, current: OrderStatus) -> bool {
        use OrderStatus::*;

        matches!(
            (current, self),
            (Placed, Ready)
                | (Ready, OnTheWay)
                | (OnTheWay, Delivered)
                | (Placed, Cancelled)
                | (Ready, Cancelled)
                | (OnTheWay, Cancelled)
        )
    }

    #[cfg(not(feature = "strict-status"))]
    pub fn may_follow(self, _current: OrderStatus) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_moves_forward_only() {
        use PaymentStatus::*;

        assert_eq!(Pending.transition(Paid).unwrap(), Paid);
        assert_eq!(Pending.transition(Failed).unwrap(), Failed);
        assert_eq!(Paid.transition(Refunded).unwrap(), Refunded);

        for (from, to) in [
            (Paid, Pending),
            (Failed, Paid),
            (Refunded, Paid),
            (Pending, Refunded),
            (Pending, Pending),
            (Failed, Refunded),
        ] {
            assert!(
                matches!(from.transition(to), Err(ServiceError::InvalidTransition(_))),
                "{from} -> {to} must be rejected"
            );
        }
    }

    #[test]
    fn enums_parse_their_storage_form() {
        assert_eq!("on_the_way".parse::<OrderStatus>().unwrap(), OrderStatus::OnTheWay);
        assert_eq!(OrderStatus::OnTheWay.to_string(), "on_the_way");
        assert_eq!("wallet".parse::<PaymentMethod>().unwrap(), PaymentMethod::Wallet);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!(matches!("PAID".parse::<PaymentStatus>(), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&OrderStatus::OnTheWay).unwrap();
        assert_eq!(json, "\"on_the_way\"");

        let method: PaymentMethod = serde_json::from_str("\"card\"").unwrap();
        assert_eq!(method, PaymentMethod::Card);
    }

    #[test]
    fn placed_is_not_recordable() {
        assert!(!OrderStatus::Placed.is_recordable());
        assert!(OrderStatus::Cancelled.is_recordable());
    }

    #[cfg(not(feature = "strict-status"))]
    #[test]
    fn timeline_accepts_any_order_by_default() {
        assert!(OrderStatus::Ready.may_follow(OrderStatus::Delivered));
        assert!(OrderStatus::OnTheWay.may_follow(OrderStatus::Cancelled));
    }

    #[cfg(feature = "strict-status")]
    #[test]
    fn strict_timeline_rejects_regression() {
        assert!(OrderStatus::Ready.may_follow(OrderStatus::Placed));
        assert!(OrderStatus::Delivered.may_follow(OrderStatus::OnTheWay));
        assert!(!OrderStatus::Ready.may_follow(OrderStatus::Delivered));
        assert!(!OrderStatus::Cancelled.may_follow(OrderStatus::Delivered));
    }
}
