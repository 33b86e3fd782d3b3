//! Payment-method status policy.
//!
//! Cash is settled at the counter, so the seats are sold and the order is
//! complete immediately. Every other method leaves the order awaiting
//! payment with the seats booked.

use crate::status::{OrderStatus, PaymentStatus, TicketStatus};
use crate::types::Timestamp;

/// Payment method that settles immediately.
pub const CASH: &str = "cash";

/// Statuses applied by one booking, derived from its payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentPlan {
    pub ticket_status: TicketStatus,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub paid_at: Option<Timestamp>,
}

impl PaymentPlan {
    /// Select the plan for a payment method (case-insensitive).
    pub fn for_method(method: &str, now: Timestamp) -> Self {
        if method.trim().eq_ignore_ascii_case(CASH) {
            Self {
                ticket_status: TicketStatus::Sold,
                order_status: OrderStatus::Completed,
                payment_status: PaymentStatus::Success,
                paid_at: Some(now),
            }
        } else {
            Self {
                ticket_status: TicketStatus::Booked,
                order_status: OrderStatus::Processing,
                payment_status: PaymentStatus::Pending,
                paid_at: None,
            }
        }
    }
}

/// Canonical stored form of a payment method (`"card"` -> `"CARD"`).
pub fn normalize_method(method: &str) -> String {
    method.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cash_sells_immediately() {
        let now = chrono::Utc::now();
        let plan = PaymentPlan::for_method("CaSh", now);
        assert_eq!(plan.ticket_status, TicketStatus::Sold);
        assert_eq!(plan.order_status, OrderStatus::Completed);
        assert_eq!(plan.payment_status, PaymentStatus::Success);
        assert_eq!(plan.paid_at, Some(now));
    }

    #[test]
    fn other_methods_stay_pending() {
        for method in ["card", "momo", "bank_transfer"] {
            let plan = PaymentPlan::for_method(method, chrono::Utc::now());
            assert_eq!(plan.ticket_status, TicketStatus::Booked);
            assert_eq!(plan.order_status, OrderStatus::Processing);
            assert_eq!(plan.payment_status, PaymentStatus::Pending);
            assert!(plan.paid_at.is_none());
        }
    }

    #[test]
    fn normalizes_to_upper_case() {
        assert_eq!(normalize_method(" momo "), "MOMO");
    }
}
