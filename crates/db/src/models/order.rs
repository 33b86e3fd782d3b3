//! Orders and their payment transactions.

use cinebook_core::models::{Order, PaymentTransaction};
use cinebook_core::status::{OrderStatus, PaymentStatus, StatusId};
use cinebook_core::store::StoreError;
use cinebook_core::types::{DbId, Money, Timestamp};
use sqlx::FromRow;

use super::status_from_row;

/// An `orders` row with the ids of its tickets aggregated from
/// `order_tickets`.
#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub id: DbId,
    pub user_id: DbId,
    pub ticket_code: String,
    pub total_amount: Money,
    pub status_id: StatusId,
    pub ticket_ids: Vec<DbId>,
    pub created_at: Timestamp,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            ticket_code: row.ticket_code,
            total_amount: row.total_amount,
            status: status_from_row("order", row.status_id, OrderStatus::from_id)?,
            ticket_ids: row.ticket_ids,
            created_at: row.created_at,
        })
    }
}

/// A row from the `payment_transactions` table.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentTransactionRow {
    pub id: DbId,
    pub order_id: DbId,
    pub amount: Money,
    pub payment_method: String,
    pub status_id: StatusId,
    pub paid_at: Option<Timestamp>,
}

impl TryFrom<PaymentTransactionRow> for PaymentTransaction {
    type Error = StoreError;

    fn try_from(row: PaymentTransactionRow) -> Result<Self, Self::Error> {
        Ok(PaymentTransaction {
            id: row.id,
            order_id: row.order_id,
            amount: row.amount,
            payment_method: row.payment_method,
            status: status_from_row("payment", row.status_id, PaymentStatus::from_id)?,
            paid_at: row.paid_at,
        })
    }
}
