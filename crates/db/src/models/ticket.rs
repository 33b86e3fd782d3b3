use cinebook_core::models::Ticket;
use cinebook_core::status::{StatusId, TicketStatus};
use cinebook_core::store::StoreError;
use cinebook_core::types::{DbId, Money};
use sqlx::FromRow;

use super::status_from_row;

/// A row from the `tickets` table.
#[derive(Debug, Clone, FromRow)]
pub struct TicketRow {
    pub id: DbId,
    pub showtime_id: DbId,
    pub seat_id: DbId,
    pub order_id: Option<DbId>,
    pub price: Money,
    pub status_id: StatusId,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = StoreError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(Ticket {
            id: row.id,
            showtime_id: row.showtime_id,
            seat_id: row.seat_id,
            order_id: row.order_id,
            price: row.price,
            status: status_from_row("ticket", row.status_id, TicketStatus::from_id)?,
        })
    }
}
