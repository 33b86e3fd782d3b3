//! Repository for the `tickets` table.
//!
//! Status changes are compare-and-set on `status_id`; callers learn whether
//! they won from the affected-row count.

use sqlx::{PgConnection, PgPool};
use cinebook_core::status::TicketStatus;
use cinebook_core::types::{DbId, Money};

use crate::models::ticket::TicketRow;

const TICKET_COLUMNS: &str = "id, showtime_id, seat_id, order_id, price, status_id";

/// Status ids that count as occupied (`BOOKED`, `SOLD`).
const OCCUPIED_STATUS_IDS: [i16; 2] = [TicketStatus::Booked as i16, TicketStatus::Sold as i16];

pub struct TicketRepo;

impl TicketRepo {
    /// Return the live ticket for a seat, inserting an `AVAILABLE` one if
    /// none exists.
    ///
    /// Uses `INSERT ... ON CONFLICT DO NOTHING` against the partial unique
    /// index on live tickets; when another writer got there first, the
    /// existing row is read back.
    pub async fn find_or_create(
        pool: &PgPool,
        showtime_id: DbId,
        seat_id: DbId,
        price: Money,
    ) -> Result<TicketRow, sqlx::Error> {
        let insert = format!(
            "INSERT INTO tickets (showtime_id, seat_id, price, status_id) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (showtime_id, seat_id) WHERE status_id <> {cancelled} \
             DO NOTHING \
             RETURNING {TICKET_COLUMNS}",
            cancelled = TicketStatus::Cancelled.id(),
        );
        let created = sqlx::query_as::<_, TicketRow>(&insert)
            .bind(showtime_id)
            .bind(seat_id)
            .bind(price)
            .bind(TicketStatus::Available.id())
            .fetch_optional(pool)
            .await?;
        if let Some(ticket) = created {
            return Ok(ticket);
        }

        let select = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets \
             WHERE showtime_id = $1 AND seat_id = $2 AND status_id <> $3"
        );
        sqlx::query_as::<_, TicketRow>(&select)
            .bind(showtime_id)
            .bind(seat_id)
            .bind(TicketStatus::Cancelled.id())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TicketRow>, sqlx::Error> {
        let query = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1");
        sqlx::query_as::<_, TicketRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Live tickets of a showtime.
    pub async fn list_by_showtime(
        pool: &PgPool,
        showtime_id: DbId,
    ) -> Result<Vec<TicketRow>, sqlx::Error> {
        let query = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets \
             WHERE showtime_id = $1 AND status_id <> $2 \
             ORDER BY seat_id"
        );
        sqlx::query_as::<_, TicketRow>(&query)
            .bind(showtime_id)
            .bind(TicketStatus::Cancelled.id())
            .fetch_all(pool)
            .await
    }

    /// Move a ticket from `expected` to `new`. Returns `false` when the
    /// ticket was not in `expected`.
    pub async fn compare_and_set_status(
        pool: &PgPool,
        id: DbId,
        expected: TicketStatus,
        new: TicketStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tickets SET status_id = $3, updated_at = NOW() \
             WHERE id = $1 AND status_id = $2",
        )
        .bind(id)
        .bind(expected.id())
        .bind(new.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Return claimed tickets that no order owns to `AVAILABLE`.
    ///
    /// A row held by an in-flight booking transaction blocks this update
    /// until that transaction ends; if it committed, `order_id` is set and
    /// the row is skipped.
    pub async fn revert_to_available(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tickets SET status_id = $2, updated_at = NOW() \
             WHERE id = ANY($1) AND order_id IS NULL",
        )
        .bind(ids)
        .bind(TicketStatus::Available.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Point claimed, unowned tickets at their order. Returns how many were
    /// attached; a ticket released in the meantime is not.
    pub async fn attach_to_order(
        conn: &mut PgConnection,
        order_id: DbId,
        ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tickets SET order_id = $1, updated_at = NOW() \
             WHERE id = ANY($2) AND order_id IS NULL AND status_id = ANY($3)",
        )
        .bind(order_id)
        .bind(ids)
        .bind(&OCCUPIED_STATUS_IDS[..])
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Free every occupied ticket still owned by `order_id`.
    pub async fn release_for_order(
        conn: &mut PgConnection,
        order_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tickets SET status_id = $2, order_id = NULL, updated_at = NOW() \
             WHERE order_id = $1 AND status_id = ANY($3)",
        )
        .bind(order_id)
        .bind(TicketStatus::Available.id())
        .bind(&OCCUPIED_STATUS_IDS[..])
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }
}
