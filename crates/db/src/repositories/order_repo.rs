//! Repository for `orders` and `order_tickets`.

use sqlx::{PgConnection, PgPool};
use cinebook_core::models::NewOrder;
use cinebook_core::status::OrderStatus;
use cinebook_core::types::DbId;

use crate::models::order::OrderRow;

/// Order columns plus the aggregated ticket ids. Requires a
/// `LEFT JOIN order_tickets ot` and `GROUP BY o.id`.
const ORDER_SELECT: &str = "SELECT o.id, o.user_id, o.ticket_code, o.total_amount, o.status_id, \
                            COALESCE(ARRAY_AGG(ot.ticket_id ORDER BY ot.ticket_id) \
                                FILTER (WHERE ot.ticket_id IS NOT NULL), '{}') AS ticket_ids, \
                            o.created_at \
                            FROM orders o \
                            LEFT JOIN order_tickets ot ON ot.order_id = o.id";

pub struct OrderRepo;

impl OrderRepo {
    /// Insert an order and record its tickets in `order_tickets`.
    ///
    /// Fails with a unique violation on `uq_orders_ticket_code` if the
    /// ticket code is already taken.
    pub async fn create(conn: &mut PgConnection, input: &NewOrder) -> Result<OrderRow, sqlx::Error> {
        let (id, created_at): (DbId, cinebook_core::types::Timestamp) = sqlx::query_as(
            "INSERT INTO orders (user_id, ticket_code, total_amount, status_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, created_at",
        )
        .bind(input.user_id)
        .bind(&input.ticket_code)
        .bind(input.total_amount)
        .bind(input.status.id())
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(
            "INSERT INTO order_tickets (order_id, ticket_id) \
             SELECT $1, UNNEST($2::BIGINT[])",
        )
        .bind(id)
        .bind(&input.ticket_ids)
        .execute(&mut *conn)
        .await?;

        Ok(OrderRow {
            id,
            user_id: input.user_id,
            ticket_code: input.ticket_code.clone(),
            total_amount: input.total_amount,
            status_id: input.status.id(),
            ticket_ids: input.ticket_ids.clone(),
            created_at,
        })
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<OrderRow>, sqlx::Error> {
        let query = format!("{ORDER_SELECT} WHERE o.id = $1 GROUP BY o.id");
        sqlx::query_as::<_, OrderRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_ticket_code(
        pool: &PgPool,
        ticket_code: &str,
    ) -> Result<Option<OrderRow>, sqlx::Error> {
        let query = format!("{ORDER_SELECT} WHERE o.ticket_code = $1 GROUP BY o.id");
        sqlx::query_as::<_, OrderRow>(&query)
            .bind(ticket_code)
            .fetch_optional(pool)
            .await
    }

    /// Orders placed by a user, newest first.
    pub async fn list_by_user(pool: &PgPool, user_id: DbId) -> Result<Vec<OrderRow>, sqlx::Error> {
        let query = format!(
            "{ORDER_SELECT} WHERE o.user_id = $1 GROUP BY o.id \
             ORDER BY o.created_at DESC, o.id DESC"
        );
        sqlx::query_as::<_, OrderRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Move an order from `expected` to `new`. Returns `false` when the
    /// order was not in `expected`.
    pub async fn compare_and_set_status(
        conn: &mut PgConnection,
        id: DbId,
        expected: OrderStatus,
        new: OrderStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE orders SET status_id = $3, updated_at = NOW() \
             WHERE id = $1 AND status_id = $2",
        )
        .bind(id)
        .bind(expected.id())
        .bind(new.id())
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
