//! Repository for the `payment_transactions` table.

use sqlx::{PgConnection, PgPool};
use cinebook_core::models::NewPayment;
use cinebook_core::types::DbId;

use crate::models::order::PaymentTransactionRow;

const PAYMENT_COLUMNS: &str = "id, order_id, amount, payment_method, status_id, paid_at";

pub struct PaymentTransactionRepo;

impl PaymentTransactionRepo {
    pub async fn create(
        conn: &mut PgConnection,
        order_id: DbId,
        input: &NewPayment,
    ) -> Result<PaymentTransactionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO payment_transactions (order_id, amount, payment_method, status_id, paid_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {PAYMENT_COLUMNS}"
        );
        sqlx::query_as::<_, PaymentTransactionRow>(&query)
            .bind(order_id)
            .bind(input.amount)
            .bind(&input.payment_method)
            .bind(input.status.id())
            .bind(input.paid_at)
            .fetch_one(conn)
            .await
    }

    pub async fn list_by_order(
        pool: &PgPool,
        order_id: DbId,
    ) -> Result<Vec<PaymentTransactionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_transactions \
             WHERE order_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, PaymentTransactionRow>(&query)
            .bind(order_id)
            .fetch_all(pool)
            .await
    }
}
