//! [`BookingStore`] over PostgreSQL.

use async_trait::async_trait;
use cinebook_core::models::{
    NewOrder, NewPayment, Order, PaymentTransaction, Seat, Showtime, Ticket,
};
use cinebook_core::status::{OrderStatus, TicketStatus};
use cinebook_core::store::{BookingStore, StoreError};
use cinebook_core::types::{DbId, Money};

use crate::repositories::{
    OrderRepo, PaymentTransactionRepo, SeatRepo, ShowtimeRepo, TicketRepo,
};
use crate::DbPool;

#[derive(Clone)]
pub struct PgBookingStore {
    pool: DbPool,
}

impl PgBookingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn load_showtime_with_room(
        &self,
        showtime_id: DbId,
    ) -> Result<Option<Showtime>, StoreError> {
        let row = ShowtimeRepo::find_with_room(&self.pool, showtime_id)
            .await
            .map_err(StoreError::backend)?;
        Ok(row.map(Showtime::from))
    }

    async fn find_seat_in_room(
        &self,
        room_id: DbId,
        row_label: char,
        seat_number: i32,
    ) -> Result<Option<Seat>, StoreError> {
        SeatRepo::find_in_room(&self.pool, room_id, row_label, seat_number)
            .await
            .map_err(StoreError::backend)?
            .map(Seat::try_from)
            .transpose()
    }

    async fn list_seats_in_room(&self, room_id: DbId) -> Result<Vec<Seat>, StoreError> {
        SeatRepo::list_by_room(&self.pool, room_id)
            .await
            .map_err(StoreError::backend)?
            .into_iter()
            .map(Seat::try_from)
            .collect()
    }

    async fn find_or_create_ticket(
        &self,
        showtime_id: DbId,
        seat_id: DbId,
        default_price: Money,
    ) -> Result<Ticket, StoreError> {
        TicketRepo::find_or_create(&self.pool, showtime_id, seat_id, default_price)
            .await
            .map_err(StoreError::backend)?
            .try_into()
    }

    async fn list_tickets_for_showtime(
        &self,
        showtime_id: DbId,
    ) -> Result<Vec<Ticket>, StoreError> {
        TicketRepo::list_by_showtime(&self.pool, showtime_id)
            .await
            .map_err(StoreError::backend)?
            .into_iter()
            .map(Ticket::try_from)
            .collect()
    }

    async fn compare_and_set_ticket_status(
        &self,
        ticket_id: DbId,
        expected: TicketStatus,
        new: TicketStatus,
    ) -> Result<bool, StoreError> {
        TicketRepo::compare_and_set_status(&self.pool, ticket_id, expected, new)
            .await
            .map_err(StoreError::backend)
    }

    async fn revert_tickets_to_available(&self, ticket_ids: &[DbId]) -> Result<(), StoreError> {
        TicketRepo::revert_to_available(&self.pool, ticket_ids)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn persist_booking(
        &self,
        order: NewOrder,
        payment: NewPayment,
    ) -> Result<(Order, PaymentTransaction), StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        let order_row = OrderRepo::create(&mut tx, &order)
            .await
            .map_err(StoreError::backend)?;
        let attached = TicketRepo::attach_to_order(&mut tx, order_row.id, &order.ticket_ids)
            .await
            .map_err(StoreError::backend)?;
        if attached != order.ticket_ids.len() as u64 {
            // Dropping `tx` rolls back.
            return Err(StoreError::Corrupt(format!(
                "attached {attached} of {} tickets to order {}",
                order.ticket_ids.len(),
                order_row.id
            )));
        }
        let payment_row = PaymentTransactionRepo::create(&mut tx, order_row.id, &payment)
            .await
            .map_err(StoreError::backend)?;

        tx.commit().await.map_err(StoreError::backend)?;

        tracing::debug!(
            order_id = order_row.id,
            payment_id = payment_row.id,
            tickets = order.ticket_ids.len(),
            "Persisted booking",
        );
        Ok((order_row.try_into()?, payment_row.try_into()?))
    }

    async fn find_order(&self, order_id: DbId) -> Result<Option<Order>, StoreError> {
        OrderRepo::find_by_id(&self.pool, order_id)
            .await
            .map_err(StoreError::backend)?
            .map(Order::try_from)
            .transpose()
    }

    async fn find_order_by_ticket_code(
        &self,
        ticket_code: &str,
    ) -> Result<Option<Order>, StoreError> {
        OrderRepo::find_by_ticket_code(&self.pool, ticket_code)
            .await
            .map_err(StoreError::backend)?
            .map(Order::try_from)
            .transpose()
    }

    async fn list_orders_for_user(&self, user_id: DbId) -> Result<Vec<Order>, StoreError> {
        OrderRepo::list_by_user(&self.pool, user_id)
            .await
            .map_err(StoreError::backend)?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }

    async fn close_order(
        &self,
        order_id: DbId,
        expected: OrderStatus,
        new: OrderStatus,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        let moved = OrderRepo::compare_and_set_status(&mut tx, order_id, expected, new)
            .await
            .map_err(StoreError::backend)?;
        if !moved {
            return Ok(false);
        }
        let released = TicketRepo::release_for_order(&mut tx, order_id)
            .await
            .map_err(StoreError::backend)?;

        tx.commit().await.map_err(StoreError::backend)?;

        tracing::debug!(order_id, released, status = %new, "Closed order");
        Ok(true)
    }
}
