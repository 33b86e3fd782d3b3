//! Persistence collaborator for the booking engine.
//!
//! The engine never talks to a database directly. Everything it reads or
//! writes goes through [`BookingStore`], implemented by the PostgreSQL store
//! in `cinebook-db` and by [`crate::memory::MemoryStore`].

use async_trait::async_trait;

use crate::models::{NewOrder, NewPayment, Order, PaymentTransaction, Seat, Showtime, Ticket};
use crate::status::{OrderStatus, TicketStatus};
use crate::types::{DbId, Money};

/// Failure reported by a store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Storage operation timed out")]
    Timeout,

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Wrap any backend error (e.g. `sqlx::Error`).
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }
}

/// Storage operations the booking engine depends on.
///
/// Single-row status changes are compare-and-set so that writers outside
/// this process cannot be silently overwritten.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Load a showtime together with its room.
    async fn load_showtime_with_room(&self, showtime_id: DbId)
        -> Result<Option<Showtime>, StoreError>;

    /// Find a seat by position within a room.
    async fn find_seat_in_room(
        &self,
        room_id: DbId,
        row_label: char,
        seat_number: i32,
    ) -> Result<Option<Seat>, StoreError>;

    /// All seats of a room, ordered by row then number.
    async fn list_seats_in_room(&self, room_id: DbId) -> Result<Vec<Seat>, StoreError>;

    /// Return the non-cancelled ticket for `(showtime_id, seat_id)`, creating
    /// an `AVAILABLE` one priced at `default_price` if none exists.
    async fn find_or_create_ticket(
        &self,
        showtime_id: DbId,
        seat_id: DbId,
        default_price: Money,
    ) -> Result<Ticket, StoreError>;

    /// All non-cancelled tickets of a showtime.
    async fn list_tickets_for_showtime(&self, showtime_id: DbId)
        -> Result<Vec<Ticket>, StoreError>;

    /// Atomically move a ticket from `expected` to `new`.
    ///
    /// Returns `false` when the ticket was not in `expected`.
    async fn compare_and_set_ticket_status(
        &self,
        ticket_id: DbId,
        expected: TicketStatus,
        new: TicketStatus,
    ) -> Result<bool, StoreError>;

    /// Return claimed tickets to `AVAILABLE`.
    ///
    /// Tickets already attached to an order are left alone, so compensation
    /// can never undo a booking that was saved.
    async fn revert_tickets_to_available(&self, ticket_ids: &[DbId]) -> Result<(), StoreError>;

    /// Save an order and its payment record as one unit, attaching the
    /// order's tickets to it. Nothing is written if any part fails.
    async fn persist_booking(
        &self,
        order: NewOrder,
        payment: NewPayment,
    ) -> Result<(Order, PaymentTransaction), StoreError>;

    async fn find_order(&self, order_id: DbId) -> Result<Option<Order>, StoreError>;

    /// Look up an order by its customer-facing ticket code.
    async fn find_order_by_ticket_code(&self, ticket_code: &str)
        -> Result<Option<Order>, StoreError>;

    /// Orders placed by a user, newest first.
    async fn list_orders_for_user(&self, user_id: DbId) -> Result<Vec<Order>, StoreError>;

    /// Atomically move an order from `expected` to `new` and return its
    /// booked/sold tickets to `AVAILABLE`.
    ///
    /// Returns `false` (and changes nothing) when the order was not in
    /// `expected`.
    async fn close_order(
        &self,
        order_id: DbId,
        expected: OrderStatus,
        new: OrderStatus,
    ) -> Result<bool, StoreError>;
}
