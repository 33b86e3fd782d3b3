//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or `&mut PgConnection` when the call must join a
//! caller's transaction) as the first argument.

pub mod catalog_repo;
pub mod order_repo;
pub mod payment_transaction_repo;
pub mod ticket_repo;

pub use catalog_repo::{MovieRepo, RoomRepo, SeatRepo, ShowtimeRepo};
pub use order_repo::OrderRepo;
pub use payment_transaction_repo::PaymentTransactionRepo;
pub use ticket_repo::TicketRepo;
