//! Cinebook domain core.
//!
//! Pure domain types, the seat codec, and the booking engine (seat ledger,
//! booking transaction, order cancellation, service façade). Storage is
//! reached only through the [`store::BookingStore`] trait, so the engine
//! runs unchanged against PostgreSQL or the in-memory store.

pub mod booking;
pub mod error;
pub mod memory;
pub mod models;
pub mod payment;
pub mod seat_code;
pub mod status;
pub mod store;
pub mod ticket_code;
pub mod types;
