//! Seat reservation and booking engine.

mod cancellation;
mod error;
mod ledger;
mod service;
mod transaction;

use std::time::Duration;

pub use cancellation::{OrderActor, OrderCancellation};
pub use error::BookingError;
pub use ledger::{SeatClaim, SeatLedger, SeatLockTable};
pub use service::BookingService;
pub use transaction::BookingTransaction;

/// Default bounded wait for seat locks.
pub const DEFAULT_SEAT_LOCK_WAIT: Duration = Duration::from_millis(2_000);

/// Default bound on persisting an order and its payment.
pub const DEFAULT_PERSIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Engine tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingConfig {
    pub seat_lock_wait: Duration,
    pub persist_timeout: Duration,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            seat_lock_wait: DEFAULT_SEAT_LOCK_WAIT,
            persist_timeout: DEFAULT_PERSIST_TIMEOUT,
        }
    }
}
