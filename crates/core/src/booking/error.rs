use crate::seat_code::SeatCodeError;
use crate::status::OrderStatus;
use crate::store::StoreError;
use crate::types::DbId;

/// Failures of the booking engine.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Invalid booking request: {0}")]
    InvalidRequest(String),

    #[error("Invalid seat code: {0}")]
    InvalidSeatCode(#[from] SeatCodeError),

    #[error("Showtime {0} not found")]
    ShowtimeNotFound(DbId),

    #[error("Seat {code} not found in room {room_id}")]
    SeatNotFound { room_id: DbId, code: String },

    #[error("Seats already taken: {}", seats.join(", "))]
    SeatUnavailable { seats: Vec<String> },

    #[error("Seat {0} requested more than once")]
    DuplicateSeatInRequest(String),

    /// The bounded wait for in-process seat locks expired.
    #[error("Timed out waiting for seats: {}", seats.join(", "))]
    SeatLockTimeout { seats: Vec<String> },

    #[error("Order {0} not found")]
    OrderNotFound(DbId),

    #[error("User {user_id} may not access order {order_id}")]
    OrderAccessDenied { order_id: DbId, user_id: DbId },

    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidOrderTransition {
        order_id: DbId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Storage failed. Any claimed tickets have already been released.
    #[error("Booking could not be persisted: {0}")]
    PersistenceFailure(#[from] StoreError),
}

impl BookingError {
    /// Whether the same request may succeed if retried unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::SeatLockTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_lock_timeout_is_retryable() {
        let timeout = BookingError::SeatLockTimeout {
            seats: vec!["A1".into()],
        };
        let taken = BookingError::SeatUnavailable {
            seats: vec!["A1".into()],
        };
        assert!(timeout.is_retryable());
        assert!(!taken.is_retryable());
        assert!(!BookingError::PersistenceFailure(StoreError::Timeout).is_retryable());
    }

    #[test]
    fn seat_lists_render_in_message() {
        let err = BookingError::SeatUnavailable {
            seats: vec!["A1".into(), "B2".into()],
        };
        assert_eq!(err.to_string(), "Seats already taken: A1, B2");
    }
}
