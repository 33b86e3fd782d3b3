//! Route definitions for seat maps and bookings.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::booking;
use crate::state::AppState;

/// ```text
/// GET  /showtimes/{id}/seats   -> seat_map
/// POST /bookings               -> create_booking
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/showtimes/{id}/seats", get(booking::seat_map))
        .route("/bookings", post(booking::create_booking))
}
