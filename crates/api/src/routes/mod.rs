pub mod booking;
pub mod health;
pub mod orders;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /showtimes/{id}/seats                seat map (public)
///
/// /bookings                            book seats (POST, requires auth)
///
/// /orders                              caller's orders (requires auth)
/// /orders/{id}                         one order (owner or staff)
/// /orders/{id}/cancel                  cancel own order (POST)
/// /orders/{id}/refund                  refund any order (POST, staff only)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(booking::router())
        .nest("/orders", orders::router())
}
