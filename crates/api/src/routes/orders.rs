//! Route definitions for the `/orders` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::orders;
use crate::state::AppState;

/// Routes mounted at `/orders`.
///
/// ```text
/// GET  /               -> list_orders
/// GET  /{id}           -> get_order
/// POST /{id}/cancel    -> cancel_order
/// POST /{id}/refund    -> refund_order
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list_orders))
        .route("/{id}", get(orders::get_order))
        .route("/{id}/cancel", post(orders::cancel_order))
        .route("/{id}/refund", post(orders::refund_order))
}
