//! Handlers for the `/orders` resource.

use axum::extract::{Path, State};
use axum::Json;
use cinebook_core::models::Order;
use cinebook_core::types::DbId;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireStaff;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/orders
///
/// The caller's own orders, newest first.
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Order>>>> {
    let orders = state.booking.orders_for_user(user.user_id).await?;
    Ok(Json(DataResponse { data: orders }))
}

/// GET /api/v1/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Order>>> {
    let order = state.booking.order(user.actor(), order_id).await?;
    Ok(Json(DataResponse { data: order }))
}

/// POST /api/v1/orders/{id}/cancel
///
/// Cancel one of the caller's orders and free its seats. Repeating the call
/// returns the cancelled order unchanged.
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Order>>> {
    let order = state.booking.cancel_order(user.user_id, order_id).await?;
    Ok(Json(DataResponse { data: order }))
}

/// POST /api/v1/orders/{id}/refund
pub async fn refund_order(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(order_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Order>>> {
    let order = state.booking.refund_order(staff.user_id, order_id).await?;
    Ok(Json(DataResponse { data: order }))
}
