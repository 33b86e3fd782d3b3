//! Handlers for seat maps and bookings.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use cinebook_core::models::{BookingRequest, BookingResult, SeatMap};
use cinebook_core::types::DbId;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /bookings`.
///
/// The booking user is always the authenticated caller.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub showtime_id: DbId,
    pub seats: Vec<String>,
    pub payment_method: String,
}

/// GET /api/v1/showtimes/{id}/seats
pub async fn seat_map(
    State(state): State<AppState>,
    Path(showtime_id): Path<DbId>,
) -> AppResult<Json<DataResponse<SeatMap>>> {
    let map = state.booking.seat_map(showtime_id).await?;
    Ok(Json(DataResponse { data: map }))
}

/// POST /api/v1/bookings
///
/// Returns 201 with the booking result, 409 with the conflicting `seats`
/// when any seat is taken, or 503 when seat locks could not be acquired in
/// time (safe to retry). A body that is not a valid booking request is a
/// 400 in the same JSON error shape as every other failure.
pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DataResponse<BookingResult>>)> {
    let Json(body) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let result = state
        .booking
        .book(BookingRequest {
            user_id: user.user_id,
            showtime_id: body.showtime_id,
            seat_codes: body.seats,
            payment_method: body.payment_method,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: result })))
}
