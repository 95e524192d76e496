use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use carpool_core::bookings::{BookingDecision, CreateBooking};
use carpool_core::{Booking, BookingView};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ValidatedJson};
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    ride_id: Uuid,
    #[validate(range(min = 1, max = 8, message = "Seats must be between 1 and 8"))]
    seats: i32,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", get(list_my_bookings).post(create_booking))
        .route("/v1/bookings/driver", get(list_driver_bookings))
        .route("/v1/bookings/action", post(act_on_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
}

async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state
        .bookings
        .create_booking(user.id, CreateBooking { ride_id: req.ride_id, seats: req.seats })
        .await?;

    state.metrics.record_booking(booking.status.as_str());
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn act_on_booking(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(decision): ApiJson<BookingDecision>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.bookings.act_on_booking(user.id, decision).await?;
    state.metrics.record_booking(booking.status.as_str());
    Ok(Json(booking))
}

async fn cancel_booking(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.bookings.cancel_booking(user.id, id).await?;
    state.metrics.record_booking(booking.status.as_str());
    Ok(Json(booking))
}

async fn list_my_bookings(State(state): State<AppState>, user: AuthUser) -> Result<Json<Vec<BookingView>>, AppError> {
    Ok(Json(state.bookings.list_for_user(user.id).await?))
}

async fn list_driver_bookings(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<BookingView>>, AppError> {
    Ok(Json(state.bookings.list_for_driver(user.id).await?))
}
