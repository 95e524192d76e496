use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use carpool_core::matching::SearchQuery;
use carpool_core::rides::{RideDetail, RideListing};
use carpool_core::{NewRide, Ride, RideStatus};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ValidatedJson};
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRideRequest {
    car_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    from: String,
    #[validate(range(min = -90.0, max = 90.0))]
    from_lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    from_lng: f64,
    #[validate(length(min = 1, max = 200))]
    to: String,
    #[validate(range(min = -90.0, max = 90.0))]
    to_lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    to_lng: f64,
    route_polyline: Option<String>,
    #[validate(range(min = 1, max = 8))]
    seats_total: i32,
    start_time: DateTime<Utc>,
}

impl From<CreateRideRequest> for NewRide {
    fn from(req: CreateRideRequest) -> Self {
        NewRide {
            car_id: req.car_id,
            from: req.from.trim().to_string(),
            from_lat: req.from_lat,
            from_lng: req.from_lng,
            to: req.to.trim().to_string(),
            to_lat: req.to_lat,
            to_lng: req.to_lng,
            route_polyline: req.route_polyline.filter(|p| !p.is_empty()),
            seats_total: req.seats_total,
            start_time: req.start_time,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    status: RideStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/rides", get(list_recent).post(create_ride))
        .route("/v1/rides/my", get(list_my_rides))
        .route("/v1/rides/search", post(search_rides))
        .route("/v1/rides/{id}", get(ride_detail))
        .route("/v1/rides/{id}/status", patch(update_status))
}

async fn list_recent(State(state): State<AppState>) -> Result<Json<Vec<RideListing>>, AppError> {
    Ok(Json(state.rides.list_recent().await?))
}

async fn create_ride(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateRideRequest>,
) -> Result<(StatusCode, Json<Ride>), AppError> {
    let ride = state.rides.create_ride(user.id, req.into()).await?;
    state.metrics.rides_posted.inc();
    Ok((StatusCode::CREATED, Json(ride)))
}

async fn list_my_rides(State(state): State<AppState>, user: AuthUser) -> Result<Json<Vec<Ride>>, AppError> {
    Ok(Json(state.rides.list_for_driver(user.id).await?))
}

async fn ride_detail(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<RideDetail>, AppError> {
    Ok(Json(state.rides.ride_detail(user.id, id).await?))
}

async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateStatusRequest>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(state.rides.update_status(user.id, id, req.status).await?))
}

async fn search_rides(
    State(state): State<AppState>,
    ApiJson(query): ApiJson<SearchQuery>,
) -> Result<Json<Vec<RideListing>>, AppError> {
    Ok(Json(state.rides.search(&query).await?))
}
