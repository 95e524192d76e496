use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use carpool_core::models::account::normalize_phone;
use carpool_core::{Car, CompleteProfile, UserMode, UserProfile};
use carpool_shared::Masked;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ValidatedJson};
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    name: Option<String>,
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SwitchModeRequest {
    #[serde(default)]
    mode: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStatus {
    is_profile_complete: bool,
}

#[derive(Debug, Serialize)]
pub struct CompleteProfileResponse {
    message: &'static str,
    user: UserProfile,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCarRequest {
    #[validate(length(min = 1, max = 50))]
    make: String,
    #[validate(length(min = 1, max = 50))]
    model: String,
    #[validate(length(min = 1, max = 20))]
    plate_number: String,
    color: Option<String>,
    #[validate(range(min = 1, max = 12))]
    seats: Option<i32>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/users/me", get(get_profile).patch(update_profile))
        .route("/v1/users/me/mode", post(switch_mode))
        .route("/v1/users/me/profile-status", get(profile_status))
        .route("/v1/users/me/complete-profile", post(complete_profile))
        .route("/v1/users/me/cars", get(list_cars).post(create_car))
        .route("/v1/users/me/cars/{id}", delete(delete_car))
}

/// Trimmed display name; present but blank is rejected.
fn trimmed_name(raw: Option<&str>) -> Result<Option<&str>, AppError> {
    match raw.map(str::trim) {
        Some("") => Err(AppError::ValidationError("Name cannot be blank".to_string())),
        name => Ok(name),
    }
}

async fn get_profile(State(state): State<AppState>, user: AuthUser) -> Result<Json<UserProfile>, AppError> {
    let found = state
        .users
        .find_user(user.id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("User not found".to_string()))?;
    Ok(Json(found.profile()))
}

async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let name = trimmed_name(req.name.as_deref())?;
    let phone = req.phone.as_deref().map(normalize_phone).transpose()?;

    let updated = state
        .users
        .update_profile(user.id, name, phone.as_deref())
        .await?
        .ok_or_else(|| AppError::NotFoundError("User not found".to_string()))?;

    info!(user_id = %user.id, "Profile updated");
    Ok(Json(updated.profile()))
}

async fn switch_mode(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<SwitchModeRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let mode: UserMode = req.mode.parse()?;
    let found = state
        .users
        .find_user(user.id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("User not found".to_string()))?;
    found.ensure_can_switch_to(mode)?;

    let updated = state
        .users
        .set_mode(user.id, mode)
        .await?
        .ok_or_else(|| AppError::NotFoundError("User not found".to_string()))?;

    info!(user_id = %user.id, "Switched to {} mode", mode);
    Ok(Json(updated.profile()))
}

async fn profile_status(State(state): State<AppState>, user: AuthUser) -> Result<Json<ProfileStatus>, AppError> {
    let found = state
        .users
        .find_user(user.id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("User not found".to_string()))?;
    Ok(Json(ProfileStatus { is_profile_complete: found.is_profile_complete() }))
}

async fn complete_profile(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CompleteProfile>,
) -> Result<Json<CompleteProfileResponse>, AppError> {
    let details = req.normalize()?;
    let updated = state
        .users
        .complete_profile(user.id, &details)
        .await?
        .ok_or_else(|| AppError::NotFoundError("User not found".to_string()))?;

    info!(user_id = %user.id, phone = %Masked(&details.phone), "Profile completed");
    Ok(Json(CompleteProfileResponse {
        message: "Profile completed successfully",
        user: updated.profile(),
    }))
}

async fn list_cars(State(state): State<AppState>, user: AuthUser) -> Result<Json<Vec<Car>>, AppError> {
    Ok(Json(state.cars.list_cars(user.id).await?))
}

async fn create_car(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateCarRequest>,
) -> Result<(StatusCode, Json<Car>), AppError> {
    let car = Car::new(
        user.id,
        req.make.trim(),
        req.model.trim(),
        req.plate_number.trim(),
        req.color.as_deref(),
        req.seats,
    );
    state.cars.create_car(&car).await?;

    info!(user_id = %user.id, car_id = %car.id, "Car added");
    Ok((StatusCode::CREATED, Json(car)))
}

async fn delete_car(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.cars.delete_car(id, user.id).await? {
        return Err(AppError::NotFoundError("Car not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_rejected_after_trim() {
        assert!(matches!(trimmed_name(Some("   ")), Err(AppError::ValidationError(_))));
        assert_eq!(trimmed_name(Some("  Riya ")).unwrap(), Some("Riya"));
        assert_eq!(trimmed_name(None).unwrap(), None);
    }
}
