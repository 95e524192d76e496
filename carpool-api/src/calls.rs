use axum::{routing::post, Router};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskedCallRequest {
    ride_id: Uuid,
    with_user_id: Uuid,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/calls/masked", post(start_masked_call))
}

/// Number-masking proxy for driver/rider calls. No provider is wired in
/// yet, so well-formed requests get 501.
async fn start_masked_call(user: AuthUser, ApiJson(req): ApiJson<MaskedCallRequest>) -> Result<(), AppError> {
    debug!(user_id = %user.id, ride_id = %req.ride_id, with_user_id = %req.with_user_id, "Masked call requested");
    Err(AppError::NotImplemented("Masked call provider not configured".to_string()))
}
