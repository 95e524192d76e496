use axum::{extract::State, routing::get, Json, Router};
use carpool_core::Notification;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    is_read: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/notifications", get(list_notifications))
        .route("/v1/notifications/{id}", get(get_notification).patch(mark_read))
}

async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Notification>>, AppError> {
    Ok(Json(state.notifications.list(user.id).await?))
}

async fn get_notification(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Notification>, AppError> {
    Ok(Json(state.notifications.get(user.id, id).await?))
}

async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<MarkReadRequest>,
) -> Result<Json<Notification>, AppError> {
    state.notifications.mark_read(user.id, id, req.is_read).await?;
    Ok(Json(state.notifications.get(user.id, id).await?))
}
