use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use carpool_core::{User, UserProfile};
use carpool_shared::Masked;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::middleware::issue_token;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email."))]
    email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    password: String,
    #[validate(length(min = 1, max = 100))]
    name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email and password are required."))]
    email: String,
    #[validate(length(min = 1, message = "Email and password are required."))]
    password: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    user: UserProfile,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/login", post(login))
}

async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let password_hash = hash_password(&req.password)?;
    let user = User::new(&req.email, req.name.as_deref(), password_hash);

    state.users.create_user(&user).await?;

    info!(user_id = %user.id, email = %Masked(&user.email), "User registered");
    Ok((StatusCode::CREATED, Json(json!({ "ok": true }))))
}

async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let invalid = || AppError::AuthenticationError("Invalid email or password".to_string());

    let email = req.email.trim().to_lowercase();
    let user = state.users.find_user_by_email(&email).await?.ok_or_else(invalid)?;
    if !verify_password(&req.password, &user.password_hash) {
        info!(email = %Masked(&email), "Login rejected");
        return Err(invalid());
    }

    let token = issue_token(&state.auth, user.id, &user.email)?;
    Ok(Json(AuthResponse { token, user: user.profile() }))
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalServerError(format!("Password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-phc-string"));
    }

    #[test]
    fn test_register_validation() {
        let short = RegisterRequest { email: "a@b.co".into(), password: "short".into(), name: None };
        assert!(short.validate().is_err());

        let bad_email = RegisterRequest { email: "nope".into(), password: "longenough".into(), name: None };
        assert!(bad_email.validate().is_err());

        let ok = RegisterRequest { email: "a@b.co".into(), password: "longenough".into(), name: Some("A".into()) };
        assert!(ok.validate().is_ok());
    }
}
