use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::{AppState, AuthConfig};

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
}

pub fn issue_token(auth: &AuthConfig, user_id: Uuid, email: &str) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_owned(),
        exp: (Utc::now() + Duration::seconds(auth.expiration as i64)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

// ============================================================================
// Authenticated caller
// ============================================================================

/// Caller identity taken from `Authorization: Bearer <jwt>`.
///
/// Used as a handler argument, so public and protected handlers can share
/// a path and differ only by method.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let unauthorized = || AppError::AuthenticationError("Unauthorized".to_string());

        // 1. Extract token from Authorization header
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(unauthorized)?;

        // 2. Decode and validate JWT
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.auth.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| unauthorized())?;

        // 3. Subject must be a user id
        let id = Uuid::parse_str(&token_data.claims.sub).map_err(|_| unauthorized())?;

        Ok(AuthUser { id, email: token_data.claims.email })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_token_decodes() {
        let auth = AuthConfig { secret: "test-secret".to_string(), expiration: 60 };
        let user_id = Uuid::new_v4();
        let token = issue_token(&auth, user_id, "asha@example.com").unwrap();

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(auth.secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, user_id.to_string());

        let wrong = decode::<Claims>(&token, &DecodingKey::from_secret(b"other"), &Validation::default());
        assert!(wrong.is_err());
    }
}
