//! Session token extractors.
//!
//! Clients send the token from `GET /connect` in the `X-Token` header.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Header carrying the session token.
pub const TOKEN_HEADER: &str = "x-token";

fn token_from_parts(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|token| !token.is_empty())
}

/// Extractor for authenticated users.
///
/// Rejects with 401 when the token is missing, unknown or expired.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    /// The token the request was authenticated with.
    pub token: String,
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts).ok_or_else(ApiError::unauthorized)?;

        let user_id = state.sessions.validate(token).await.map_err(|e| {
            tracing::debug!("Token validation failed: {}", e);
            ApiError::unauthorized()
        })?;

        Ok(AuthUser {
            user_id,
            token: token.to_string(),
        })
    }
}

/// Optional authentication extractor.
///
/// Similar to AuthUser but a missing or invalid token yields an anonymous
/// caller instead of a rejection.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<i64>);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for OptionalAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = token_from_parts(parts) else {
            return Ok(OptionalAuthUser(None));
        };

        Ok(OptionalAuthUser(state.sessions.validate(token).await.ok()))
    }
}
