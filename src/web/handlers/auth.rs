//! Connect and disconnect handlers.

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::{
    headers::{authorization::Basic, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use crate::auth::authenticate;
use crate::db::UserRepository;
use crate::web::dto::TokenResponse;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// GET /connect - Exchange Basic credentials for a session token.
pub async fn get_connect(
    State(state): State<Arc<AppState>>,
    credentials: Option<TypedHeader<Authorization<Basic>>>,
) -> Result<Json<TokenResponse>, ApiError> {
    let TypedHeader(Authorization(basic)) = credentials.ok_or_else(ApiError::unauthorized)?;

    let repo = UserRepository::new(state.db.pool());
    let user = authenticate(&repo, basic.username(), basic.password())
        .await
        .map_err(ApiError::from)?;

    let token = state.sessions.issue(user.id).await?;
    Ok(Json(TokenResponse { token }))
}

/// GET /disconnect - Revoke the caller's token.
pub async fn get_disconnect(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<StatusCode, ApiError> {
    state.sessions.revoke(&auth.token).await?;
    tracing::info!(user_id = auth.user_id, "User disconnected");
    Ok(StatusCode::NO_CONTENT)
}
