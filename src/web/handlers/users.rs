//! User handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::auth::register;
use crate::db::UserRepository;
use crate::web::dto::{CreateUserRequest, UserResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{AuthUser, JsonBody};

/// POST /users - Register a new user.
pub async fn post_new(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let user = register(
        &repo,
        &state.queue,
        req.email.as_deref(),
        req.password.as_deref(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// GET /users/me - The user behind the token.
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_id(auth.user_id)
        .await?
        // A token for a user that no longer exists is as good as none.
        .ok_or_else(ApiError::unauthorized)?;

    Ok(Json(UserResponse::from(&user)))
}
