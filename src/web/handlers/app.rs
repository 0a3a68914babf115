//! Service health and counters.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::db::UserRepository;
use crate::file::FileRepository;
use crate::web::dto::{StatsResponse, StatusResponse};
use crate::web::handlers::AppState;

/// GET /status - Reachability of the backing stores.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        redis: state.kv.is_alive().await,
        db: state.db.is_alive().await,
    })
}

/// GET /stats - Number of users and files.
///
/// A failing count is reported as 0 rather than failing the response.
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let users = UserRepository::new(state.db.pool())
        .count()
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to count users: {}", e);
            0
        });
    let files = FileRepository::new(state.db.pool())
        .count()
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to count files: {}", e);
            0
        });

    Json(StatsResponse { users, files })
}
