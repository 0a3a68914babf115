//! Router configuration for the HTTP surface.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    get_connect, get_disconnect, get_file_data, get_index, get_me, get_show, get_stats,
    get_status, post_new, post_upload, put_publish, put_unpublish, AppState,
};
use super::middleware::create_cors_layer;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let body_limit = app_state.max_body_size;

    let app_routes = Router::new()
        .route("/status", get(get_status))
        .route("/stats", get(get_stats));

    let user_routes = Router::new()
        .route("/users", post(post_new))
        .route("/users/me", get(get_me))
        .route("/connect", get(get_connect))
        .route("/disconnect", get(get_disconnect));

    let file_routes = Router::new()
        .route("/files", get(get_index).post(post_upload))
        .route("/files/:id", get(get_show))
        .route("/files/:id/publish", put(put_publish))
        .route("/files/:id/unpublish", put(put_unpublish))
        .route("/files/:id/data", get(get_file_data));

    Router::new()
        .merge(app_routes)
        .merge(user_routes)
        .merge(file_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(app_state)
}
