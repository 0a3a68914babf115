//! File handlers.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::file::{
    can_read, check_content_readable, ContentStore, FileRepository, UploadPipeline,
    THUMBNAIL_WIDTHS,
};
use crate::web::dto::{FileDataQuery, FileResponse, ListFilesQuery, UploadFileRequest};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{AuthUser, JsonBody, OptionalAuthUser};

/// Parse a path id. Anything that is not a number names no file.
fn parse_file_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found())
}

/// POST /files - Upload a file or create a folder.
pub async fn post_upload(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    JsonBody(req): JsonBody<UploadFileRequest>,
) -> Result<(StatusCode, Json<FileResponse>), ApiError> {
    let pipeline = UploadPipeline::new(state.db.pool(), &state.content, &state.queue);
    let file = pipeline.upload(auth.user_id, req.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(FileResponse::for_viewer(file, Some(auth.user_id))),
    ))
}

/// GET /files/:id - File metadata.
///
/// The owner can always see it; anyone can see a public file. Everything
/// else is 404.
pub async fn get_show(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(caller): OptionalAuthUser,
    Path(id): Path<String>,
) -> Result<Json<FileResponse>, ApiError> {
    let id = parse_file_id(&id)?;

    let file = FileRepository::new(state.db.pool())
        .get_by_id(id)
        .await?
        .filter(|file| can_read(caller, file))
        .ok_or_else(ApiError::not_found)?;

    Ok(Json(FileResponse::for_viewer(file, caller)))
}

/// GET /files - One page of the caller's entries under a folder.
pub async fn get_index(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<Vec<FileResponse>>, ApiError> {
    let Some(parent_id) = query.parent_id() else {
        return Ok(Json(Vec::new()));
    };

    let files = FileRepository::new(state.db.pool())
        .list_children(auth.user_id, parent_id, query.page())
        .await?;

    Ok(Json(
        files
            .into_iter()
            .map(|file| FileResponse::for_viewer(file, Some(auth.user_id)))
            .collect(),
    ))
}

async fn set_visibility(
    state: &AppState,
    auth: &AuthUser,
    id: &str,
    is_public: bool,
) -> Result<Json<FileResponse>, ApiError> {
    let id = parse_file_id(id)?;
    let file = FileRepository::new(state.db.pool())
        .set_visibility(auth.user_id, id, is_public)
        .await?;

    tracing::info!(user_id = auth.user_id, file_id = id, is_public, "Visibility changed");
    Ok(Json(FileResponse::for_viewer(file, Some(auth.user_id))))
}

/// PUT /files/:id/publish - Make a file public.
pub async fn put_publish(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FileResponse>, ApiError> {
    set_visibility(&state, &auth, &id, true).await
}

/// PUT /files/:id/unpublish - Make a file private.
pub async fn put_unpublish(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FileResponse>, ApiError> {
    set_visibility(&state, &auth, &id, false).await
}

/// GET /files/:id/data - Raw content, or a thumbnail with `?size=`.
pub async fn get_file_data(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(caller): OptionalAuthUser,
    Path(id): Path<String>,
    Query(query): Query<FileDataQuery>,
) -> Result<Response, ApiError> {
    let id = parse_file_id(&id)?;

    let file = FileRepository::new(state.db.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(ApiError::not_found)?;
    check_content_readable(caller, &file)?;

    let local_path = file.local_path.as_deref().ok_or_else(ApiError::not_found)?;
    let path = match query.size.as_deref() {
        None => local_path.to_string(),
        Some(raw) => {
            let width = raw
                .parse::<u32>()
                .ok()
                .filter(|w| THUMBNAIL_WIDTHS.contains(w))
                .ok_or_else(|| ApiError::bad_request("Invalid size"))?;
            ContentStore::variant_path(local_path, width)
        }
    };

    // Missing bytes on disk (or a thumbnail not generated yet) read as 404.
    let content = state.content.read(&path).await?;

    let mime = mime_guess::from_path(&file.name).first_or_octet_stream();
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref())
        .body(Body::from(content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Internal Server Error")
        })
}
