//! Lenient JSON body extractor.
//!
//! An empty body deserializes as `T::default()` so that missing fields are
//! reported by the handler's own checks (`Missing name`, `Missing email`)
//! instead of a generic parse error. Malformed JSON is a 400 in the usual
//! `{"error": ...}` shape.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

use crate::web::error::ApiError;

/// JSON request body.
#[derive(Debug, Clone, Default)]
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // Oversized bodies keep axum's 413.
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonBody(T::default()));
        }

        serde_json::from_slice(&bytes).map(JsonBody).map_err(|e| {
            tracing::debug!("Rejected malformed JSON body: {}", e);
            ApiError::bad_request("Invalid JSON").into_response()
        })
    }
}
