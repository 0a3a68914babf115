//! Middleware and extractors for the HTTP surface.

pub mod auth;
pub mod cors;
pub mod json;

pub use auth::{AuthUser, OptionalAuthUser, TOKEN_HEADER};
pub use cors::create_cors_layer;
pub use json::JsonBody;
