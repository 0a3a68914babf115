//! HTTP API for Files Manager.
//!
//! Clients register, exchange Basic credentials for a session token, and
//! manage their files with the token in the `X-Token` header.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
