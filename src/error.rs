//! Error types for Files Manager.

use thiserror::Error;

/// Common error type for Files Manager.
#[derive(Error, Debug)]
pub enum FilesManagerError {
    /// Malformed or missing input.
    ///
    /// The message is the client-facing reason, e.g. `Missing name`.
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired token or credentials.
    #[error("{0}")]
    Auth(String),

    /// Resource absent or not visible to the caller.
    ///
    /// Absence and denied access are deliberately reported the same way so
    /// callers cannot probe for the existence of other users' files.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate unique key.
    #[error("{0}")]
    Conflict(String),

    /// Database error.
    ///
    /// Errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Image decoding or encoding error.
    #[error("image error: {0}")]
    Image(String),

    /// Job queue error.
    #[error("queue error: {0}")]
    Queue(String),

    /// Broken internal invariant; never caused by client input.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for FilesManagerError {
    fn from(e: sqlx::Error) -> Self {
        FilesManagerError::Database(e.to_string())
    }
}

impl From<image::ImageError> for FilesManagerError {
    fn from(e: image::ImageError) -> Self {
        FilesManagerError::Image(e.to_string())
    }
}

impl FilesManagerError {
    /// Whether the error was caused by the caller rather than the backend.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FilesManagerError::Validation(_)
                | FilesManagerError::Auth(_)
                | FilesManagerError::NotFound(_)
                | FilesManagerError::Conflict(_)
        )
    }
}

/// Result type alias for Files Manager operations.
pub type Result<T> = std::result::Result<T, FilesManagerError>;
