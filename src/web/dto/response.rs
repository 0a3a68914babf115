//! Response DTOs for Web API.

use serde::Serialize;

use crate::datetime::to_rfc3339;
use crate::db::User;
use crate::file::{FileRecord, FileType};

/// `GET /status` body.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Key-value store reachable.
    pub redis: bool,
    /// Document store reachable.
    pub db: bool,
}

/// `GET /stats` body.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub users: i64,
    pub files: i64,
}

/// Public view of a user. Never carries the password digest.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

/// `GET /connect` body.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// File projection returned by the file endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub is_public: bool,
    pub parent_id: i64,
    /// Only shown to the owner, and only for entries with content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    pub created_at: String,
}

impl FileResponse {
    /// Projection for `viewer`. `localPath` is included only when the
    /// viewer owns the file.
    pub fn for_viewer(file: FileRecord, viewer: Option<i64>) -> Self {
        let local_path = if viewer == Some(file.user_id) {
            file.local_path
        } else {
            None
        };

        Self {
            id: file.id,
            user_id: file.user_id,
            name: file.name,
            file_type: file.file_type,
            is_public: file.is_public,
            parent_id: file.parent_id,
            local_path,
            created_at: to_rfc3339(&file.created_at),
        }
    }
}
