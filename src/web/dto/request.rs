//! Request DTOs for Web API.

use serde::Deserialize;

use crate::file::UploadRequest;

/// User registration request.
///
/// Fields are optional so missing values reach the registration checks and
/// get their specific messages.
#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// An id sent either as a JSON number or as a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Number(i64),
    Text(String),
}

impl IdValue {
    /// Numeric value, if there is one.
    pub fn as_id(&self) -> Option<i64> {
        match self {
            IdValue::Number(n) => Some(*n),
            IdValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// File upload request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub file_type: Option<String>,
    #[serde(default)]
    pub parent_id: Option<IdValue>,
    #[serde(default)]
    pub is_public: bool,
    /// Base64 content.
    #[serde(default)]
    pub data: Option<String>,
}

/// Parent id that matches no folder. Used for unparsable ids so they fail
/// the parent check in the usual order.
const UNKNOWN_PARENT: i64 = -1;

impl From<UploadFileRequest> for UploadRequest {
    fn from(req: UploadFileRequest) -> Self {
        let parent_id = match req.parent_id {
            None => 0,
            Some(ref value) => value.as_id().unwrap_or(UNKNOWN_PARENT),
        };

        UploadRequest {
            name: req.name,
            file_type: req.file_type,
            parent_id,
            is_public: req.is_public,
            data: req.data,
        }
    }
}

/// Query string of `GET /files`.
///
/// Both values are parsed leniently.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesQuery {
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

impl ListFilesQuery {
    /// Zero-based page; missing, negative or garbage values mean page 0.
    pub fn page(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .unwrap_or(0)
    }

    /// Parent folder id; missing means the root. `None` if the value is not
    /// a number, which matches no folder.
    pub fn parent_id(&self) -> Option<i64> {
        match self.parent_id.as_deref() {
            None | Some("") => Some(0),
            Some(raw) => raw.trim().parse().ok(),
        }
    }
}

/// Query string of `GET /files/:id/data`.
#[derive(Debug, Default, Deserialize)]
pub struct FileDataQuery {
    /// Thumbnail width.
    #[serde(default)]
    pub size: Option<String>,
}
