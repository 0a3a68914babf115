//! Upload pipeline: validate, store content, record metadata, queue
//! thumbnail work.
//!
//! Order matters. Content is written before metadata so no record ever
//! points at missing bytes, and the thumbnail job is queued only after the
//! record is committed so a worker never sees a file that is not there yet.
//! If the metadata insert fails after the content write, the blob is left
//! behind; nothing here reconciles it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{info, warn};

use super::{ContentStore, FileRecord, FileRepository, FileType, NewFile};
use crate::db::DbPool;
use crate::queue::{JobQueue, QueueName, ThumbnailJob};
use crate::{FilesManagerError, Result};

/// An incoming upload, as submitted by the client.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub name: Option<String>,
    /// Raw type string; checked against the known types.
    pub file_type: Option<String>,
    /// Target folder, 0 for the root.
    pub parent_id: i64,
    pub is_public: bool,
    /// Base64-encoded content. Required unless the type is `folder`.
    pub data: Option<String>,
}

/// Runs uploads against the shared stores.
pub struct UploadPipeline<'a> {
    pool: &'a DbPool,
    store: &'a ContentStore,
    queue: &'a JobQueue,
}

impl<'a> UploadPipeline<'a> {
    pub fn new(pool: &'a DbPool, store: &'a ContentStore, queue: &'a JobQueue) -> Self {
        Self { pool, store, queue }
    }

    /// Upload on behalf of `user_id`.
    ///
    /// Validation order is name, type, data, parent; the first failure is
    /// reported.
    pub async fn upload(&self, user_id: i64, request: UploadRequest) -> Result<FileRecord> {
        let name = request
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| FilesManagerError::Validation("Missing name".to_string()))?;

        let file_type = FileType::parse(request.file_type.as_deref().unwrap_or_default())?;

        let data = match file_type {
            FileType::Folder => None,
            _ => Some(
                request
                    .data
                    .filter(|d| !d.is_empty())
                    .ok_or_else(|| FilesManagerError::Validation("Missing data".to_string()))?,
            ),
        };

        let repo = FileRepository::new(self.pool);
        repo.check_parent(user_id, request.parent_id).await?;

        let Some(data) = data else {
            let folder = repo
                .create(
                    &NewFile::folder(user_id, name, request.parent_id)
                        .with_public(request.is_public),
                )
                .await?;
            info!(user_id, file_id = folder.id, "Folder created");
            return Ok(folder);
        };

        let content = STANDARD.decode(data.as_bytes()).map_err(|e| {
            warn!(user_id, "Rejected upload with undecodable data: {}", e);
            FilesManagerError::Validation("Invalid data".to_string())
        })?;

        let path = self.store.write_new(&content).await?;
        let local_path = path.to_string_lossy().into_owned();

        let file = repo
            .create(
                &NewFile::content(user_id, name, file_type, request.parent_id, local_path)
                    .with_public(request.is_public),
            )
            .await?;

        info!(
            user_id,
            file_id = file.id,
            bytes = content.len(),
            "File uploaded"
        );

        if file_type == FileType::Image {
            self.queue
                .submit(QueueName::Thumbnail, &ThumbnailJob::new(user_id, file.id))
                .await?;
        }

        Ok(file)
    }
}
