//! File metadata types and repository.

use serde::{Deserialize, Serialize};

use super::PAGE_SIZE;
use crate::db::DbPool;
use crate::{FilesManagerError, Result};

/// Kind of entry in the file tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum FileType {
    /// Hierarchy node without content.
    Folder,
    File,
    /// Content that gets thumbnail variants.
    Image,
}

impl FileType {
    /// Parse a client-supplied type. Unknown or empty values are rejected
    /// with `Missing type`.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "folder" => Ok(FileType::Folder),
            "file" => Ok(FileType::File),
            "image" => Ok(FileType::Image),
            _ => Err(FilesManagerError::Validation("Missing type".to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Folder => "folder",
            FileType::File => "file",
            FileType::Image => "image",
        }
    }
}

/// A stored file, image or folder.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileRecord {
    pub id: i64,
    /// Owner. Never changes after creation.
    pub user_id: i64,
    pub name: String,
    pub file_type: FileType,
    /// Containing folder id, or 0 for the root.
    pub parent_id: i64,
    pub is_public: bool,
    /// Content location. `None` exactly when `file_type` is `Folder`.
    pub local_path: Option<String>,
    pub created_at: String,
}

impl FileRecord {
    pub fn is_folder(&self) -> bool {
        self.file_type == FileType::Folder
    }
}

/// Data for creating a new file entry.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub user_id: i64,
    pub name: String,
    pub file_type: FileType,
    pub parent_id: i64,
    pub is_public: bool,
    pub local_path: Option<String>,
}

impl NewFile {
    /// A private folder.
    pub fn folder(user_id: i64, name: impl Into<String>, parent_id: i64) -> Self {
        Self {
            user_id,
            name: name.into(),
            file_type: FileType::Folder,
            parent_id,
            is_public: false,
            local_path: None,
        }
    }

    /// A private file or image stored at `local_path`.
    pub fn content(
        user_id: i64,
        name: impl Into<String>,
        file_type: FileType,
        parent_id: i64,
        local_path: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            name: name.into(),
            file_type,
            parent_id,
            is_public: false,
            local_path: Some(local_path.into()),
        }
    }

    /// Set the initial visibility.
    pub fn with_public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    /// Folders carry no path and everything else needs one.
    fn shape_error(&self) -> Option<&'static str> {
        match (self.file_type, &self.local_path) {
            (FileType::Folder, Some(_)) => Some("folder entry must not have a local path"),
            (FileType::File | FileType::Image, None) => Some("content entry has no local path"),
            _ => None,
        }
    }
}

const FILE_COLUMNS: &str =
    "id, user_id, name, file_type, parent_id, is_public, local_path, created_at";

/// Repository for file metadata.
pub struct FileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Check that `parent_id` may hold children of `user_id`.
    ///
    /// `0` is the root and always valid. Otherwise the parent must be one
    /// of the user's folders.
    pub async fn check_parent(&self, user_id: i64, parent_id: i64) -> Result<()> {
        if parent_id == 0 {
            return Ok(());
        }

        let parent = self
            .get_owned(user_id, parent_id)
            .await?
            .ok_or_else(|| FilesManagerError::Validation("Parent not found".to_string()))?;

        if !parent.is_folder() {
            return Err(FilesManagerError::Validation(
                "Parent is not a folder".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a new file entry.
    pub async fn create(&self, new_file: &NewFile) -> Result<FileRecord> {
        if new_file.name.is_empty() {
            return Err(FilesManagerError::Validation("Missing name".to_string()));
        }
        if let Some(problem) = new_file.shape_error() {
            return Err(FilesManagerError::Internal(problem.to_string()));
        }
        self.check_parent(new_file.user_id, new_file.parent_id)
            .await?;

        let result = sqlx::query(
            "INSERT INTO files (user_id, name, file_type, parent_id, is_public, local_path)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(new_file.user_id)
        .bind(&new_file.name)
        .bind(new_file.file_type)
        .bind(new_file.parent_id)
        .bind(new_file.is_public)
        .bind(&new_file.local_path)
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| FilesManagerError::NotFound("file".to_string()))
    }

    /// Get a file by ID, regardless of owner.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?");
        let file = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(file)
    }

    /// Get a file by ID if it belongs to `user_id`.
    pub async fn get_owned(&self, user_id: i64, id: i64) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ? AND user_id = ?");
        let file = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(file)
    }

    /// List one page of a user's entries under `parent_id`.
    ///
    /// Pages are zero-based and hold at most [`PAGE_SIZE`] records in
    /// creation order. A page past the end is empty.
    pub async fn list_children(
        &self,
        user_id: i64,
        parent_id: i64,
        page: u32,
    ) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE user_id = ? AND parent_id = ?
             ORDER BY id
             LIMIT ? OFFSET ?"
        );
        let files = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(user_id)
            .bind(parent_id)
            .bind(PAGE_SIZE)
            .bind(page as i64 * PAGE_SIZE)
            .fetch_all(self.pool)
            .await?;
        Ok(files)
    }

    /// Set the public flag on one of the caller's files.
    ///
    /// A file that does not exist and a file owned by someone else both
    /// give `NotFound`.
    pub async fn set_visibility(&self, user_id: i64, id: i64, is_public: bool) -> Result<FileRecord> {
        let updated = sqlx::query("UPDATE files SET is_public = ? WHERE id = ? AND user_id = ?")
            .bind(is_public)
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(FilesManagerError::NotFound("Not found".to_string()));
        }

        self.get_owned(user_id, id)
            .await?
            .ok_or_else(|| FilesManagerError::NotFound("Not found".to_string()))
    }

    /// Count all file entries.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
