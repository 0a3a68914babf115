//! Content storage on the local filesystem.
//!
//! Every stored blob gets a fresh UUID name directly under the root:
//! ```text
//! {root}/
//! ├── 5f0c9e7a-1b2d-4c3e-8f9a-0b1c2d3e4f5a
//! ├── 5f0c9e7a-1b2d-4c3e-8f9a-0b1c2d3e4f5a_500
//! ├── 5f0c9e7a-1b2d-4c3e-8f9a-0b1c2d3e4f5a_250
//! └── 5f0c9e7a-1b2d-4c3e-8f9a-0b1c2d3e4f5a_100
//! ```
//! The `_<width>` siblings are thumbnail variants of image content.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::{FilesManagerError, Result};

/// Filesystem-backed content store.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `content` under a new unique name and return its path.
    pub async fn write_new(&self, content: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.root).await?;

        let path = self.root.join(Uuid::new_v4().to_string());
        fs::write(&path, content).await?;

        debug!(path = %path.display(), bytes = content.len(), "Content written");
        Ok(path)
    }

    /// Write `content` at an explicit path, replacing what is there.
    pub async fn write_at(&self, path: impl AsRef<Path>, content: &[u8]) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, content).await?;
        Ok(())
    }

    /// Read the content at `path`. A missing file is `NotFound`.
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        match fs::read(path.as_ref()).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(FilesManagerError::NotFound("Not found".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether content exists at `path`.
    pub async fn exists(&self, path: impl AsRef<Path>) -> bool {
        fs::try_exists(path.as_ref()).await.unwrap_or(false)
    }

    /// Path of the `width` thumbnail variant of `path`.
    pub fn variant_path(path: &str, width: u32) -> String {
        format!("{path}_{width}")
    }
}
