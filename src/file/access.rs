//! Read access decisions.
//!
//! Denied reads surface as `NotFound` so a caller cannot tell a private file
//! from a missing one.

use super::FileRecord;
use crate::{FilesManagerError, Result};

/// Whether `caller` may read `file`. `None` is an anonymous caller.
pub fn can_read(caller: Option<i64>, file: &FileRecord) -> bool {
    file.is_public || caller == Some(file.user_id)
}

/// Gate for content reads.
///
/// Folders are rejected before visibility is considered.
pub fn check_content_readable(caller: Option<i64>, file: &FileRecord) -> Result<()> {
    if file.is_folder() {
        return Err(FilesManagerError::Validation(
            "A folder doesn't have content".to_string(),
        ));
    }
    if !can_read(caller, file) {
        return Err(FilesManagerError::NotFound("Not found".to_string()));
    }
    Ok(())
}
