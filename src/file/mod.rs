//! File management module for Files Manager.
//!
//! This module provides:
//! - File and folder metadata with owner-scoped hierarchy checks
//! - Read access decisions for owners, other users and anonymous callers
//! - Content storage with UUID naming
//! - The upload pipeline and thumbnail generation

mod access;
mod metadata;
mod storage;
mod thumbnail;
mod upload;

pub use access::{can_read, check_content_readable};
pub use metadata::{FileRecord, FileRepository, FileType, NewFile};
pub use storage::ContentStore;
pub use thumbnail::{encode, generate_variants, resize_to_width, ThumbnailHandler};
pub use upload::{UploadPipeline, UploadRequest};

/// Records per page when listing a folder.
pub const PAGE_SIZE: i64 = 20;

/// Widths of the generated thumbnail variants, in pixels.
pub const THUMBNAIL_WIDTHS: [u32; 3] = [500, 250, 100];
