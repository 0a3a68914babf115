//! Thumbnail generation for uploaded images.
//!
//! Each image gets one variant per entry in [`THUMBNAIL_WIDTHS`], stored
//! next to the original as `<path>_<width>`. Re-running a job overwrites the
//! same paths, so redelivery is harmless.

use std::io::Cursor;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageOutputFormat};
use tracing::{debug, info, warn};

use super::{ContentStore, FileRepository, THUMBNAIL_WIDTHS};
use crate::db::Database;
use crate::queue::{Job, JobError, JobHandler, QueueName, ThumbnailJob};
use crate::{FilesManagerError, Result};

/// Largest variant, in pixels. The resampler keeps an `Rgba<f32>`
/// intermediate, so this caps a single resize at 512 MiB.
pub const MAX_VARIANT_PIXELS: u64 = 32 * 1024 * 1024;

/// Resize `image` to `width`, keeping the aspect ratio.
///
/// Fails without allocating when the result would exceed
/// [`MAX_VARIANT_PIXELS`], e.g. a 1x20000 source scaled to 500 wide.
pub fn resize_to_width(image: &DynamicImage, width: u32) -> Result<DynamicImage> {
    let (w, h) = image.dimensions();
    let width = width.max(1);
    let height = ((h as f64 * width as f64) / w.max(1) as f64).round().max(1.0);

    if height * width as f64 > MAX_VARIANT_PIXELS as f64 {
        return Err(FilesManagerError::Image(format!(
            "{w}x{h} source would produce an oversized {width}px variant"
        )));
    }

    Ok(image.resize_exact(width, height as u32, FilterType::Lanczos3))
}

/// Encoding used for variants: the source format when it can be written
/// back, PNG otherwise.
fn output_format(source: &[u8]) -> ImageFormat {
    match image::guess_format(source) {
        Ok(format @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::Bmp)) => {
            format
        }
        _ => ImageFormat::Png,
    }
}

/// Encode an image in `format`.
pub fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    match format {
        // The JPEG encoder has no alpha channel.
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
            .write_to(&mut buf, ImageOutputFormat::Jpeg(85))?,
        other => image.write_to(&mut buf, ImageOutputFormat::from(other))?,
    }
    Ok(buf.into_inner())
}

/// Decode `source` and produce one encoded variant per width.
///
/// CPU bound; call from a blocking context.
pub fn generate_variants(source: &[u8], widths: &[u32]) -> Result<Vec<(u32, Vec<u8>)>> {
    let image = image::load_from_memory(source)?;
    let format = output_format(source);

    widths
        .iter()
        .map(|&width| Ok((width, encode(&resize_to_width(&image, width)?, format)?)))
        .collect()
}

/// Consumes the `thumbnail` queue.
pub struct ThumbnailHandler {
    db: Database,
    store: ContentStore,
}

impl ThumbnailHandler {
    pub fn new(db: Database, store: ContentStore) -> Self {
        Self { db, store }
    }
}

#[async_trait]
impl JobHandler for ThumbnailHandler {
    fn queue(&self) -> QueueName {
        QueueName::Thumbnail
    }

    async fn handle(&self, job: &Job) -> std::result::Result<(), JobError> {
        let payload: ThumbnailJob = job
            .payload_as()
            .map_err(|e| JobError::Permanent(format!("Invalid payload: {e}")))?;
        let file_id = payload
            .file_id
            .ok_or_else(|| JobError::Permanent("Missing fileId".to_string()))?;
        let user_id = payload
            .user_id
            .ok_or_else(|| JobError::Permanent("Missing userId".to_string()))?;

        let file = FileRepository::new(self.db.pool())
            .get_owned(user_id, file_id)
            .await?
            .ok_or_else(|| JobError::Permanent("File not found".to_string()))?;
        let local_path = file
            .local_path
            .ok_or_else(|| JobError::Permanent("File not found".to_string()))?;

        let source = self.store.read(&local_path).await.map_err(|e| match e {
            FilesManagerError::NotFound(_) => JobError::Permanent("File not found".to_string()),
            other => JobError::from(other),
        })?;

        let variants = tokio::task::spawn_blocking(move || {
            generate_variants(&source, &THUMBNAIL_WIDTHS)
        })
        .await
        .map_err(|e| JobError::Transient(format!("thumbnail task failed: {e}")))?
        .map_err(|e| JobError::Permanent(e.to_string()))?;

        let mut failed = Vec::new();
        for (width, bytes) in variants {
            let path = ContentStore::variant_path(&local_path, width);
            match self.store.write_at(&path, &bytes).await {
                Ok(()) => debug!(file_id, width, "Thumbnail written"),
                Err(e) => {
                    warn!(file_id, width, "Failed to write thumbnail: {}", e);
                    failed.push(width);
                }
            }
        }

        if !failed.is_empty() {
            return Err(JobError::Transient(format!(
                "failed to write thumbnail sizes {failed:?}"
            )));
        }

        info!(file_id, user_id, "Thumbnails generated");
        Ok(())
    }
}
