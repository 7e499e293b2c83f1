//! # ac-media-local
//!
//! Local-filesystem implementation of the `MediaIngest` port.
//!
//! Ingestion order matters: the declared size is checked before any bytes
//! are inspected, the real type comes from content sniffing (never the
//! client's filename or header), and the original + thumbnail pair is
//! written in two steps with a manual rollback of the first if the second
//! fails — the two writes are not transactional.

use async_trait::async_trait;
use ac_core::error::AppError;
use ac_core::models::StoredImage;
use ac_core::traits::MediaIngest;
use image::ImageFormat;
use rand::RngCore;
use std::io::Cursor;
use std::path::PathBuf;
use tokio::fs;

pub mod resize;

/// Default upload cap: 2 MiB.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 2 * 1024 * 1024;
/// Default thumbnail bounding box, square.
pub const DEFAULT_THUMB_BOUND: u32 = 250;

pub struct LocalMediaStore {
    upload_dir: PathBuf,
    thumb_dir: PathBuf,
    max_file_bytes: u64,
    thumb_max_w: u32,
    thumb_max_h: u32,
}

impl LocalMediaStore {
    /// Both directories must already exist; bootstrap is the binary's job.
    pub fn new(upload_dir: PathBuf, thumb_dir: PathBuf) -> Self {
        Self {
            upload_dir,
            thumb_dir,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            thumb_max_w: DEFAULT_THUMB_BOUND,
            thumb_max_h: DEFAULT_THUMB_BOUND,
        }
    }

    pub fn with_limits(mut self, max_file_bytes: u64, thumb_max_w: u32, thumb_max_h: u32) -> Self {
        self.max_file_bytes = max_file_bytes;
        self.thumb_max_w = thumb_max_w;
        self.thumb_max_h = thumb_max_h;
        self
    }

    /// Random filename stem. Server-chosen so client names are never
    /// trusted and collisions are vanishingly unlikely; `thread_rng` is a
    /// CSPRNG.
    fn random_stem() -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    async fn make_thumbnail(
        &self,
        data: &[u8],
        format: ImageFormat,
        stem: &str,
    ) -> Result<String, AppError> {
        let img = image::load_from_memory_with_format(data, format)
            .map_err(|e| AppError::DecodeFailure(e.to_string()))?;
        let thumb = resize::bounded(&img, self.thumb_max_w, self.thumb_max_h)?;

        // JPEG thumbnails stay JPEG; PNG and GIF become PNG so the alpha
        // channel survives encoding.
        let (ext, out_format) = match format {
            ImageFormat::Jpeg => ("jpg", ImageFormat::Jpeg),
            _ => ("png", ImageFormat::Png),
        };
        let name = format!("thumb_{stem}.{ext}");

        let mut encoded = Vec::new();
        thumb
            .write_to(&mut Cursor::new(&mut encoded), out_format)
            .map_err(|e| AppError::ResampleFailure(e.to_string()))?;

        let path = self.thumb_dir.join(&name);
        fs::write(&path, &encoded).await.map_err(|e| {
            log::error!("writing thumbnail {}: {e}", path.display());
            AppError::Storage("could not store thumbnail".to_string())
        })?;
        Ok(name)
    }
}

/// Content sniffing: the actual magic bytes decide the type, mapped to a
/// canonical extension. Allow-list is JPEG, PNG, GIF.
fn sniff_format(data: &[u8]) -> Result<(ImageFormat, &'static str), AppError> {
    let format = image::guess_format(data)
        .map_err(|_| AppError::UnsupportedType("unrecognized file content".to_string()))?;
    match format {
        ImageFormat::Jpeg => Ok((format, "jpg")),
        ImageFormat::Png => Ok((format, "png")),
        ImageFormat::Gif => Ok((format, "gif")),
        other => Err(AppError::UnsupportedType(format!("{other:?}"))),
    }
}

#[async_trait]
impl MediaIngest for LocalMediaStore {
    async fn ingest(&self, data: &[u8], declared_size: u64) -> Result<StoredImage, AppError> {
        if declared_size > self.max_file_bytes {
            return Err(AppError::FileTooLarge {
                declared: declared_size,
                limit: self.max_file_bytes,
            });
        }

        let (format, ext) = sniff_format(data)?;
        let stem = Self::random_stem();
        let original = format!("{stem}.{ext}");
        let original_path = self.upload_dir.join(&original);

        fs::write(&original_path, data).await.map_err(|e| {
            log::error!("writing upload {}: {e}", original_path.display());
            AppError::Storage("could not store upload".to_string())
        })?;

        match self.make_thumbnail(data, format, &stem).await {
            Ok(thumbnail) => Ok(StoredImage { file: original, thumbnail }),
            Err(e) => {
                // The original is already on disk; remove it so a failed
                // ingestion leaves nothing behind.
                if let Err(rm) = fs::remove_file(&original_path).await {
                    log::error!("rollback of {} failed: {rm}", original_path.display());
                }
                Err(e)
            }
        }
    }

    async fn discard(&self, stored: &StoredImage) {
        for path in [
            self.upload_dir.join(&stored.file),
            self.thumb_dir.join(&stored.thumbnail),
        ] {
            if let Err(e) = fs::remove_file(&path).await {
                log::warn!("discard of {} failed: {e}", path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, Rgba};
    use std::path::Path;
    use tempfile::TempDir;

    fn dirs() -> (TempDir, LocalMediaStore) {
        let tmp = TempDir::new().unwrap();
        let uploads = tmp.path().join("uploads");
        let thumbs = tmp.path().join("thumbs");
        std::fs::create_dir_all(&uploads).unwrap();
        std::fs::create_dir_all(&thumbs).unwrap();
        let store = LocalMediaStore::new(uploads, thumbs);
        (tmp, store)
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    fn png_bytes(w: u32, h: u32, pixel: [u8; 4]) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(w, h, Rgba(pixel)));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[tokio::test]
    async fn ingests_a_png_and_derives_the_thumbnail_name() {
        let (tmp, store) = dirs();
        let data = png_bytes(800, 400, [10, 20, 30, 255]);

        let stored = store.ingest(&data, data.len() as u64).await.unwrap();
        assert!(stored.file.ends_with(".png"));
        let stem = stored.file.trim_end_matches(".png");
        assert_eq!(stored.thumbnail, format!("thumb_{stem}.png"));

        let original = tmp.path().join("uploads").join(&stored.file);
        let thumb = tmp.path().join("thumbs").join(&stored.thumbnail);
        assert!(original.exists());
        assert!(thumb.exists());

        let thumb_img = image::open(&thumb).unwrap();
        assert_eq!(image::GenericImageView::dimensions(&thumb_img), (250, 125));
    }

    #[tokio::test]
    async fn oversize_declaration_is_rejected_before_anything_is_written() {
        let (tmp, store) = dirs();
        let data = png_bytes(8, 8, [0, 0, 0, 255]);

        let err = store.ingest(&data, 3 * 1024 * 1024).await.unwrap_err();
        assert!(matches!(err, AppError::FileTooLarge { .. }));
        assert_eq!(entries(&tmp.path().join("uploads")), 0);
        assert_eq!(entries(&tmp.path().join("thumbs")), 0);
    }

    #[tokio::test]
    async fn renamed_text_file_is_rejected_by_content_sniffing() {
        let (tmp, store) = dirs();
        let data = b"definitely not an image, whatever the filename said";

        let err = store.ingest(data, data.len() as u64).await.unwrap_err();
        assert!(matches!(err, AppError::UnsupportedType(_)));
        assert_eq!(entries(&tmp.path().join("uploads")), 0);
        assert_eq!(entries(&tmp.path().join("thumbs")), 0);
    }

    #[tokio::test]
    async fn truncated_png_fails_decode_and_rolls_back_the_original() {
        let (tmp, store) = dirs();
        let mut data = png_bytes(64, 64, [1, 2, 3, 255]);
        data.truncate(32); // keeps the magic bytes, breaks the decode

        let err = store.ingest(&data, data.len() as u64).await.unwrap_err();
        assert!(matches!(err, AppError::DecodeFailure(_)));
        assert_eq!(entries(&tmp.path().join("uploads")), 0);
    }

    #[tokio::test]
    async fn thumbnail_write_failure_rolls_back_the_original() {
        let tmp = TempDir::new().unwrap();
        let uploads = tmp.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        // Thumbnail directory deliberately missing, so the second write
        // fails after the original landed.
        let store = LocalMediaStore::new(uploads.clone(), tmp.path().join("no-such-dir"));

        let data = png_bytes(32, 32, [5, 5, 5, 255]);
        let err = store.ingest(&data, data.len() as u64).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(entries(&uploads), 0);
    }

    #[tokio::test]
    async fn discard_removes_both_files() {
        let (tmp, store) = dirs();
        let data = png_bytes(16, 16, [7, 7, 7, 128]);
        let stored = store.ingest(&data, data.len() as u64).await.unwrap();
        assert_eq!(entries(&tmp.path().join("uploads")), 1);

        store.discard(&stored).await;
        assert_eq!(entries(&tmp.path().join("uploads")), 0);
        assert_eq!(entries(&tmp.path().join("thumbs")), 0);
    }

    #[tokio::test]
    async fn transparent_png_keeps_its_alpha_in_the_thumbnail() {
        let (tmp, store) = dirs();
        let data = png_bytes(100, 100, [200, 100, 50, 0]);

        let stored = store.ingest(&data, data.len() as u64).await.unwrap();
        let thumb = image::open(tmp.path().join("thumbs").join(&stored.thumbnail)).unwrap();
        assert!(thumb.to_rgba8().pixels().all(|p| p.0[3] == 0));
    }
}
