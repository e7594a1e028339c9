//! Blob storage for listing images.
//!
//! Uploads land on the local filesystem and are served back under a
//! configured URL prefix. The [`StorageBackend`] trait is the seam a
//! remote object store would plug into.

use std::path::{Component, Path, PathBuf};

use image::ImageFormat;

use crate::{AppError, AppResult};

/// Content types accepted for listing images.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Metadata of a stored blob.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key relative to the backend root.
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
    /// MD5 hash of the contents.
    pub md5: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store `data` under `key`.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str)
    -> AppResult<UploadedFile>;

    /// Public URL for a key.
    fn public_url(&self, key: &str) -> String;
}

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
        }
    }

    /// Resolve a key below the base path, rejecting traversal.
    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let relative = Path::new(key);
        let clean = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !clean {
            return Err(AppError::BadRequest(format!("Invalid storage key: {key}")));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile> {
        let path = self.resolve(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write file: {e}")))?;

        let md5 = format!("{:x}", md5::compute(data));
        tracing::debug!(key = %key, size = data.len(), "Stored blob");

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            md5,
        })
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

/// A listing image format recognised from the file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageKind {
    /// MIME type of the format.
    pub content_type: &'static str,
    /// File extension the blob is stored under.
    pub extension: &'static str,
}

/// Recognise an accepted image format from its leading bytes.
///
/// Anything that is not JPEG, PNG, GIF or WebP yields `None`.
#[must_use]
pub fn detect_image(data: &[u8]) -> Option<ImageKind> {
    let (content_type, extension) = match image::guess_format(data).ok()? {
        ImageFormat::Jpeg => ("image/jpeg", "jpg"),
        ImageFormat::Png => ("image/png", "png"),
        ImageFormat::Gif => ("image/gif", "gif"),
        ImageFormat::WebP => ("image/webp", "webp"),
        _ => return None,
    };
    Some(ImageKind {
        content_type,
        extension,
    })
}

/// Storage key for a listing image.
///
/// Keys look like `listings/{user}/{yyyy/mm/dd}/{millis}_{uuid}.{ext}`. The
/// extension comes from the detected image format, never from the client's
/// file name, since `/files` picks the served content type from it.
#[must_use]
pub fn generate_storage_key(user_id: &str, kind: ImageKind) -> String {
    let now = chrono::Utc::now();
    let date_path = now.format("%Y/%m/%d");
    let timestamp = now.timestamp_millis();

    format!(
        "listings/{user_id}/{date_path}/{timestamp}_{}.{}",
        uuid::Uuid::new_v4().simple(),
        kind.extension
    )
}

/// Whether `content_type` is an accepted listing image type.
#[must_use]
pub fn is_allowed_image(content_type: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&content_type)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_detect_image() {
        let png = detect_image(PNG_HEADER).unwrap();
        assert_eq!(png.content_type, "image/png");
        assert_eq!(png.extension, "png");

        let jpeg = detect_image(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]).unwrap();
        assert_eq!(jpeg.extension, "jpg");

        assert!(detect_image(b"<html><script>alert(1)</script></html>").is_none());
        assert!(detect_image(b"").is_none());
    }

    #[test]
    fn test_generate_storage_key() {
        let key = generate_storage_key("user123", detect_image(PNG_HEADER).unwrap());
        assert!(key.starts_with("listings/user123/"));
        assert!(key.ends_with(".png"));
        assert_eq!(key.split('/').count(), 6);
    }

    #[test]
    fn test_allowed_image() {
        assert!(is_allowed_image("image/png"));
        assert!(!is_allowed_image("application/pdf"));
    }

    #[tokio::test]
    async fn test_local_upload() {
        let dir = std::env::temp_dir().join(format!("resource-storage-{}", uuid::Uuid::new_v4()));
        let storage = LocalStorage::new(dir.clone(), "/files/".to_string());

        let file = storage
            .upload("listings/u1/1_a.png", PNG_HEADER, "image/png")
            .await
            .unwrap();
        assert_eq!(file.url, "/files/listings/u1/1_a.png");
        assert_eq!(file.size, PNG_HEADER.len() as u64);

        let stored = tokio::fs::read(dir.join("listings/u1/1_a.png")).await.unwrap();
        assert_eq!(stored, PNG_HEADER);

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn test_local_rejects_traversal() {
        let storage = LocalStorage::new(PathBuf::from("./files"), "/files".to_string());
        let result = storage.upload("../escape.png", b"x", "image/png").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
