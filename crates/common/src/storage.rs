//! Media storage for uploaded images.

use std::path::PathBuf;

use crate::{AppError, AppResult};

/// Folder an uploaded image is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFolder {
    /// Profile pictures.
    ProfilePictures,
    /// Profile cover photos.
    CoverPhotos,
    /// Images attached to posts.
    PostImages,
}

impl MediaFolder {
    /// Path prefix for keys in this folder.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProfilePictures => "profile_pics",
            Self::CoverPhotos => "cover_photos",
            Self::PostImages => "post_images",
        }
    }
}

/// Uploaded file metadata.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key (path relative to the storage root).
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Upload a file.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str)
    -> AppResult<UploadedFile>;

    /// Delete a file. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;

    /// Check if a file exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    ///
    /// `base_url` may be a path (`/media`) or an absolute URL.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
        }
    }

    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        if key.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(AppError::BadRequest(format!("Invalid storage key: {key}")));
        }
        Ok(self.base_path.join(key))
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

        tracing::debug!(key = %key, size = data.len(), "Stored file");

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to delete file: {e}")))?;
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.resolve(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to stat file: {e}")))
    }
}

/// Generate a unique storage key for an uploaded file.
#[must_use]
pub fn generate_storage_key(folder: MediaFolder, user_id: &str, original_name: &str) -> String {
    use chrono::Utc;

    let now = Utc::now();
    let date_path = now.format("%Y/%m/%d").to_string();

    let extension = original_name
        .rfind('.')
        .filter(|&pos| pos > 0 && pos < original_name.len() - 1)
        .map(|pos| &original_name[pos + 1..])
        .filter(|ext| ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map_or_else(|| "bin".to_string(), str::to_ascii_lowercase);

    format!(
        "{}/{}/{}_{}.{}",
        folder.as_str(),
        date_path,
        user_id,
        uuid::Uuid::new_v4().simple(),
        extension
    )
}

/// Check an uploaded image against the accepted type and size.
pub fn validate_image(content_type: &str, size: usize, max_bytes: usize) -> AppResult<()> {
    if !content_type.starts_with("image/") {
        return Err(AppError::Validation(
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
                .to_string(),
        ));
    }
    if size > max_bytes {
        return Err(AppError::Validation(format!(
            "Image file too large ( > {}MB )",
            max_bytes / (1024 * 1024)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_storage_key() {
        let key = generate_storage_key(MediaFolder::PostImages, "user123", "Photo.JPG");
        assert!(key.starts_with("post_images/"));
        assert!(key.contains("user123"));
        assert!(key.ends_with(".jpg"));
    }

    #[test]
    fn test_generate_storage_key_no_extension() {
        let key = generate_storage_key(MediaFolder::ProfilePictures, "user123", "file");
        assert!(key.starts_with("profile_pics/"));
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn test_validate_image() {
        assert!(validate_image("image/png", 1024, 2048).is_ok());
        assert!(matches!(
            validate_image("text/plain", 10, 2048),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_image("image/jpeg", 4096, 2048),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_public_url() {
        let storage = LocalStorage::new(PathBuf::from("/tmp"), "http://host/media/".to_string());
        assert_eq!(storage.public_url("a/b.png"), "http://host/media/a/b.png");
    }

    #[tokio::test]
    async fn test_local_upload_and_delete() {
        let dir = std::env::temp_dir().join(format!("buddy-storage-{}", uuid::Uuid::new_v4()));
        let storage = LocalStorage::new(dir.clone(), "/media".to_string());

        let uploaded = storage
            .upload("post_images/x.png", b"png-bytes", "image/png")
            .await
            .unwrap();
        assert_eq!(uploaded.size, 9);
        assert_eq!(uploaded.url, "/media/post_images/x.png");
        assert!(storage.exists("post_images/x.png").await.unwrap());

        storage.delete("post_images/x.png").await.unwrap();
        assert!(!storage.exists("post_images/x.png").await.unwrap());
        assert!(storage.exists("../etc/passwd").await.is_err());

        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
