//! Media service for uploaded images.

use std::sync::Arc;

use async_trait::async_trait;
use buddy_common::{
    AppResult, MediaFolder, StorageBackend, UploadedFile, generate_storage_key, validate_image,
};

/// Type alias for the storage backend shared by services.
pub type StorageService = Arc<dyn StorageBackend>;

/// An image received from a client, not yet stored.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Original file name.
    pub filename: String,
    /// Declared MIME type.
    pub content_type: String,
    /// Raw bytes.
    pub data: Vec<u8>,
}

/// Validates and stores images, and turns keys into URLs.
#[derive(Clone)]
pub struct MediaService {
    storage: StorageService,
    max_image_bytes: usize,
}

impl MediaService {
    /// Create a new media service.
    #[must_use]
    pub fn new(storage: StorageService, max_image_bytes: usize) -> Self {
        Self {
            storage,
            max_image_bytes,
        }
    }

    /// Validate and store an image. Returns the stored file.
    pub async fn store_image(
        &self,
        folder: MediaFolder,
        user_id: &str,
        upload: &ImageUpload,
    ) -> AppResult<UploadedFile> {
        validate_image(&upload.content_type, upload.data.len(), self.max_image_bytes)?;

        let key = generate_storage_key(folder, user_id, &upload.filename);
        let file = self
            .storage
            .upload(&key, &upload.data, &upload.content_type)
            .await?;

        tracing::debug!(key = %file.key, size = file.size, "Stored image");
        Ok(file)
    }

    /// Remove a stored image. Failures are logged and swallowed so that a
    /// stale file never blocks the database change that orphaned it.
    pub async fn discard(&self, key: Option<&str>) {
        let Some(key) = key else { return };
        if let Err(e) = self.storage.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Failed to delete stored image");
        }
    }

    /// Public URL of a stored key.
    #[must_use]
    pub fn url(&self, key: &str) -> String {
        self.storage.public_url(key)
    }
}

/// Storage backend that keeps nothing, for tests.
#[derive(Clone, Default)]
pub struct NoOpStorage {
    base_url: String,
}

impl NoOpStorage {
    /// Create a new no-op storage backend.
    #[must_use]
    pub const fn new(base_url: String) -> Self {
        Self { base_url }
    }
}

#[async_trait]
impl StorageBackend for NoOpStorage {
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<UploadedFile> {
        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
        })
    }

    async fn delete(&self, _key: &str) -> AppResult<()> {
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn exists(&self, _key: &str) -> AppResult<bool> {
        Ok(false)
    }
}
