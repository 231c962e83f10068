//! Remote publisher used by the ingestion pipeline.
//!
//! Wraps a [`Storage`] backend with the two operations ingestion needs:
//! upload a finished local file under a key, and mint a time-limited read
//! URL for a key. Neither operation retries.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::keys::validate_key;
use crate::traits::{Storage, StorageResult};

#[derive(Clone)]
pub struct Publisher {
    storage: Arc<dyn Storage>,
}

impl Publisher {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Upload `local_path` to `storage_key` with `content_type`.
    ///
    /// On success the returned key equals `storage_key` and the object is
    /// fully readable. On failure the key must not be recorded anywhere.
    #[tracing::instrument(skip(self), fields(backend = %self.storage.backend_type()))]
    pub async fn publish(
        &self,
        local_path: &Path,
        storage_key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        validate_key(storage_key)?;
        let size = self
            .storage
            .upload_file(storage_key, local_path, content_type)
            .await?;
        tracing::debug!(size_bytes = size, "Object published");
        Ok(storage_key.to_string())
    }

    /// Time-limited GET URL for `storage_key`. Each call yields a distinct URL.
    pub async fn sign(&self, storage_key: &str, ttl: Duration) -> StorageResult<String> {
        validate_key(storage_key)?;
        self.storage.get_presigned_url(storage_key, ttl).await
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use crate::{LocalStorage, StorageError};
    use tempfile::TempDir;

    async fn publisher(dir: &TempDir) -> Publisher {
        let storage = LocalStorage::new(
            dir.path().join("assets"),
            "http://localhost:8091/assets".to_string(),
            "0123456789abcdef0123456789abcdef",
        )
        .await
        .unwrap();
        Publisher::new(Arc::new(storage))
    }

    #[tokio::test]
    async fn test_publish_then_sign() {
        let dir = TempDir::new().unwrap();
        let publisher = publisher(&dir).await;
        let source = dir.path().join("video.mp4");
        tokio::fs::write(&source, b"moov").await.unwrap();

        let key = publisher
            .publish(&source, "other/0001.mp4", "video/mp4")
            .await
            .unwrap();
        assert_eq!(key, "other/0001.mp4");
        assert!(publisher.storage().exists(&key).await.unwrap());

        let url = publisher.sign(&key, Duration::from_secs(600)).await.unwrap();
        assert!(url.contains("other/0001.mp4"));
    }

    #[tokio::test]
    async fn test_sign_rejects_legacy_reference() {
        let dir = TempDir::new().unwrap();
        let publisher = publisher(&dir).await;
        assert!(matches!(
            publisher
                .sign("tubely-bucket,landscape/abc.mp4", Duration::from_secs(600))
                .await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_missing_source() {
        let dir = TempDir::new().unwrap();
        let publisher = publisher(&dir).await;
        let result = publisher
            .publish(&dir.path().join("gone.mp4"), "other/0002.mp4", "video/mp4")
            .await;
        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
        assert!(!publisher.storage().exists("other/0002.mp4").await.unwrap());
    }
}
