//! Video records kept in a JSON file (an array of records).
//!
//! Stand-in for the host application's metadata store when running the
//! pipeline from the command line.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

use tubely_core::{InMemoryVideoRepository, RepositoryError, VideoRecord, VideoRepository};

pub struct JsonFileRepository {
    path: PathBuf,
    records: InMemoryVideoRepository,
    write_lock: Mutex<()>,
}

impl JsonFileRepository {
    /// Load records from `path`. A missing file is an empty repository.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();

        let records: Vec<VideoRecord> = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                RepositoryError::Backend(format!("Invalid records file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(RepositoryError::Backend(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        tracing::debug!(path = %path.display(), count = records.len(), "Records loaded");

        Ok(Self {
            path,
            records: InMemoryVideoRepository::from_records(records),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> Result<Vec<VideoRecord>, RepositoryError> {
        self.records.snapshot()
    }

    /// Add a new record and write the file.
    pub async fn create_record(&self, record: VideoRecord) -> Result<(), RepositoryError> {
        self.records.insert(record)?;
        self.persist().await
    }

    /// Write all records to a sibling temp file, then rename over the original.
    async fn persist(&self) -> Result<(), RepositoryError> {
        let _guard = self.write_lock.lock().await;

        let records = self.records.snapshot()?;
        let json = serde_json::to_vec_pretty(&records)
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RepositoryError::Backend(e.to_string()))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| RepositoryError::Backend(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            RepositoryError::Backend(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;

        Ok(())
    }
}

#[async_trait]
impl VideoRepository for JsonFileRepository {
    async fn get_record(&self, id: Uuid) -> Result<VideoRecord, RepositoryError> {
        self.records.get_record(id).await
    }

    async fn update_record(&self, record: &VideoRecord) -> Result<(), RepositoryError> {
        self.records.update_record(record).await?;
        self.persist().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::open(dir.path().join("records.json"))
            .await
            .unwrap();
        assert!(repo.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_update_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");

        let repo = JsonFileRepository::open(&path).await.unwrap();
        let mut record = VideoRecord::new(Uuid::new_v4(), "Boots", "A video about boots");
        repo.create_record(record.clone()).await.unwrap();

        record.video_reference = Some("landscape/0123.mp4".to_string());
        repo.update_record(&record).await.unwrap();

        let reopened = JsonFileRepository::open(&path).await.unwrap();
        let stored = reopened.get_record(record.id).await.unwrap();
        assert_eq!(stored.video_reference.as_deref(), Some("landscape/0123.mp4"));
        assert_eq!(stored.title, "Boots");
    }

    #[tokio::test]
    async fn test_update_unknown_record() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::open(dir.path().join("records.json"))
            .await
            .unwrap();
        let record = VideoRecord::new(Uuid::new_v4(), "ghost", "");
        assert!(matches!(
            repo.update_record(&record).await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(!repo.path().exists());
    }

    #[tokio::test]
    async fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        assert!(matches!(
            JsonFileRepository::open(&path).await,
            Err(RepositoryError::Backend(_))
        ));
    }
}
