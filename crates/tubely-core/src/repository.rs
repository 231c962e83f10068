//! Metadata-record seam.
//!
//! Record persistence (and the ownership checks that go with it) belongs to
//! the host application. The ingestion pipeline talks to it only through
//! [`VideoRepository`]: read a record to confirm it exists, write it back
//! with a new `video_reference`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::models::VideoRecord;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Video not found: {0}")]
    NotFound(Uuid),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Repository backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Fetch a record by id. Missing records are `RepositoryError::NotFound`.
    async fn get_record(&self, id: Uuid) -> Result<VideoRecord, RepositoryError>;

    /// Persist a modified record. The record must already exist.
    async fn update_record(&self, record: &VideoRecord) -> Result<(), RepositoryError>;
}

/// Process-local repository. Used by tests and by the CLI's file-backed store.
#[derive(Default)]
pub struct InMemoryVideoRepository {
    records: RwLock<HashMap<Uuid, VideoRecord>>,
}

impl InMemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = VideoRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.id, r)).collect();
        Self {
            records: RwLock::new(map),
        }
    }

    pub fn insert(&self, record: VideoRecord) -> Result<(), RepositoryError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| RepositoryError::Backend("record lock poisoned".to_string()))?;
        records.insert(record.id, record);
        Ok(())
    }

    /// All records, ordered by creation time.
    pub fn snapshot(&self) -> Result<Vec<VideoRecord>, RepositoryError> {
        let records = self
            .records
            .read()
            .map_err(|_| RepositoryError::Backend("record lock poisoned".to_string()))?;
        let mut all: Vec<VideoRecord> = records.values().cloned().collect();
        all.sort_by_key(|r| r.created_at);
        Ok(all)
    }
}

#[async_trait]
impl VideoRepository for InMemoryVideoRepository {
    async fn get_record(&self, id: Uuid) -> Result<VideoRecord, RepositoryError> {
        let records = self
            .records
            .read()
            .map_err(|_| RepositoryError::Backend("record lock poisoned".to_string()))?;
        records.get(&id).cloned().ok_or(RepositoryError::NotFound(id))
    }

    async fn update_record(&self, record: &VideoRecord) -> Result<(), RepositoryError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| RepositoryError::Backend("record lock poisoned".to_string()))?;
        let stored = records
            .get_mut(&record.id)
            .ok_or(RepositoryError::NotFound(record.id))?;
        *stored = record.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }
}
