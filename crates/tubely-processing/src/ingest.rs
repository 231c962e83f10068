//! Ingestion orchestration: stage → probe → rewrite → publish → record.
//!
//! One [`IngestionOrchestrator::ingest`] call drives a single upload from the
//! raw request body to a published storage key written back on the video
//! record. Every step is awaited in order; the first failure ends the run.
//! Local files are owned by drop guards, so they are removed on every exit,
//! including when the caller drops the future.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::io::AsyncRead;
use uuid::Uuid;

use tubely_core::{AspectClass, ErrorMetadata, IngestConfig, LogLevel, ProbeFailurePolicy};
use tubely_core::{VideoRecord, VideoRepository};
use tubely_storage::{build_storage_key, generate_key_id, Publisher, Storage};

use crate::error::IngestError;
use crate::metadata::VideoMetadata;
use crate::probe::{FfprobeProber, MediaProber};
use crate::rewrite::{ContainerRewriter, FfmpegRewriter};
use crate::staging::StagingStore;

/// An upload waiting to be ingested.
pub struct UploadRequest {
    pub video_id: Uuid,
    /// Declared `Content-Type`, parameters allowed.
    pub content_type: String,
    /// Declared length, if the transport knows it.
    pub content_length: Option<u64>,
    pub body: Box<dyn AsyncRead + Send + Unpin>,
}

impl UploadRequest {
    pub fn new(
        video_id: Uuid,
        content_type: impl Into<String>,
        body: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        Self {
            video_id,
            content_type: content_type.into(),
            content_length: None,
            body: Box::new(body),
        }
    }

    pub fn with_content_length(mut self, content_length: u64) -> Self {
        self.content_length = Some(content_length);
        self
    }
}

/// Progress of one run. `Failed` is terminal and reachable from any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Received,
    Staged,
    Probed,
    Rewritten,
    Published,
    Complete,
    Failed,
}

impl Display for IngestStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            IngestStage::Received => "received",
            IngestStage::Staged => "staged",
            IngestStage::Probed => "probed",
            IngestStage::Rewritten => "rewritten",
            IngestStage::Published => "published",
            IngestStage::Complete => "complete",
            IngestStage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// The record as written back, `video_reference` set to `key`.
    pub record: VideoRecord,
    pub key: String,
    pub aspect: AspectClass,
    /// `None` when probing failed under the degrade policy.
    pub metadata: Option<VideoMetadata>,
    pub size_bytes: u64,
}

#[derive(Clone)]
pub struct IngestionOrchestrator {
    config: Arc<IngestConfig>,
    staging: StagingStore,
    prober: Arc<dyn MediaProber>,
    rewriter: Arc<dyn ContainerRewriter>,
    publisher: Publisher,
    records: Arc<dyn VideoRepository>,
}

impl IngestionOrchestrator {
    pub fn new(
        config: IngestConfig,
        prober: Arc<dyn MediaProber>,
        rewriter: Arc<dyn ContainerRewriter>,
        publisher: Publisher,
        records: Arc<dyn VideoRepository>,
    ) -> Self {
        let staging = StagingStore::new(config.staging_dir.clone());
        Self {
            config: Arc::new(config),
            staging,
            prober,
            rewriter,
            publisher,
            records,
        }
    }

    /// Wire the orchestrator to the ffprobe/ffmpeg binaries named in `config`.
    pub fn with_ffmpeg(
        config: IngestConfig,
        storage: Arc<dyn Storage>,
        records: Arc<dyn VideoRepository>,
    ) -> Result<Self, IngestError> {
        let prober = FfprobeProber::new(config.ffprobe_path.clone())?;
        let rewriter = FfmpegRewriter::new(config.ffmpeg_path.clone())?;
        Ok(Self::new(
            config,
            Arc::new(prober),
            Arc::new(rewriter),
            Publisher::new(storage),
            records,
        ))
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn staging(&self) -> &StagingStore {
        &self.staging
    }

    /// Run the full pipeline for one upload.
    #[tracing::instrument(skip(self, request), fields(
        video_id = %request.video_id,
        content_type = %request.content_type
    ))]
    pub async fn ingest(&self, request: UploadRequest) -> Result<IngestOutcome, IngestError> {
        let start = Instant::now();
        let video_id = request.video_id;
        let mut reached = IngestStage::Received;

        match self.run(request, &mut reached).await {
            Ok(outcome) => {
                tracing::info!(
                    video_id = %video_id,
                    key = %outcome.key,
                    aspect = %outcome.aspect,
                    size_bytes = outcome.size_bytes,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Video ingested"
                );
                Ok(outcome)
            }
            Err(err) => {
                let stage = IngestStage::Failed;
                let last_stage = reached;
                let code = err.error_code();
                let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
                match err.log_level() {
                    LogLevel::Debug => tracing::debug!(
                        video_id = %video_id, stage = %stage, last_stage = %last_stage,
                        error_code = code, error = %err, duration_ms, "Video ingestion rejected"
                    ),
                    LogLevel::Warn => tracing::warn!(
                        video_id = %video_id, stage = %stage, last_stage = %last_stage,
                        error_code = code, error = %err, duration_ms, "Video ingestion failed"
                    ),
                    LogLevel::Error => tracing::error!(
                        video_id = %video_id, stage = %stage, last_stage = %last_stage,
                        error_code = code, error = %tubely_core::error_chain(&err), duration_ms,
                        "Video ingestion failed"
                    ),
                }
                Err(err)
            }
        }
    }

    /// `reached` is advanced as stages complete, so the caller can report
    /// where a failed run stopped.
    async fn run(
        &self,
        request: UploadRequest,
        reached: &mut IngestStage,
    ) -> Result<IngestOutcome, IngestError> {
        let UploadRequest {
            video_id,
            content_type,
            content_length,
            mut body,
        } = request;

        let container = self
            .config
            .accepted_container(&content_type)
            .ok_or_else(|| IngestError::UnsupportedMediaType(content_type.clone()))?;

        let limit = self.config.max_video_size_bytes;
        if content_length.is_some_and(|len| len > limit) {
            return Err(IngestError::PayloadTooLarge { limit });
        }

        let mut record = self.records.get_record(video_id).await?;
        transition(video_id, IngestStage::Received, reached);

        let mut staged = self.staging.acquire(container.extension()).await?;
        let size_bytes = staged.materialize(&mut body, limit).await?;
        staged.rewind().await?;
        tracing::debug!(video_id = %video_id, size_bytes, "Upload staged");
        transition(video_id, IngestStage::Staged, reached);

        let (aspect, metadata) = self.classify(staged.path()).await?;
        transition(video_id, IngestStage::Probed, reached);

        let rewritten = self.rewriter.rewrite(staged.path(), container).await?;
        transition(video_id, IngestStage::Rewritten, reached);

        let key_id = generate_key_id(self.config.key_strategy, video_id);
        let key = build_storage_key(aspect, &key_id, container.extension());
        let key = self
            .publisher
            .publish(rewritten.path(), &key, container.media_type())
            .await
            .map_err(IngestError::Publish)?;
        transition(video_id, IngestStage::Published, reached);

        // The object is already live; a leftover local file is not worth
        // failing the upload over.
        if let Err(e) = rewritten.release() {
            tracing::warn!(video_id = %video_id, error = %e, "Failed to remove rewritten file");
        }
        if let Err(e) = staged.release() {
            tracing::warn!(video_id = %video_id, error = %e, "Failed to remove staging file");
        }

        record.video_reference = Some(key.clone());
        self.records.update_record(&record).await?;
        transition(video_id, IngestStage::Complete, reached);

        Ok(IngestOutcome {
            record,
            key,
            aspect,
            metadata,
            size_bytes,
        })
    }

    async fn classify(
        &self,
        path: &Path,
    ) -> Result<(AspectClass, Option<VideoMetadata>), IngestError> {
        match self.prober.probe(path).await {
            Ok(metadata) => Ok((metadata.aspect_class(), Some(metadata))),
            // A prober that cannot run says nothing about the upload.
            Err(err) if err.is_environmental() => Err(err.into()),
            Err(err) => match self.config.probe_failure_policy {
                ProbeFailurePolicy::Abort => Err(err.into()),
                ProbeFailurePolicy::Degrade => {
                    tracing::warn!(error = %err, "Probe failed, classifying video as other");
                    Ok((AspectClass::Other, None))
                }
            },
        }
    }

    /// Mint a signed URL for a stored key using the configured TTL.
    pub async fn sign(&self, key: &str) -> Result<String, IngestError> {
        self.publisher
            .sign(key, self.config.signed_url_ttl)
            .await
            .map_err(IngestError::Signing)
    }

    /// Copy of `record` whose `video_reference` is a fresh signed URL.
    ///
    /// Records without a reference come back unchanged.
    pub async fn signed_record(&self, record: &VideoRecord) -> Result<VideoRecord, IngestError> {
        let Some(key) = record.video_reference.as_deref() else {
            return Ok(record.clone());
        };

        let url = self.sign(key).await?;
        let mut signed = record.clone();
        signed.video_reference = Some(url);
        Ok(signed)
    }
}

fn transition(video_id: Uuid, stage: IngestStage, reached: &mut IngestStage) {
    *reached = stage;
    tracing::debug!(video_id = %video_id, stage = %stage, "Ingestion stage reached");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(IngestStage::Received.to_string(), "received");
        assert_eq!(IngestStage::Complete.to_string(), "complete");
        assert_eq!(IngestStage::Failed.to_string(), "failed");
    }

    #[test]
    fn test_transition_records_stage() {
        let mut reached = IngestStage::Received;
        transition(Uuid::nil(), IngestStage::Staged, &mut reached);
        transition(Uuid::nil(), IngestStage::Probed, &mut reached);
        assert_eq!(reached, IngestStage::Probed);
    }

    #[test]
    fn test_upload_request_builder() {
        let request = UploadRequest::new(Uuid::nil(), "video/mp4", &b"abc"[..])
            .with_content_length(3);
        assert_eq!(request.content_length, Some(3));
        assert_eq!(request.content_type, "video/mp4");
    }
}
