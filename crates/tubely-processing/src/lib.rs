//! Tubely Processing Library
//!
//! The ingestion pipeline: stage the upload to a local file, probe its
//! geometry with `ffprobe`, remux it for progressive playback with `ffmpeg`,
//! then publish it under an aspect-prefixed storage key.
//!
//! External tools sit behind the [`MediaProber`] and [`ContainerRewriter`]
//! traits so the orchestrator can be exercised with fakes.

pub mod error;
pub mod ingest;
pub mod metadata;
pub mod probe;
pub mod rewrite;
pub mod staging;

pub use error::IngestError;
pub use ingest::{IngestOutcome, IngestStage, IngestionOrchestrator, UploadRequest};
pub use metadata::VideoMetadata;
pub use probe::{parse_probe_output, FfprobeProber, MediaProber, ProbeError};
pub use rewrite::{ContainerRewriter, FfmpegRewriter, RewriteError};
pub use staging::{RewrittenFile, StagingError, StagingFile, StagingStore};
