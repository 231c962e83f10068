//! Tubely Core Library
//!
//! Domain models, error metadata, configuration and the metadata-record seam
//! shared by the storage, processing and CLI crates.

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod storage_types;

// Re-export commonly used types
pub use config::{IngestConfig, KeyStrategy, ProbeFailurePolicy, StorageConfig};
pub use error::{error_chain, ErrorMetadata, LogLevel};
pub use models::{parse_media_type, AspectClass, VideoContainer, VideoRecord};
pub use repository::{InMemoryVideoRepository, RepositoryError, VideoRepository};
pub use storage_types::StorageBackend;
