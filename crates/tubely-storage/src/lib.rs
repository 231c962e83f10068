//! Tubely Storage Library
//!
//! Remote publishing for ingested videos: the [`Storage`] trait, its S3 and
//! local filesystem backends, storage key construction and the
//! [`Publisher`] used by the ingestion pipeline.
//!
//! # Storage key format
//!
//! `{aspect_prefix}/{identifier}.{extension}` where the prefix is one of
//! `landscape`, `portrait` or `other` and the identifier is 32 lowercase hex
//! digits. Keys must not contain `..` segments or a leading `/`; every
//! backend rejects such keys with [`StorageError::InvalidKey`].

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod publisher;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{build_storage_key, generate_key_id, validate_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use publisher::Publisher;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
pub use tubely_core::StorageBackend;
