//! Storage key generation and validation shared by all backends.

use tubely_core::{AspectClass, KeyStrategy};
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

/// Identifier part of a key: 128 random bits, or the record id, as lowercase hex.
pub fn generate_key_id(strategy: KeyStrategy, record_id: Uuid) -> String {
    match strategy {
        KeyStrategy::Random => hex::encode(rand::random::<[u8; 16]>()),
        KeyStrategy::RecordId => record_id.simple().to_string(),
    }
}

/// `{aspect_prefix}/{identifier}.{extension}`
pub fn build_storage_key(aspect: AspectClass, identifier: &str, extension: &str) -> String {
    format!("{}/{}.{}", aspect.key_prefix(), identifier, extension)
}

/// Reject references that cannot be a key produced by [`build_storage_key`].
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.trim().is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }

    if storage_key.starts_with('/') || storage_key.ends_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key has a leading or trailing slash: {}",
            storage_key
        )));
    }

    if storage_key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains an invalid path segment: {}",
            storage_key
        )));
    }

    if !storage_key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '-' | '_'))
    {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains unsupported characters: {}",
            storage_key
        )));
    }

    Ok(())
}
