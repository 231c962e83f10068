//! Terminal error of an ingestion run.

use tubely_core::{ErrorMetadata, LogLevel, RepositoryError};
use tubely_storage::StorageError;
use uuid::Uuid;

use crate::probe::ProbeError;
use crate::rewrite::RewriteError;
use crate::staging::StagingError;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Payload too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Staging I/O failure: {0}")]
    Io(#[source] std::io::Error),

    #[error("Probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("Rewrite failed: {0}")]
    Rewrite(#[from] RewriteError),

    #[error("Publish failed: {0}")]
    Publish(#[source] StorageError),

    #[error("Signing failed: {0}")]
    Signing(#[source] StorageError),

    #[error("Video not found: {0}")]
    NotFound(Uuid),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Metadata repository error: {0}")]
    Repository(String),
}

impl From<StagingError> for IngestError {
    fn from(err: StagingError) -> Self {
        match err {
            StagingError::TooLarge { limit } => IngestError::PayloadTooLarge { limit },
            StagingError::Io(e) => IngestError::Io(e),
        }
    }
}

impl From<RepositoryError> for IngestError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => IngestError::NotFound(id),
            RepositoryError::Unauthorized(msg) => IngestError::Unauthorized(msg),
            RepositoryError::Backend(msg) => IngestError::Repository(msg),
        }
    }
}

/// (status, code, recoverable, suggested action, sensitive, log level)
fn ingest_error_static_metadata(
    err: &IngestError,
) -> (u16, &'static str, bool, Option<&'static str>, bool, LogLevel) {
    match err {
        IngestError::UnsupportedMediaType(_) => (
            415,
            "UNSUPPORTED_MEDIA_TYPE",
            false,
            Some("Upload an MP4 video"),
            false,
            LogLevel::Debug,
        ),
        IngestError::PayloadTooLarge { .. } => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Upload a smaller video"),
            false,
            LogLevel::Debug,
        ),
        IngestError::Io(_) => (
            500,
            "STAGING_IO_ERROR",
            true,
            Some("Retry the upload"),
            true,
            LogLevel::Error,
        ),
        IngestError::Probe(e) if e.is_environmental() => (
            500,
            "PROBE_UNAVAILABLE",
            true,
            Some("Retry the upload after a short delay"),
            true,
            LogLevel::Error,
        ),
        IngestError::Probe(_) => (
            422,
            "PROBE_FAILED",
            false,
            Some("Check that the file is a valid video"),
            true,
            LogLevel::Warn,
        ),
        IngestError::Rewrite(_) => (
            500,
            "REWRITE_FAILED",
            false,
            None,
            true,
            LogLevel::Error,
        ),
        IngestError::Publish(_) => (
            502,
            "PUBLISH_FAILED",
            true,
            Some("Retry the upload after a short delay"),
            true,
            LogLevel::Error,
        ),
        IngestError::Signing(_) => (
            500,
            "SIGNING_FAILED",
            false,
            None,
            true,
            LogLevel::Error,
        ),
        IngestError::NotFound(_) => (404, "NOT_FOUND", false, None, false, LogLevel::Debug),
        IngestError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            None,
            false,
            LogLevel::Debug,
        ),
        IngestError::Repository(_) => (
            500,
            "REPOSITORY_ERROR",
            true,
            None,
            true,
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for IngestError {
    fn http_status_code(&self) -> u16 {
        ingest_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        ingest_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        ingest_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        ingest_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        ingest_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        ingest_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            IngestError::UnsupportedMediaType(ref media_type) => {
                format!("Unsupported media type: {}", media_type)
            }
            IngestError::PayloadTooLarge { limit } => {
                format!("Video exceeds the maximum size of {} bytes", limit)
            }
            IngestError::Io(_) => "Failed to stage upload".to_string(),
            IngestError::Probe(e) if e.is_environmental() => {
                "Video inspection is temporarily unavailable".to_string()
            }
            IngestError::Probe(_) => "The uploaded file could not be read as a video".to_string(),
            IngestError::Rewrite(_) => "Failed to process video".to_string(),
            IngestError::Publish(_) => "Failed to store video".to_string(),
            IngestError::Signing(_) => "Failed to generate video URL".to_string(),
            IngestError::NotFound(id) => format!("Video {} not found", id),
            IngestError::Unauthorized(ref msg) => msg.clone(),
            IngestError::Repository(_) => "Failed to update video".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_error_conversion() {
        let err = IngestError::from(StagingError::TooLarge { limit: 1024 });
        assert!(matches!(err, IngestError::PayloadTooLarge { limit: 1024 }));
        assert_eq!(err.http_status_code(), 413);
        assert!(!err.is_sensitive());

        let err = IngestError::from(StagingError::Io(std::io::Error::other("disk full")));
        assert_eq!(err.error_code(), "STAGING_IO_ERROR");
        assert_eq!(err.client_message(), "Failed to stage upload");
    }

    #[test]
    fn test_repository_error_conversion() {
        let id = Uuid::new_v4();
        let err = IngestError::from(RepositoryError::NotFound(id));
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.client_message(), format!("Video {} not found", id));

        let err = IngestError::from(RepositoryError::Unauthorized("not the owner".into()));
        assert_eq!(err.http_status_code(), 401);
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_sensitive_errors_hide_details() {
        let err = IngestError::Probe(ProbeError::Failed {
            status: "exit status: 1".to_string(),
            stderr: "/var/tmp/tubely-upload-x.mp4: Invalid data".to_string(),
        });
        assert_eq!(err.http_status_code(), 422);
        assert!(err.is_sensitive());
        assert!(!err.client_message().contains("/var/tmp"));

        let err = IngestError::Publish(StorageError::UploadFailed("connection reset".into()));
        assert_eq!(err.http_status_code(), 502);
        assert!(err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_missing_prober_is_server_error() {
        let spawn = std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory");
        let err = IngestError::from(ProbeError::Spawn(spawn));
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "PROBE_UNAVAILABLE");
        assert!(err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Error);
        assert_ne!(
            err.client_message(),
            "The uploaded file could not be read as a video"
        );

        let err = IngestError::from(ProbeError::InvalidExecutable("ffprobe;".to_string()));
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.log_level(), LogLevel::Error);

        let err = IngestError::from(ProbeError::NoVideoStream);
        assert_eq!(err.http_status_code(), 422);
        assert_eq!(err.error_code(), "PROBE_FAILED");
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_unsupported_media_type() {
        let err = IngestError::UnsupportedMediaType("image/png".to_string());
        assert_eq!(err.http_status_code(), 415);
        assert_eq!(err.error_code(), "UNSUPPORTED_MEDIA_TYPE");
        assert_eq!(err.client_message(), "Unsupported media type: image/png");
    }
}
