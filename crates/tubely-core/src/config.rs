//! Configuration module
//!
//! Ingestion and storage settings. Values come from the environment (after
//! `.env` is loaded) in [`IngestConfig::from_env`], or from any key/value
//! source through [`IngestConfig::from_lookup`]. The resulting value is
//! passed explicitly to the storage factory and the orchestrator.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::models::{parse_media_type, VideoContainer};
use crate::storage_types::StorageBackend;

const MAX_VIDEO_SIZE_MB: u64 = 1024;
const SIGNED_URL_TTL_SECS: u64 = 600;
const MIN_SIGNING_SECRET_LEN: usize = 32;

/// How the random part of a storage key is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// 128 random bits, lowercase hex
    Random,
    /// The video record id, lowercase hex without dashes
    RecordId,
}

impl FromStr for KeyStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "random" => Ok(KeyStrategy::Random),
            "record" | "record_id" => Ok(KeyStrategy::RecordId),
            _ => Err(anyhow::anyhow!("Invalid storage key strategy: {}", s)),
        }
    }
}

impl Display for KeyStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            KeyStrategy::Random => write!(f, "random"),
            KeyStrategy::RecordId => write!(f, "record"),
        }
    }
}

/// What the orchestrator does when the media prober fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeFailurePolicy {
    /// Fail the run with a probe error
    Abort,
    /// Log a warning and classify the video as `other`
    Degrade,
}

impl FromStr for ProbeFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(ProbeFailurePolicy::Abort),
            "degrade" => Ok(ProbeFailurePolicy::Degrade),
            _ => Err(anyhow::anyhow!("Invalid probe failure policy: {}", s)),
        }
    }
}

impl Display for ProbeFailurePolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProbeFailurePolicy::Abort => write!(f, "abort"),
            ProbeFailurePolicy::Degrade => write!(f, "degrade"),
        }
    }
}

/// Remote storage configuration
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub local_signing_secret: Option<String>,
}

/// Ingestion pipeline configuration
#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub environment: String,
    pub max_video_size_bytes: u64,
    pub video_allowed_content_types: Vec<String>,
    pub ffprobe_path: String,
    pub ffmpeg_path: String,
    pub staging_dir: PathBuf,
    pub signed_url_ttl: Duration,
    pub key_strategy: KeyStrategy,
    pub probe_failure_policy: ProbeFailurePolicy,
    pub storage: StorageConfig,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let max_video_size_mb: u64 = match var("MAX_VIDEO_SIZE_MB") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("MAX_VIDEO_SIZE_MB must be a valid number"))?,
            None => MAX_VIDEO_SIZE_MB,
        };

        let video_allowed_content_types = var("VIDEO_ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|| "video/mp4".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let signed_url_ttl_secs: u64 = match var("SIGNED_URL_TTL_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("SIGNED_URL_TTL_SECS must be a valid number"))?,
            None => SIGNED_URL_TTL_SECS,
        };

        let key_strategy = var("STORAGE_KEY_STRATEGY")
            .map(|s| s.parse::<KeyStrategy>())
            .transpose()?
            .unwrap_or(KeyStrategy::Random);

        let probe_failure_policy = var("PROBE_FAILURE_POLICY")
            .map(|s| s.parse::<ProbeFailurePolicy>())
            .transpose()?
            .unwrap_or(ProbeFailurePolicy::Abort);

        let backend = var("STORAGE_BACKEND")
            .map(|s| s.parse::<StorageBackend>())
            .transpose()?
            .unwrap_or(StorageBackend::S3);

        let storage = StorageConfig {
            backend,
            s3_bucket: var("S3_BUCKET"),
            s3_region: var("S3_REGION").or_else(|| var("AWS_REGION")),
            s3_endpoint: var("S3_ENDPOINT"),
            local_storage_path: var("LOCAL_STORAGE_PATH"),
            local_storage_base_url: var("LOCAL_STORAGE_BASE_URL"),
            local_signing_secret: var("LOCAL_SIGNING_SECRET"),
        };

        let config = IngestConfig {
            environment,
            max_video_size_bytes: max_video_size_mb.saturating_mul(1024 * 1024),
            video_allowed_content_types,
            ffprobe_path: var("FFPROBE_PATH").unwrap_or_else(|| "ffprobe".to_string()),
            ffmpeg_path: var("FFMPEG_PATH").unwrap_or_else(|| "ffmpeg".to_string()),
            staging_dir: var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            signed_url_ttl: Duration::from_secs(signed_url_ttl_secs),
            key_strategy,
            probe_failure_policy,
            storage,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Resolve a declared Content-Type to an accepted container, if allowed.
    pub fn accepted_container(&self, content_type: &str) -> Option<VideoContainer> {
        let media_type = parse_media_type(content_type)?;
        if !self
            .video_allowed_content_types
            .iter()
            .any(|allowed| allowed == &media_type)
        {
            return None;
        }
        VideoContainer::from_media_type(&media_type)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_video_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_VIDEO_SIZE_MB must be greater than 0"));
        }

        if self.signed_url_ttl.is_zero() {
            return Err(anyhow::anyhow!("SIGNED_URL_TTL_SECS must be greater than 0"));
        }

        if self.video_allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "VIDEO_ALLOWED_CONTENT_TYPES must list at least one content type"
            ));
        }

        for content_type in &self.video_allowed_content_types {
            if VideoContainer::from_media_type(content_type).is_none() {
                return Err(anyhow::anyhow!(
                    "Unsupported video content type in VIDEO_ALLOWED_CONTENT_TYPES: {}",
                    content_type
                ));
            }
        }

        match self.storage.backend {
            StorageBackend::S3 => {
                if self.storage.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.storage.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.storage.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.storage.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
                let secret_len = self
                    .storage
                    .local_signing_secret
                    .as_ref()
                    .map(|s| s.len())
                    .unwrap_or(0);
                if secret_len < MIN_SIGNING_SECRET_LEN {
                    return Err(anyhow::anyhow!(
                        "LOCAL_SIGNING_SECRET must be at least {} characters long",
                        MIN_SIGNING_SECRET_LEN
                    ));
                }
            }
        }

        Ok(())
    }
}
