//! Tubely CLI: run the video ingestion pipeline against local files.
//!
//! Configuration is loaded once from the environment (`.env` is read
//! first) and covers logging, storage and tool paths. Video records live in a JSON file passed with `--records`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use tubely_cli::{format_size, init_tracing, print_json, JsonFileRepository};
use tubely_core::{AspectClass, IngestConfig, VideoRecord};
use tubely_processing::{
    FfprobeProber, IngestionOrchestrator, MediaProber, UploadRequest, VideoMetadata,
};
use tubely_storage::{create_storage, Publisher};

#[derive(Parser)]
#[command(name = "tubely", about = "Tubely video ingestion CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a video record in the records file
    Create {
        /// Video title
        title: String,
        /// Video description
        #[arg(long, default_value = "")]
        description: String,
        /// Owner UUID (random when omitted)
        #[arg(long)]
        owner: Option<Uuid>,
        /// Path to the JSON records file
        #[arg(long, default_value = "records.json")]
        records: PathBuf,
    },
    /// Ingest a local video file for an existing record
    Ingest {
        /// Path to the video file
        file: PathBuf,
        /// Target video record UUID
        #[arg(long)]
        video_id: Uuid,
        /// Declared content type of the upload
        #[arg(long, default_value = "video/mp4")]
        content_type: String,
        /// Path to the JSON records file
        #[arg(long, default_value = "records.json")]
        records: PathBuf,
        /// Also print a signed URL for the published video
        #[arg(long)]
        sign: bool,
    },
    /// Print stream geometry and aspect class of a local video
    Probe {
        /// Path to the video file
        file: PathBuf,
    },
    /// Mint a signed URL for a storage key
    Sign {
        /// Storage key, e.g. landscape/<id>.mp4
        key: String,
        /// Lifetime in seconds (defaults to SIGNED_URL_TTL_SECS)
        #[arg(long)]
        ttl_secs: Option<u64>,
    },
}

#[derive(Serialize)]
struct IngestSummary {
    video_id: Uuid,
    key: String,
    aspect: AspectClass,
    size_bytes: u64,
    size: String,
    metadata: Option<VideoMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signed_url: Option<String>,
}

#[derive(Serialize)]
struct ProbeSummary {
    file: PathBuf,
    aspect: AspectClass,
    #[serde(flatten)]
    metadata: VideoMetadata,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = IngestConfig::from_env().context("Failed to load configuration")?;
    init_tracing(&config.environment)?;

    match cli.command {
        Commands::Create {
            title,
            description,
            owner,
            records,
        } => {
            let repo = JsonFileRepository::open(&records).await?;
            let record = VideoRecord::new(owner.unwrap_or_else(Uuid::new_v4), title, description);
            repo.create_record(record.clone())
                .await
                .with_context(|| format!("Failed to write {}", records.display()))?;
            print_json(&record)?;
        }
        Commands::Ingest {
            file,
            video_id,
            content_type,
            records,
            sign,
        } => {
            let summary = ingest(config, &file, video_id, content_type, &records, sign).await?;
            print_json(&summary)?;
        }
        Commands::Probe { file } => {
            let prober = FfprobeProber::new(config.ffprobe_path)?;
            let metadata = prober
                .probe(&file)
                .await
                .with_context(|| format!("Failed to probe {}", file.display()))?;
            print_json(&ProbeSummary {
                file,
                aspect: metadata.aspect_class(),
                metadata,
            })?;
        }
        Commands::Sign { key, ttl_secs } => {
            let ttl = ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(config.signed_url_ttl);
            let storage = create_storage(&config.storage)
                .await
                .context("Failed to initialize storage")?;
            let url = Publisher::new(storage)
                .sign(&key, ttl)
                .await
                .with_context(|| format!("Failed to sign {}", key))?;
            println!("{}", url);
        }
    }

    Ok(())
}

async fn ingest(
    config: IngestConfig,
    file: &Path,
    video_id: Uuid,
    content_type: String,
    records: &Path,
    sign: bool,
) -> anyhow::Result<IngestSummary> {
    let storage = create_storage(&config.storage)
        .await
        .context("Failed to initialize storage")?;
    let repo = Arc::new(JsonFileRepository::open(records).await?);
    let orchestrator = IngestionOrchestrator::with_ffmpeg(config, storage, repo)?;

    let body = tokio::fs::File::open(file)
        .await
        .with_context(|| format!("Failed to open {}", file.display()))?;
    let length = body.metadata().await?.len();

    let request = UploadRequest::new(video_id, content_type, body).with_content_length(length);
    let outcome = orchestrator
        .ingest(request)
        .await
        .with_context(|| format!("Failed to ingest {}", file.display()))?;

    let signed_url = if sign {
        Some(orchestrator.sign(&outcome.key).await?)
    } else {
        None
    };

    Ok(IngestSummary {
        video_id,
        key: outcome.key,
        aspect: outcome.aspect,
        size_bytes: outcome.size_bytes,
        size: format_size(outcome.size_bytes),
        metadata: outcome.metadata,
        signed_url,
    })
}
