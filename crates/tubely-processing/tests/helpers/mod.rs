//! Test helpers: fakes for the external tools and storage, plus an
//! orchestrator wired to a temp staging dir and a temp local storage root.
//!
//! Run from workspace root: `cargo test -p tubely-processing`.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

use tubely_core::{
    IngestConfig, InMemoryVideoRepository, StorageBackend, VideoContainer, VideoRecord,
};
use tubely_processing::rewrite::output_path_for;
use tubely_processing::{
    ContainerRewriter, IngestionOrchestrator, MediaProber, ProbeError, RewriteError,
    RewrittenFile, VideoMetadata,
};
use tubely_storage::{LocalStorage, Publisher, Storage, StorageError, StorageResult};

pub const SIGNING_SECRET: &str = "0123456789abcdef0123456789abcdef";
pub const BASE_URL: &str = "http://localhost:8091/assets";

/// Prober returning fixed dimensions, or failing. `unavailable` fails the
/// way a missing ffprobe binary does.
pub struct FakeProber {
    dimensions: Option<(u32, u32)>,
    unavailable: bool,
    pub calls: AtomicUsize,
}

impl FakeProber {
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            dimensions: Some((width, height)),
            unavailable: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            dimensions: None,
            unavailable: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            dimensions: None,
            unavailable: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaProber for FakeProber {
    async fn probe(&self, path: &Path) -> Result<VideoMetadata, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(path.exists(), "probe called on a missing file");

        if self.unavailable {
            return Err(ProbeError::Spawn(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No such file or directory",
            )));
        }

        match self.dimensions {
            Some((width, height)) => Ok(VideoMetadata {
                width,
                height,
                duration: Some(3.0),
                codec: "h264".to_string(),
                bitrate: None,
                framerate: Some(30.0),
            }),
            None => Err(ProbeError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "Invalid data found when processing input".to_string(),
            }),
        }
    }
}

/// Rewriter that copies the input to `<input>.processing`. In failing mode
/// it leaves a partial output behind before reporting failure.
pub struct FakeRewriter {
    fail: bool,
    pub calls: AtomicUsize,
}

impl FakeRewriter {
    pub fn copying() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContainerRewriter for FakeRewriter {
    async fn rewrite(
        &self,
        input: &Path,
        _container: VideoContainer,
    ) -> Result<RewrittenFile, RewriteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output = RewrittenFile::adopt(output_path_for(input));

        if self.fail {
            tokio::fs::write(output.path(), b"partial")
                .await
                .map_err(RewriteError::Spawn)?;
            return Err(RewriteError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "moov atom not found".to_string(),
            });
        }

        tokio::fs::copy(input, output.path())
            .await
            .map_err(RewriteError::Spawn)?;
        Ok(output)
    }
}

/// Storage whose uploads always fail.
pub struct FailingStorage;

#[async_trait]
impl Storage for FailingStorage {
    async fn upload_file(&self, _: &str, _: &Path, _: &str) -> StorageResult<u64> {
        Err(StorageError::UploadFailed("connection reset by peer".to_string()))
    }

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn get_presigned_url(&self, _: &str, _: Duration) -> StorageResult<String> {
        Err(StorageError::SigningFailed("no credentials".to_string()))
    }

    async fn exists(&self, _: &str) -> StorageResult<bool> {
        Ok(false)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

/// Temp dirs and collaborators for one test.
pub struct TestEnv {
    pub staging_dir: TempDir,
    pub assets_dir: TempDir,
    pub storage: Arc<LocalStorage>,
    pub records: Arc<InMemoryVideoRepository>,
    pub record: VideoRecord,
}

impl TestEnv {
    pub async fn new() -> Self {
        let staging_dir = tempfile::tempdir().expect("Failed to create staging directory");
        let assets_dir = tempfile::tempdir().expect("Failed to create assets directory");
        let storage = LocalStorage::new(
            assets_dir.path(),
            BASE_URL.to_string(),
            SIGNING_SECRET,
        )
        .await
        .expect("Failed to create local storage");

        let record = VideoRecord::new(Uuid::new_v4(), "Boots", "A video about boots");
        let records = InMemoryVideoRepository::from_records([record.clone()]);

        Self {
            staging_dir,
            assets_dir,
            storage: Arc::new(storage),
            records: Arc::new(records),
            record,
        }
    }

    pub fn config(&self, extra: &[(&str, &str)]) -> IngestConfig {
        let mut vars: HashMap<String, String> = [
            ("STORAGE_BACKEND", "local"),
            ("LOCAL_STORAGE_BASE_URL", BASE_URL),
            ("LOCAL_SIGNING_SECRET", SIGNING_SECRET),
            ("VIDEO_ALLOWED_CONTENT_TYPES", "video/mp4,video/quicktime"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        vars.insert(
            "LOCAL_STORAGE_PATH".to_string(),
            self.assets_dir.path().display().to_string(),
        );
        vars.insert(
            "STAGING_DIR".to_string(),
            self.staging_dir.path().display().to_string(),
        );
        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }

        IngestConfig::from_lookup(|key| vars.get(key).cloned()).expect("Invalid test config")
    }

    pub fn orchestrator(
        &self,
        config: IngestConfig,
        prober: Arc<dyn MediaProber>,
        rewriter: Arc<dyn ContainerRewriter>,
    ) -> IngestionOrchestrator {
        IngestionOrchestrator::new(
            config,
            prober,
            rewriter,
            Publisher::new(self.storage.clone()),
            self.records.clone(),
        )
    }

    pub fn orchestrator_with_storage(
        &self,
        config: IngestConfig,
        prober: Arc<dyn MediaProber>,
        rewriter: Arc<dyn ContainerRewriter>,
        storage: Arc<dyn Storage>,
    ) -> IngestionOrchestrator {
        IngestionOrchestrator::new(
            config,
            prober,
            rewriter,
            Publisher::new(storage),
            self.records.clone(),
        )
    }

    /// Number of entries left in the staging directory.
    pub fn staging_entries(&self) -> usize {
        count_files(self.staging_dir.path())
    }

    /// Relative paths of every published object.
    pub fn published_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        collect_keys(self.assets_dir.path(), self.assets_dir.path(), &mut keys);
        keys.sort();
        keys
    }
}

pub fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

fn collect_keys(root: &Path, dir: &Path, keys: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path: PathBuf = entry.path();
        if path.is_dir() {
            collect_keys(root, &path, keys);
        } else if let Ok(rel) = path.strip_prefix(root) {
            keys.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
}

/// In-memory log sink for a thread-local `fmt` subscriber.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Install a plain-text subscriber on the current thread until the
    /// guard is dropped. Pair with a current-thread runtime.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut inner) = self.0.lock() {
            inner.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// `n` bytes of filler with a recognisable prefix.
pub fn fake_video(n: usize) -> Vec<u8> {
    let mut data = b"\x00\x00\x00\x18ftypmp42".to_vec();
    data.resize(n.max(data.len()), 0xAB);
    data
}
