//! Process-private local files backing one ingestion run.
//!
//! Both file kinds hold a [`TempPath`], so the file is deleted when the
//! handle is released or dropped, including when the owning future is
//! cancelled mid-run.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

const STAGING_PREFIX: &str = "tubely-upload-";

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("Staging I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },
}

/// Hands out uniquely named files inside one directory.
#[derive(Debug, Clone)]
pub struct StagingStore {
    dir: PathBuf,
}

impl StagingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create an empty staging file with a unique name and the given extension.
    pub async fn acquire(&self, extension: &str) -> Result<StagingFile, StagingError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let suffix = format!(".{}", extension);
        let named = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&self.dir)?;
        let (file, path) = named.into_parts();

        tracing::debug!(path = %path.display(), "Staging file acquired");

        Ok(StagingFile {
            file: File::from_std(file),
            path,
        })
    }
}

/// The uploaded stream, copied to disk.
#[derive(Debug)]
pub struct StagingFile {
    file: File,
    path: TempPath,
}

impl StagingFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy `reader` into the file, reading at most `limit + 1` bytes.
    ///
    /// Returns the byte count, or [`StagingError::TooLarge`] once the stream
    /// proves longer than `limit`. Bytes already written stay on disk until
    /// the file is released.
    pub async fn materialize<R>(&mut self, reader: &mut R, limit: u64) -> Result<u64, StagingError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut bounded = reader.take(limit.saturating_add(1));
        let written = tokio::io::copy(&mut bounded, &mut self.file).await?;
        self.file.flush().await?;

        if written > limit {
            return Err(StagingError::TooLarge { limit });
        }

        Ok(written)
    }

    /// Reset the read position to the start of the file.
    pub async fn rewind(&mut self) -> Result<(), StagingError> {
        self.file.seek(SeekFrom::Start(0)).await?;
        Ok(())
    }

    /// Close the handle and delete the file.
    pub fn release(self) -> std::io::Result<()> {
        let StagingFile { file, path } = self;
        drop(file);
        path.close()
    }
}

/// Output of the container rewriter. Deleted on release or drop.
#[derive(Debug)]
pub struct RewrittenFile {
    path: TempPath,
}

impl RewrittenFile {
    /// Take ownership of a file at `path`, which is removed when the returned
    /// handle goes away. The file does not need to exist yet.
    pub fn adopt(path: impl AsRef<Path>) -> Self {
        Self {
            path: TempPath::from_path(path.as_ref()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(self) -> std::io::Result<()> {
        self.path.close()
    }
}
