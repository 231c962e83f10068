//! Container rewriter - faststart remux via ffmpeg

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tubely_core::VideoContainer;

use crate::probe::validate_executable;
use crate::staging::RewrittenFile;

const OUTPUT_SUFFIX: &str = ".processing";

#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("Invalid executable path: {0}")]
    InvalidExecutable(String),

    #[error("Failed to execute ffmpeg: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("ffmpeg exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("ffmpeg produced no output at {0}")]
    OutputMissing(PathBuf),
}

#[async_trait]
pub trait ContainerRewriter: Send + Sync {
    /// Remux `input` so the index precedes the media data. Streams are
    /// copied, never re-encoded.
    async fn rewrite(
        &self,
        input: &Path,
        container: VideoContainer,
    ) -> Result<RewrittenFile, RewriteError>;
}

/// `<input>.processing`, next to the input.
pub fn output_path_for(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(OUTPUT_SUFFIX);
    PathBuf::from(name)
}

pub struct FfmpegRewriter {
    ffmpeg_path: String,
}

impl FfmpegRewriter {
    pub fn new(ffmpeg_path: impl Into<String>) -> Result<Self, RewriteError> {
        let ffmpeg_path = ffmpeg_path.into();
        validate_executable(&ffmpeg_path).map_err(RewriteError::InvalidExecutable)?;
        Ok(Self { ffmpeg_path })
    }
}

#[async_trait]
impl ContainerRewriter for FfmpegRewriter {
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "faststart"
    ))]
    async fn rewrite(
        &self,
        input: &Path,
        container: VideoContainer,
    ) -> Result<RewrittenFile, RewriteError> {
        let start = std::time::Instant::now();

        // Owns the output from here on: an error return or a dropped future
        // removes whatever ffmpeg managed to write.
        let output_file = RewrittenFile::adopt(output_path_for(input));

        let output = Command::new(&self.ffmpeg_path)
            .args(["-v", "error", "-i"])
            .arg(input)
            .args(["-c", "copy", "-movflags", "faststart", "-f", container.muxer()])
            .arg(output_file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(RewriteError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!(status = %output.status, stderr = %stderr, "FFmpeg remux failed");
            return Err(RewriteError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }

        if !tokio::fs::try_exists(output_file.path()).await.unwrap_or(false) {
            return Err(RewriteError::OutputMissing(output_file.path().to_path_buf()));
        }

        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            output = %output_file.path().display(),
            "Container rewrite completed"
        );

        Ok(output_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_for() {
        assert_eq!(
            output_path_for(Path::new("/tmp/tubely-upload-abc.mp4")),
            PathBuf::from("/tmp/tubely-upload-abc.mp4.processing")
        );
    }

    #[test]
    fn test_rejects_dangerous_executable() {
        assert!(matches!(
            FfmpegRewriter::new("ffmpeg && curl evil"),
            Err(RewriteError::InvalidExecutable(_))
        ));
        assert!(matches!(
            FfmpegRewriter::new(""),
            Err(RewriteError::InvalidExecutable(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_leaves_no_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("in.mp4");
        tokio::fs::write(&input, b"not a video").await.unwrap();

        let rewriter = FfmpegRewriter::new("/nonexistent/tubely-ffmpeg").unwrap();
        let result = rewriter.rewrite(&input, VideoContainer::Mp4).await;

        assert!(matches!(result, Err(RewriteError::Spawn(_))));
        assert!(!output_path_for(&input).exists());
    }
}
