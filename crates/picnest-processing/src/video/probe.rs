//! Video metadata probing via ffprobe.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

/// Probed video metadata. Every field is best-effort.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VideoProbe {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_seconds: Option<f64>,
}

/// Validate that a path doesn't contain shell metacharacters or traversal
/// sequences before handing it to an external process.
fn validate_path(path: &str) -> Result<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow!("Path contains dangerous characters: {}", path));
    }
    if path.contains("..") {
        return Err(anyhow!("Path contains directory traversal: {}", path));
    }
    Ok(())
}

/// Invokes ffprobe against on-disk video files.
pub struct VideoProber {
    ffprobe_path: String,
    timeout: Duration,
}

impl VideoProber {
    pub fn new(ffprobe_path: impl Into<String>, timeout: Duration) -> Result<Self> {
        let ffprobe_path = ffprobe_path.into();
        validate_path(&ffprobe_path).context("Invalid ffprobe path")?;
        Ok(Self {
            ffprobe_path,
            timeout,
        })
    }

    /// Probe dimensions and duration of a video file.
    ///
    /// Any failure (missing tool, nonzero exit, malformed output, timeout)
    /// degrades to an all-absent probe; it never fails the caller.
    #[tracing::instrument(skip(self), fields(process.command = "ffprobe"))]
    pub async fn probe(&self, video_path: &Path) -> VideoProbe {
        match self.run_ffprobe(video_path).await {
            Ok(probe) => probe,
            Err(e) => {
                tracing::warn!(
                    path = %video_path.display(),
                    error = %e,
                    "Video probe failed, continuing without metadata"
                );
                VideoProbe::default()
            }
        }
    }

    async fn run_ffprobe(&self, video_path: &Path) -> Result<VideoProbe> {
        validate_path(&video_path.to_string_lossy()).context("Invalid video path")?;

        let start = std::time::Instant::now();
        let mut command = Command::new(&self.ffprobe_path);
        command
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
                "-select_streams",
                "v:0",
            ])
            .arg(video_path);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| anyhow!("ffprobe timed out after {:?}", self.timeout))?
            .context("Failed to execute ffprobe")?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let probe_data: serde_json::Value =
            serde_json::from_slice(&output.stdout).context("Failed to parse ffprobe output")?;

        let stream = &probe_data["streams"][0];
        let width = stream["width"].as_u64().map(|w| w as u32);
        let height = stream["height"].as_u64().map(|h| h as u32);
        let duration_seconds = probe_data["format"]["duration"]
            .as_str()
            .and_then(|d| d.parse::<f64>().ok());

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            width,
            height,
            video_duration = duration_seconds,
            "Video probe completed"
        );

        Ok(VideoProbe {
            width,
            height,
            duration_seconds,
        })
    }
}
