//! Poster frame extraction via ffmpeg.

use anyhow::{anyhow, Context, Result};
use image::ImageReader;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use picnest_core::constants::PREVIEW_MAX_DIM;

use crate::image::encode_preview;

/// Extracts a single scaled frame from a video and encodes it as a webp
/// preview. The intermediate frame file lives in a temporary directory that
/// is removed whether or not extraction succeeds.
pub struct PosterExtractor {
    ffmpeg_path: String,
    timeout: Duration,
}

impl PosterExtractor {
    pub fn new(ffmpeg_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            timeout,
        }
    }

    /// Extract the frame at `timestamp_seconds` (ffmpeg falls back to the
    /// nearest available frame for shorter videos), scaled into the preview
    /// bounding box, and return it encoded as webp.
    #[tracing::instrument(skip(self), fields(process.command = "ffmpeg"))]
    pub async fn extract_frame(&self, video_path: &Path, timestamp_seconds: f64) -> Result<Vec<u8>> {
        let temp_dir = tempfile::tempdir().context("Failed to create temp directory")?;
        let frame_path = temp_dir.path().join("frame.jpg");

        let scale = format!(
            "scale={dim}:{dim}:force_original_aspect_ratio=decrease",
            dim = PREVIEW_MAX_DIM
        );

        let mut command = Command::new(&self.ffmpeg_path);
        command
            .arg("-i")
            .arg(video_path)
            .args(["-ss", &timestamp_seconds.to_string()])
            .args(["-vframes", "1"])
            .args(["-vf", &scale])
            .args(["-f", "image2", "-y"])
            .arg(&frame_path)
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| anyhow!("ffmpeg timed out after {:?}", self.timeout))?
            .context("Failed to execute ffmpeg")?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffmpeg frame extraction failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let frame = std::fs::read(&frame_path).context("ffmpeg produced no output frame")?;
        let img = ImageReader::new(std::io::Cursor::new(frame))
            .with_guessed_format()
            .context("Failed to sniff extracted frame")?
            .decode()
            .context("Failed to decode extracted frame")?;

        encode_preview(&img)
    }
}
