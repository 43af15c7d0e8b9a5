//! Configuration module
//!
//! Environment-driven configuration for the ingestion engine. Every knob has
//! a sensible default so the engine can run with nothing but a data
//! directory.

use std::env;
use std::path::PathBuf;

use crate::constants::{DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PROBE_TIMEOUT_SECS};

const DEFAULT_DERIVATIVE_WORKERS: usize = 4;
const DEFAULT_DERIVATIVE_QUEUE_DEPTH: usize = 256;

/// Engine configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Root directory for event-scoped media storage.
    pub data_dir: PathBuf,
    /// sqlx connection URL for the media record store.
    pub database_url: String,
    /// Upload-size ceiling enforced before any side effect.
    pub max_upload_bytes: usize,
    /// Path to the ffmpeg binary used for poster frame extraction.
    pub ffmpeg_path: String,
    /// Path to the ffprobe binary used for video metadata probing.
    pub ffprobe_path: String,
    /// Timeout for external prober/extractor invocations.
    pub probe_timeout_secs: u64,
    /// Worker count for background derivative generation.
    pub derivative_workers: usize,
    /// Submission queue depth for background derivative generation.
    pub derivative_queue_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            database_url: "sqlite://data/picnest.db".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            derivative_workers: DEFAULT_DERIVATIVE_WORKERS,
            derivative_queue_depth: DEFAULT_DERIVATIVE_QUEUE_DEPTH,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment, falling back to defaults.
    /// Reads `.env` if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Self {
            data_dir: env::var("PICNEST_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            max_upload_bytes: env_parse("PICNEST_MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            ffmpeg_path: env::var("PICNEST_FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path),
            ffprobe_path: env::var("PICNEST_FFPROBE_PATH").unwrap_or(defaults.ffprobe_path),
            probe_timeout_secs: env_parse("PICNEST_PROBE_TIMEOUT_SECS", defaults.probe_timeout_secs),
            derivative_workers: env_parse(
                "PICNEST_DERIVATIVE_WORKERS",
                defaults.derivative_workers,
            ),
            derivative_queue_depth: env_parse(
                "PICNEST_DERIVATIVE_QUEUE_DEPTH",
                defaults.derivative_queue_depth,
            ),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, raw, "Invalid value in environment, using default");
                default
            }
        },
        Err(_) => default,
    }
}
