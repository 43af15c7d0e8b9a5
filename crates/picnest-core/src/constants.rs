//! Shared constants: supported mime catalogs and media tuning knobs.

/// Mime types classified as images.
pub const IMAGE_MIMES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/heic",
    "image/heif",
    "image/avif",
];

/// Mime types classified as videos.
pub const VIDEO_MIMES: &[&str] = &[
    "video/mp4",
    "video/quicktime",
    "video/webm",
    "video/x-msvideo",
    "video/x-matroska",
];

/// Maximum Hamming distance at which two perceptual fingerprints are
/// considered the same photo.
pub const PHASH_DISTANCE_THRESHOLD: u32 = 8;

/// Bounding box for generated previews (thumbnails and video posters).
/// Previews are never upscaled beyond the source.
pub const PREVIEW_MAX_DIM: u32 = 512;

/// Lossy quality for webp-encoded previews.
pub const PREVIEW_WEBP_QUALITY: f32 = 80.0;

/// Timestamp (seconds) of the frame extracted as a video poster.
pub const POSTER_TIMESTAMP_SECS: f64 = 1.0;

/// Default upload-size ceiling: 100 MB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Default timeout for external prober/extractor processes.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;

/// Fallback file extension when the original name has none.
pub const FALLBACK_EXTENSION: &str = "bin";
