//! Media item domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{IMAGE_MIMES, VIDEO_MIMES};
use crate::models::Fingerprint;

/// Closed classification of supported media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a declared mime type. Unsupported types return `None`.
    pub fn from_mime(mime: &str) -> Option<MediaKind> {
        if IMAGE_MIMES.contains(&mime) {
            Some(MediaKind::Image)
        } else if VIDEO_MIMES.contains(&mime) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<MediaKind> {
        match s {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probed metadata, tagged by kind. Probing is best-effort: any field may be
/// absent without the item being invalid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MediaInfo {
    Image {
        width: Option<u32>,
        height: Option<u32>,
    },
    Video {
        width: Option<u32>,
        height: Option<u32>,
        duration_seconds: Option<f64>,
    },
}

impl MediaInfo {
    pub fn kind(&self) -> MediaKind {
        match self {
            MediaInfo::Image { .. } => MediaKind::Image,
            MediaInfo::Video { .. } => MediaKind::Video,
        }
    }

    pub fn width(&self) -> Option<u32> {
        match self {
            MediaInfo::Image { width, .. } | MediaInfo::Video { width, .. } => *width,
        }
    }

    pub fn height(&self) -> Option<u32> {
        match self {
            MediaInfo::Image { height, .. } | MediaInfo::Video { height, .. } => *height,
        }
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        match self {
            MediaInfo::Image { .. } => None,
            MediaInfo::Video {
                duration_seconds, ..
            } => *duration_seconds,
        }
    }
}

/// A stored media item.
///
/// `id` is the stable record identity; `uuid` is the externally visible
/// content handle and is regenerated whenever the underlying original file is
/// replaced by a better perceptual duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: i64,
    pub event_id: i64,
    pub uuid: Uuid,
    pub original_name: String,
    pub mime: String,
    pub size_bytes: i64,
    pub info: MediaInfo,
    pub stored_relpath: String,
    pub sha256: String,
    pub phash: Option<Fingerprint>,
    pub uploader_name: String,
    pub created_at: DateTime<Utc>,
}

impl MediaItem {
    pub fn kind(&self) -> MediaKind {
        self.info.kind()
    }
}
