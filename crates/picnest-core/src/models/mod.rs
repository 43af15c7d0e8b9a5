//! Domain models shared across the engine.

pub mod fingerprint;
pub mod media;

pub use fingerprint::Fingerprint;
pub use media::{MediaInfo, MediaItem, MediaKind};
