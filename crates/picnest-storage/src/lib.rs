//! Picnest Storage Library
//!
//! Event-scoped content store on the local filesystem.
//!
//! # Layout
//!
//! All paths live under an event root so that removing the root recursively
//! removes every file the event owns:
//!
//! - Originals: `events/{event_id}/original/{utc-date}/{uuid}.{ext}`
//! - Thumbnails: `events/{event_id}/derived/thumbs/{uuid}.webp`
//! - Posters: `events/{event_id}/derived/posters/{uuid}.webp`
//!
//! Relative paths must not contain `..` or a leading `/`. Key construction
//! is centralized in the `keys` module.

pub mod keys;
pub mod store;

pub use store::{ContentStore, StorageError, StorageResult};
