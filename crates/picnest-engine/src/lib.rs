//! Picnest Engine Library
//!
//! Event media ingestion: exact and perceptual deduplication, quality-based
//! replacement, content-addressed storage, and background derivative
//! generation. `MediaIngest` is the engine's front door.

pub mod derivatives;
pub mod ingest;
pub mod locks;

pub use derivatives::{DerivativeJob, DerivativeQueue};
pub use ingest::{IngestOutcome, IngestRequest, MediaIngest};
pub use locks::EventLocks;
