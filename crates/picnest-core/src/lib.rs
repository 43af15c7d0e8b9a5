//! Picnest Core Library
//!
//! This crate provides the domain models, error types, configuration, and
//! constants shared across all picnest components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod telemetry;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::AppError;
pub use models::{Fingerprint, MediaInfo, MediaItem, MediaKind};
