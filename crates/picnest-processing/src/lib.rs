//! Picnest Processing Library
//!
//! Content hashing (exact + perceptual), quality scoring, metadata probing,
//! and derivative (thumbnail/poster) rendering. All operations here are pure
//! with respect to the record store; file paths only enter the picture for
//! external-process probing and frame extraction.

pub mod hash;
pub mod image;
pub mod quality;
pub mod video;

pub use hash::{perceptual_hash, sha256_hex};
pub use quality::quality_score;
