//! Picnest DB Library
//!
//! Media record store access: the `MediaRepository` and schema bootstrap.
//! The engine does not own the wider application schema; it owns the single
//! `media` table it reads and writes.

pub mod db;
pub mod schema;

pub use db::media::{ImageCandidate, InsertOutcome, MediaRepository, NewMedia, ReplacementFields};
pub use schema::{connect, init_schema};
