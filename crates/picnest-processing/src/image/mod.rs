//! Image probing and preview rendering.

pub mod probe;
pub mod thumbnail;

pub use probe::probe_dimensions;
pub use thumbnail::{encode_preview, render_thumbnail};
