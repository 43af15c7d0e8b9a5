//! Image dimension probing.

use image::ImageReader;
use std::io::Cursor;

/// Read the dimensions of an encoded image from its header.
///
/// Any failure yields `None`; a bad image must not fail the upload that
/// carried it.
pub fn probe_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
