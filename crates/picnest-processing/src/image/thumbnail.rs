//! Bounded-box preview rendering.

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;

use picnest_core::constants::{PREVIEW_MAX_DIM, PREVIEW_WEBP_QUALITY};

/// Encode a decoded image as a lossy webp preview, downscaling to fit the
/// preview bounding box while preserving aspect ratio. Images already inside
/// the box are never upscaled.
pub fn encode_preview(img: &DynamicImage) -> Result<Vec<u8>> {
    let (width, height) = img.dimensions();

    let bounded = if width > PREVIEW_MAX_DIM || height > PREVIEW_MAX_DIM {
        img.resize(PREVIEW_MAX_DIM, PREVIEW_MAX_DIM, FilterType::Lanczos3)
    } else {
        img.clone()
    };

    let rgba = bounded.to_rgba8();
    let encoder = webp::Encoder::from_rgba(&rgba, rgba.width(), rgba.height());
    let encoded = encoder.encode(PREVIEW_WEBP_QUALITY);
    Ok(encoded.to_vec())
}

/// Render a thumbnail for an encoded image.
pub fn render_thumbnail(data: &[u8]) -> Result<Vec<u8>> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("Failed to sniff image format")?
        .decode()
        .map_err(|e| anyhow!("Failed to decode image for thumbnail: {}", e))?;

    encode_preview(&img)
}
