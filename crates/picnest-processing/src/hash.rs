//! Content hashing: exact identity (SHA-256) and perceptual fingerprints.

use image::imageops::FilterType;
use image::ImageReader;
use sha2::{Digest, Sha256};
use std::io::Cursor;

use picnest_core::Fingerprint;

/// Compute the hex-encoded SHA-256 digest of a buffer.
///
/// This is the global exact-duplicate key: collision resistance matters, a
/// checksum would not do.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute the 64-bit perceptual fingerprint of an encoded image.
///
/// The image is downscaled to an 8x8 grayscale grid, and each bit is set
/// when its sample is at or above the grid's mean intensity. Returns `None`
/// on any decode failure; callers treat that as "cannot participate in
/// perceptual dedup", not as an error.
pub fn perceptual_hash(data: &[u8]) -> Option<Fingerprint> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .decode()
        .ok()?;

    let grid = img.resize_exact(8, 8, FilterType::Triangle).to_luma8();
    let pixels: Vec<u8> = grid.pixels().map(|p| p.0[0]).collect();
    debug_assert_eq!(pixels.len(), 64);

    let mean = pixels.iter().map(|&p| p as f64).sum::<f64>() / pixels.len() as f64;

    let mut bits: u64 = 0;
    for &px in &pixels {
        bits <<= 1;
        if px as f64 >= mean {
            bits |= 1;
        }
    }

    Some(Fingerprint::from_bits(bits))
}
