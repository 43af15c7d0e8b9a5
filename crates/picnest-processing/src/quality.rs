//! Quality scoring for perceptual-duplicate arbitration.

/// Comparable "goodness" of an image: resolution dominates, byte size only
/// breaks ties between equal-resolution candidates. Missing dimensions count
/// as zero. Only meaningful between two images already judged perceptually
/// identical.
pub fn quality_score(size_bytes: i64, width: Option<u32>, height: Option<u32>) -> f64 {
    let pixels = width.unwrap_or(0) as f64 * height.unwrap_or(0) as f64;
    pixels + size_bytes as f64 / 1000.0
}
