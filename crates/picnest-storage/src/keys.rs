//! Centralized construction of event-relative storage paths.

use chrono::NaiveDate;
use uuid::Uuid;

use picnest_core::constants::FALLBACK_EXTENSION;

/// Relative path of an original file, sharded by write date.
pub fn original_relpath(date: NaiveDate, uuid: Uuid, ext: &str) -> String {
    format!("original/{}/{}.{}", date.format("%Y-%m-%d"), uuid, ext)
}

/// Relative path of the thumbnail derived for `uuid`.
pub fn thumbnail_relpath(uuid: Uuid) -> String {
    format!("derived/thumbs/{}.webp", uuid)
}

/// Relative path of the poster derived for `uuid`.
pub fn poster_relpath(uuid: Uuid) -> String {
    format!("derived/posters/{}.webp", uuid)
}

/// Extract a storage-safe file extension from an uploaded name.
///
/// Falls back to `bin` when the name has no usable extension. The result is
/// restricted to short alphanumeric strings so it can never break out of the
/// key layout.
pub fn file_extension(original_name: &str) -> String {
    let ext = original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or("");

    if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        FALLBACK_EXTENSION.to_string()
    } else {
        ext.to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn original_path_is_date_sharded() {
        let uuid = Uuid::nil();
        let date = NaiveDate::from_ymd_opt(2026, 8, 28).unwrap();
        assert_eq!(
            original_relpath(date, uuid, "jpg"),
            "original/2026-08-28/00000000-0000-0000-0000-000000000000.jpg"
        );
    }

    #[test]
    fn derived_paths_are_keyed_by_uuid() {
        let uuid = Uuid::nil();
        assert_eq!(
            thumbnail_relpath(uuid),
            "derived/thumbs/00000000-0000-0000-0000-000000000000.webp"
        );
        assert_eq!(
            poster_relpath(uuid),
            "derived/posters/00000000-0000-0000-0000-000000000000.webp"
        );
    }

    #[test]
    fn extension_extraction() {
        assert_eq!(file_extension("photo.JPG"), "jpg");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("noextension"), "bin");
        assert_eq!(file_extension("trailing."), "bin");
        assert_eq!(file_extension("weird.j/pg"), "bin");
        assert_eq!(file_extension("dots..everywhere.png"), "png");
    }
}
