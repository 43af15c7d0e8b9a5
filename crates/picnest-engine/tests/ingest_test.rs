//! End-to-end ingestion pipeline tests against a temp directory and an
//! in-memory record store.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use image::{ImageBuffer, Rgb};
use sqlx::sqlite::SqlitePoolOptions;

use picnest_core::{AppError, EngineConfig, MediaKind};
use picnest_db::init_schema;
use picnest_engine::{IngestOutcome, IngestRequest, MediaIngest};

async fn engine_with(data_dir: &Path, max_upload_bytes: usize) -> MediaIngest {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();

    let config = EngineConfig {
        data_dir: data_dir.to_path_buf(),
        max_upload_bytes,
        ..Default::default()
    };
    MediaIngest::new(&config, pool).await.unwrap()
}

async fn engine(data_dir: &Path) -> MediaIngest {
    engine_with(data_dir, 100 * 1024 * 1024).await
}

fn horizontal_gradient_png(width: u32, height: u32) -> Bytes {
    let img = ImageBuffer::from_fn(width, height, |x, _| {
        Rgb([(x * 255 / width.max(1)) as u8, 80u8, 160u8])
    });
    encode_png(img)
}

fn vertical_gradient_png(width: u32, height: u32) -> Bytes {
    let img = ImageBuffer::from_fn(width, height, |_, y| {
        Rgb([(y * 255 / height.max(1)) as u8, 80u8, 160u8])
    });
    encode_png(img)
}

fn encode_png(img: ImageBuffer<Rgb<u8>, Vec<u8>>) -> Bytes {
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    Bytes::from(out.into_inner())
}

fn image_request(event_id: i64, name: &str, data: Bytes) -> IngestRequest {
    IngestRequest {
        event_id,
        original_name: name.to_string(),
        mime: "image/png".to_string(),
        uploader_name: "alice".to_string(),
        data,
    }
}

fn stored_path(data_dir: &Path, event_id: i64, relpath: &str) -> PathBuf {
    data_dir.join("events").join(event_id.to_string()).join(relpath)
}

async fn wait_for_file(path: &Path) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !path.exists() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "file never appeared: {}",
            path.display()
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn fresh_image_is_created_with_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path()).await;

    let outcome = engine
        .ingest(image_request(1, "Party Photo.PNG", horizontal_gradient_png(800, 600)))
        .await
        .unwrap();

    let IngestOutcome::Created(item) = outcome else {
        panic!("expected a fresh item");
    };
    assert_eq!(item.kind(), MediaKind::Image);
    assert_eq!(item.info.width(), Some(800));
    assert_eq!(item.info.height(), Some(600));
    assert!(item.phash.is_some());
    assert!(item.stored_relpath.starts_with("original/"));
    assert!(item.stored_relpath.ends_with(".png"));
    assert!(stored_path(dir.path(), 1, &item.stored_relpath).exists());
}

#[tokio::test]
async fn exact_duplicate_is_absorbed() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path()).await;
    let data = horizontal_gradient_png(640, 480);

    let first = engine
        .ingest(image_request(1, "a.png", data.clone()))
        .await
        .unwrap();
    let second = engine
        .ingest(image_request(1, "renamed.png", data))
        .await
        .unwrap();

    match second {
        IngestOutcome::ExactDuplicate(item) => {
            assert_eq!(item.id, first.item().id);
            // The first upload's name survives.
            assert_eq!(item.original_name, "a.png");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(engine.list(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn exact_dedup_is_global_across_events() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path()).await;
    let data = horizontal_gradient_png(640, 480);

    let first = engine
        .ingest(image_request(1, "a.png", data.clone()))
        .await
        .unwrap();
    let second = engine
        .ingest(image_request(2, "b.png", data))
        .await
        .unwrap();

    match second {
        IngestOutcome::ExactDuplicate(item) => {
            assert_eq!(item.id, first.item().id);
            assert_eq!(item.event_id, 1);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(engine.list(2).await.unwrap().is_empty());
    assert!(!dir.path().join("events").join("2").exists());
}

#[tokio::test]
async fn perceptual_duplicate_keeps_better_existing() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path()).await;

    let big = engine
        .ingest(image_request(1, "big.png", horizontal_gradient_png(1000, 1000)))
        .await
        .unwrap();
    let outcome = engine
        .ingest(image_request(1, "small.png", horizontal_gradient_png(400, 400)))
        .await
        .unwrap();

    match outcome {
        IngestOutcome::PerceptualDuplicate(item) => {
            assert_eq!(item.id, big.item().id);
            assert_eq!(item.info.width(), Some(1000));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(engine.list(1).await.unwrap().len(), 1);
    assert!(stored_path(dir.path(), 1, &big.item().stored_relpath).exists());
}

#[tokio::test]
async fn perceptual_replacement_upgrades_record_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path()).await;

    let small = match engine
        .ingest(image_request(1, "small.png", horizontal_gradient_png(400, 400)))
        .await
        .unwrap()
    {
        IngestOutcome::Created(item) => item,
        other => panic!("unexpected outcome: {:?}", other),
    };

    // Let the first version's thumbnail land so the replacement has a stale
    // derived asset to clean up.
    let small_thumbnail = stored_path(
        dir.path(),
        1,
        &format!("derived/thumbs/{}.webp", small.uuid),
    );
    wait_for_file(&small_thumbnail).await;

    let outcome = engine
        .ingest(image_request(1, "big.png", horizontal_gradient_png(1000, 1000)))
        .await
        .unwrap();

    let IngestOutcome::Replaced(item) = outcome else {
        panic!("expected replacement");
    };

    // Same record, new identity and bytes.
    assert_eq!(item.id, small.id);
    assert_ne!(item.uuid, small.uuid);
    assert_eq!(item.original_name, "big.png");
    assert_eq!(item.info.width(), Some(1000));
    assert_eq!(item.info.height(), Some(1000));
    assert!(stored_path(dir.path(), 1, &item.stored_relpath).exists());
    assert!(!stored_path(dir.path(), 1, &small.stored_relpath).exists());
    assert_eq!(engine.list(1).await.unwrap().len(), 1);

    // Derived assets follow the uuid: the old thumbnail is gone and a new
    // one is regenerated against the replacement's bytes.
    assert!(!small_thumbnail.exists());
    wait_for_file(&stored_path(
        dir.path(),
        1,
        &format!("derived/thumbs/{}.webp", item.uuid),
    ))
    .await;
}

#[tokio::test]
async fn distinct_images_both_survive() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path()).await;

    let a = engine
        .ingest(image_request(1, "a.png", horizontal_gradient_png(600, 600)))
        .await
        .unwrap();
    let b = engine
        .ingest(image_request(1, "b.png", vertical_gradient_png(600, 600)))
        .await
        .unwrap();

    assert!(matches!(a, IngestOutcome::Created(_)));
    assert!(matches!(b, IngestOutcome::Created(_)));
    assert_eq!(engine.list(1).await.unwrap().len(), 2);
}

#[tokio::test]
async fn unsupported_mime_is_rejected_without_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path()).await;

    let mut request = image_request(1, "doc.pdf", Bytes::from_static(b"%PDF-1.4"));
    request.mime = "application/pdf".to_string();

    let err = engine.ingest(request).await.unwrap_err();
    assert!(matches!(err, AppError::UnsupportedMediaType(_)));
    assert!(!dir.path().join("events").join("1").exists());
}

#[tokio::test]
async fn oversize_upload_is_rejected_before_any_write() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(dir.path(), 1024).await;

    let mut request = image_request(1, "huge.png", Bytes::from(vec![0u8; 2048]));
    request.mime = "image/png".to_string();

    let err = engine.ingest(request).await.unwrap_err();
    assert!(matches!(err, AppError::PayloadTooLarge { size: 2048, limit: 1024 }));
    assert!(!dir.path().join("events").join("1").exists());
}

#[tokio::test]
async fn unprobeable_video_still_ingests_with_absent_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path()).await;

    let request = IngestRequest {
        event_id: 1,
        original_name: "clip.mp4".to_string(),
        mime: "video/mp4".to_string(),
        uploader_name: "bob".to_string(),
        data: Bytes::from_static(b"definitely not an mp4 container"),
    };

    let IngestOutcome::Created(item) = engine.ingest(request).await.unwrap() else {
        panic!("expected the video to be accepted");
    };
    assert_eq!(item.kind(), MediaKind::Video);
    assert_eq!(item.info.width(), None);
    assert_eq!(item.info.height(), None);
    assert_eq!(item.info.duration_seconds(), None);
    assert!(item.phash.is_none());
    assert!(stored_path(dir.path(), 1, &item.stored_relpath).exists());
}

#[tokio::test]
async fn undecodable_image_still_ingests_without_fingerprint() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path()).await;

    let request = image_request(1, "broken.png", Bytes::from_static(b"\x89PNG but truncated"));
    let IngestOutcome::Created(item) = engine.ingest(request).await.unwrap() else {
        panic!("expected the image to be accepted");
    };
    assert!(item.phash.is_none());
    assert_eq!(item.info.width(), None);
}

#[tokio::test]
async fn read_original_returns_stored_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path()).await;
    let data = horizontal_gradient_png(320, 240);

    let outcome = engine
        .ingest(image_request(1, "a.png", data.clone()))
        .await
        .unwrap();

    let stored = engine.read_original(outcome.item().id).await.unwrap();
    assert_eq!(stored, data.to_vec());

    let err = engine.read_original(999_999).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn delete_removes_original_thumbnail_and_record() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path()).await;

    let item = match engine
        .ingest(image_request(1, "a.png", horizontal_gradient_png(800, 600)))
        .await
        .unwrap()
    {
        IngestOutcome::Created(item) => item,
        other => panic!("unexpected outcome: {:?}", other),
    };

    let original = stored_path(dir.path(), 1, &item.stored_relpath);
    let thumbnail = stored_path(
        dir.path(),
        1,
        &format!("derived/thumbs/{}.webp", item.uuid),
    );
    wait_for_file(&thumbnail).await;

    assert!(engine.delete(item.id).await.unwrap());
    assert!(!original.exists());
    assert!(!thumbnail.exists());
    assert!(engine.get(item.id).await.unwrap().is_none());

    // Second delete is a no-op, not an error.
    assert!(!engine.delete(item.id).await.unwrap());
}

#[tokio::test]
async fn delete_many_skips_missing_ids() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path()).await;

    let a = engine
        .ingest(image_request(1, "a.png", horizontal_gradient_png(500, 500)))
        .await
        .unwrap();
    let b = engine
        .ingest(image_request(1, "b.png", vertical_gradient_png(500, 500)))
        .await
        .unwrap();

    let deleted = engine
        .delete_many(&[a.item().id, 424_242, b.item().id])
        .await
        .unwrap();
    assert_eq!(deleted, 2);
    assert!(engine.list(1).await.unwrap().is_empty());
}
