//! Background derivative generation.
//!
//! Thumbnails and posters are produced off the upload path by a bounded
//! worker pool. A derivative is a cache of the stored original: a failed or
//! dropped job degrades presentation, never correctness, so failures are
//! logged and swallowed and a full queue sheds the job instead of blocking
//! the uploader.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Semaphore;
use uuid::Uuid;

use picnest_core::constants::POSTER_TIMESTAMP_SECS;
use picnest_processing::image::render_thumbnail;
use picnest_processing::video::PosterExtractor;
use picnest_storage::{keys, ContentStore};

/// A unit of background work scheduled after the original is durable.
pub enum DerivativeJob {
    /// Render a webp thumbnail from the already-uploaded image bytes.
    Thumbnail {
        event_id: i64,
        uuid: Uuid,
        image: Bytes,
    },
    /// Extract a poster frame from the stored video file.
    Poster {
        event_id: i64,
        uuid: Uuid,
        relpath: String,
    },
}

impl DerivativeJob {
    fn kind(&self) -> &'static str {
        match self {
            DerivativeJob::Thumbnail { .. } => "thumbnail",
            DerivativeJob::Poster { .. } => "poster",
        }
    }
}

/// Render and store an image thumbnail. Decoding and encoding are CPU-bound,
/// so they run on the blocking pool.
pub async fn generate_thumbnail(
    store: &ContentStore,
    event_id: i64,
    uuid: Uuid,
    image: Bytes,
) -> anyhow::Result<()> {
    let webp = tokio::task::spawn_blocking(move || render_thumbnail(&image)).await??;
    store
        .write(event_id, &keys::thumbnail_relpath(uuid), &webp)
        .await?;
    Ok(())
}

/// Extract and store a video poster frame.
pub async fn generate_poster(
    store: &ContentStore,
    extractor: &PosterExtractor,
    event_id: i64,
    uuid: Uuid,
    relpath: &str,
) -> anyhow::Result<()> {
    let video_path = store.abs_path(event_id, relpath)?;
    let poster = extractor
        .extract_frame(&video_path, POSTER_TIMESTAMP_SECS)
        .await?;
    store
        .write(event_id, &keys::poster_relpath(uuid), &poster)
        .await?;
    Ok(())
}

/// Bounded submission queue in front of a semaphore-capped worker pool.
#[derive(Clone)]
pub struct DerivativeQueue {
    tx: mpsc::Sender<DerivativeJob>,
}

impl DerivativeQueue {
    /// Spawn the dispatch loop. At most `workers` jobs run concurrently and
    /// at most `queue_depth` jobs wait.
    pub fn start(
        store: Arc<ContentStore>,
        extractor: PosterExtractor,
        workers: usize,
        queue_depth: usize,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<DerivativeJob>(queue_depth.max(1));
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let extractor = Arc::new(extractor);

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let store = store.clone();
                let extractor = extractor.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    let kind = job.kind();
                    if let Err(e) = run_job(&store, &extractor, job).await {
                        tracing::warn!(kind, error = %e, "Derivative job failed");
                    }
                });
            }
            tracing::debug!("Derivative queue drained, dispatch loop exiting");
        });

        Self { tx }
    }

    /// Enqueue a job without blocking. When the queue is full the job is
    /// dropped with a warning; the original it derives from is already safe.
    pub fn submit(&self, job: DerivativeJob) {
        match self.tx.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                tracing::warn!(kind = job.kind(), "Derivative queue full, dropping job");
            }
            Err(TrySendError::Closed(job)) => {
                tracing::warn!(kind = job.kind(), "Derivative queue closed, dropping job");
            }
        }
    }
}

async fn run_job(
    store: &ContentStore,
    extractor: &PosterExtractor,
    job: DerivativeJob,
) -> anyhow::Result<()> {
    match job {
        DerivativeJob::Thumbnail {
            event_id,
            uuid,
            image,
        } => generate_thumbnail(store, event_id, uuid, image).await,
        DerivativeJob::Poster {
            event_id,
            uuid,
            relpath,
        } => generate_poster(store, extractor, event_id, uuid, &relpath).await,
    }
}
