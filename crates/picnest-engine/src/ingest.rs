//! The upload pipeline.
//!
//! Ordering of side effects is fixed: record lookups first, then file
//! writes, then file deletes, then the record write, and derivative jobs
//! only after the record is durable. A crash therefore leaves at worst an
//! orphaned file on disk, never a record pointing at missing bytes.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use sqlx::SqlitePool;
use uuid::Uuid;

use picnest_core::constants::PHASH_DISTANCE_THRESHOLD;
use picnest_core::models::{Fingerprint, MediaInfo, MediaItem, MediaKind};
use picnest_core::{AppError, EngineConfig};
use picnest_db::{InsertOutcome, MediaRepository, NewMedia, ReplacementFields};
use picnest_processing::image::probe_dimensions;
use picnest_processing::video::{PosterExtractor, VideoProber};
use picnest_processing::{perceptual_hash, quality_score, sha256_hex};
use picnest_storage::{keys, ContentStore, StorageError};

use crate::derivatives::{DerivativeJob, DerivativeQueue};
use crate::locks::EventLocks;

fn storage_err(e: StorageError) -> AppError {
    AppError::Storage(e.to_string())
}

/// One upload, as handed to the engine.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub event_id: i64,
    pub original_name: String,
    pub mime: String,
    pub uploader_name: String,
    pub data: Bytes,
}

/// What became of an upload.
#[derive(Debug)]
pub enum IngestOutcome {
    /// Stored as a new media item.
    Created(MediaItem),
    /// Byte-identical to an existing item anywhere in the system; nothing
    /// was stored. Carries the surviving item.
    ExactDuplicate(MediaItem),
    /// Perceptually matched an equal-or-better image in the same event;
    /// nothing was stored. Carries the surviving item.
    PerceptualDuplicate(MediaItem),
    /// Perceptually matched a worse image in the same event and took over
    /// its record. Carries the rewritten item.
    Replaced(MediaItem),
}

impl IngestOutcome {
    pub fn item(&self) -> &MediaItem {
        match self {
            IngestOutcome::Created(item)
            | IngestOutcome::ExactDuplicate(item)
            | IngestOutcome::PerceptualDuplicate(item)
            | IngestOutcome::Replaced(item) => item,
        }
    }

    /// Whether the upload's bytes were kept.
    pub fn stored_new_bytes(&self) -> bool {
        matches!(
            self,
            IngestOutcome::Created(_) | IngestOutcome::Replaced(_)
        )
    }
}

/// The media ingestion engine.
#[derive(Clone)]
pub struct MediaIngest {
    repo: MediaRepository,
    store: Arc<ContentStore>,
    derivatives: DerivativeQueue,
    prober: Arc<VideoProber>,
    locks: EventLocks,
    max_upload_bytes: usize,
}

impl MediaIngest {
    /// Build an engine over an already-connected record store pool.
    pub async fn new(config: &EngineConfig, pool: SqlitePool) -> Result<Self, AppError> {
        let store = Arc::new(
            ContentStore::new(config.data_dir.clone())
                .await
                .map_err(storage_err)?,
        );
        let timeout = Duration::from_secs(config.probe_timeout_secs);
        let prober = VideoProber::new(config.ffprobe_path.clone(), timeout)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        let extractor = PosterExtractor::new(config.ffmpeg_path.clone(), timeout);
        let derivatives = DerivativeQueue::start(
            store.clone(),
            extractor,
            config.derivative_workers,
            config.derivative_queue_depth,
        );

        Ok(Self {
            repo: MediaRepository::new(pool),
            store,
            derivatives,
            prober: Arc::new(prober),
            locks: EventLocks::new(),
            max_upload_bytes: config.max_upload_bytes,
        })
    }

    /// Ingest one upload into an event.
    #[tracing::instrument(
        skip(self, request),
        fields(
            event_id = request.event_id,
            original_name = %request.original_name,
            mime = %request.mime,
            size_bytes = request.data.len(),
        )
    )]
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome, AppError> {
        if request.data.len() > self.max_upload_bytes {
            return Err(AppError::PayloadTooLarge {
                size: request.data.len(),
                limit: self.max_upload_bytes,
            });
        }

        let kind = MediaKind::from_mime(&request.mime)
            .ok_or_else(|| AppError::UnsupportedMediaType(request.mime.clone()))?;

        let _guard = self.locks.acquire(request.event_id).await;

        let sha256 = sha256_hex(&request.data);
        if let Some(existing) = self.repo.find_by_sha256(&sha256).await? {
            tracing::info!(existing_id = existing.id, "Exact duplicate, absorbing upload");
            return Ok(IngestOutcome::ExactDuplicate(existing));
        }

        // Decode once; both the match scan and the new-item path need these.
        let (dims, phash) = match kind {
            MediaKind::Image => (probe_dimensions(&request.data), perceptual_hash(&request.data)),
            MediaKind::Video => (None, None),
        };

        if kind == MediaKind::Image {
            if let Some(outcome) = self
                .try_perceptual_match(&request, &sha256, dims, phash)
                .await?
            {
                return Ok(outcome);
            }
        }

        self.store_new(request, kind, sha256, dims, phash).await
    }

    /// Scan the event's images for a perceptual match and resolve it by
    /// quality. Returns `None` when the upload should be stored as new,
    /// including when its fingerprint cannot be computed.
    async fn try_perceptual_match(
        &self,
        request: &IngestRequest,
        sha256: &str,
        dims: Option<(u32, u32)>,
        phash: Option<Fingerprint>,
    ) -> Result<Option<IngestOutcome>, AppError> {
        let Some(phash) = phash else {
            tracing::warn!("Image fingerprint unavailable, skipping perceptual dedup");
            return Ok(None);
        };

        let candidates = self.repo.find_images_by_event(request.event_id).await?;
        let Some(matched) = candidates
            .into_iter()
            .find(|c| c.phash.distance(&phash) <= PHASH_DISTANCE_THRESHOLD)
        else {
            return Ok(None);
        };

        let incoming = quality_score(
            request.data.len() as i64,
            dims.map(|d| d.0),
            dims.map(|d| d.1),
        );
        let existing = quality_score(matched.size_bytes, matched.width, matched.height);

        if incoming <= existing {
            tracing::info!(
                existing_id = matched.id,
                incoming_score = incoming,
                existing_score = existing,
                "Perceptual duplicate, keeping existing version"
            );
            let item = self.repo.get_by_id(matched.id).await?.ok_or_else(|| {
                AppError::Internal(format!("Matched media row {} disappeared", matched.id))
            })?;
            return Ok(Some(IngestOutcome::PerceptualDuplicate(item)));
        }

        tracing::info!(
            existing_id = matched.id,
            incoming_score = incoming,
            existing_score = existing,
            "Perceptual duplicate, replacing with better version"
        );

        let uuid = Uuid::new_v4();
        let ext = keys::file_extension(&request.original_name);
        let relpath = self
            .store
            .write_original(request.event_id, uuid, &ext, &request.data)
            .await
            .map_err(storage_err)?;

        self.store
            .delete(request.event_id, &matched.stored_relpath)
            .await
            .map_err(storage_err)?;

        let updated = self
            .repo
            .update_replacement(
                matched.id,
                ReplacementFields {
                    uuid,
                    original_name: request.original_name.clone(),
                    stored_relpath: relpath,
                    mime: request.mime.clone(),
                    size_bytes: request.data.len() as i64,
                    width: dims.map(|d| d.0),
                    height: dims.map(|d| d.1),
                    sha256: sha256.to_string(),
                    phash: Some(phash),
                },
            )
            .await?;

        // The replaced version's thumbnail is stale; its uuid is gone.
        if let Err(e) = self
            .store
            .delete(request.event_id, &keys::thumbnail_relpath(matched.uuid))
            .await
        {
            tracing::warn!(error = %e, "Failed to delete stale thumbnail");
        }

        self.derivatives.submit(DerivativeJob::Thumbnail {
            event_id: request.event_id,
            uuid,
            image: request.data.clone(),
        });

        Ok(Some(IngestOutcome::Replaced(updated)))
    }

    /// Store an upload that matched nothing: write the file, probe metadata,
    /// insert the record, then schedule derivatives.
    async fn store_new(
        &self,
        request: IngestRequest,
        kind: MediaKind,
        sha256: String,
        dims: Option<(u32, u32)>,
        phash: Option<Fingerprint>,
    ) -> Result<IngestOutcome, AppError> {
        let uuid = Uuid::new_v4();
        let ext = keys::file_extension(&request.original_name);
        let relpath = self
            .store
            .write_original(request.event_id, uuid, &ext, &request.data)
            .await
            .map_err(storage_err)?;

        let (info, phash): (MediaInfo, Option<Fingerprint>) = match kind {
            MediaKind::Image => (
                MediaInfo::Image {
                    width: dims.map(|d| d.0),
                    height: dims.map(|d| d.1),
                },
                phash,
            ),
            MediaKind::Video => {
                let path = self
                    .store
                    .abs_path(request.event_id, &relpath)
                    .map_err(storage_err)?;
                let probe = self.prober.probe(&path).await;
                (
                    MediaInfo::Video {
                        width: probe.width,
                        height: probe.height,
                        duration_seconds: probe.duration_seconds,
                    },
                    None,
                )
            }
        };

        let inserted = self
            .repo
            .insert(NewMedia {
                event_id: request.event_id,
                uuid,
                original_name: request.original_name,
                mime: request.mime,
                kind,
                size_bytes: request.data.len() as i64,
                width: info.width(),
                height: info.height(),
                duration_seconds: info.duration_seconds(),
                stored_relpath: relpath.clone(),
                sha256,
                phash,
                uploader_name: request.uploader_name,
            })
            .await;

        let item = match inserted {
            Ok(InsertOutcome::Inserted(item)) => item,
            Ok(InsertOutcome::DuplicateSha256(existing)) => {
                self.remove_orphan(request.event_id, &relpath).await;
                return Ok(IngestOutcome::ExactDuplicate(existing));
            }
            Err(e) => {
                self.remove_orphan(request.event_id, &relpath).await;
                return Err(e);
            }
        };

        match kind {
            MediaKind::Image => self.derivatives.submit(DerivativeJob::Thumbnail {
                event_id: item.event_id,
                uuid,
                image: request.data,
            }),
            MediaKind::Video => self.derivatives.submit(DerivativeJob::Poster {
                event_id: item.event_id,
                uuid,
                relpath,
            }),
        }

        Ok(IngestOutcome::Created(item))
    }

    /// Best-effort cleanup of a file whose record never landed.
    async fn remove_orphan(&self, event_id: i64, relpath: &str) {
        if let Err(e) = self.store.delete(event_id, relpath).await {
            tracing::warn!(event_id, relpath, error = %e, "Failed to clean up orphaned file");
        }
    }

    /// Fetch one media item.
    pub async fn get(&self, media_id: i64) -> Result<Option<MediaItem>, AppError> {
        self.repo.get_by_id(media_id).await
    }

    /// All media of one event, newest first.
    pub async fn list(&self, event_id: i64) -> Result<Vec<MediaItem>, AppError> {
        self.repo.list_by_event(event_id).await
    }

    /// Read a media item's stored original bytes.
    pub async fn read_original(&self, media_id: i64) -> Result<Vec<u8>, AppError> {
        let item = self
            .repo
            .get_by_id(media_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("media {}", media_id)))?;
        self.store
            .read(item.event_id, &item.stored_relpath)
            .await
            .map_err(storage_err)
    }

    /// Delete one media item: files first, record last, so a crash between
    /// the two leaves a record whose delete can be retried. Returns false
    /// when the id did not exist.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, media_id: i64) -> Result<bool, AppError> {
        let Some(item) = self.repo.get_by_id(media_id).await? else {
            return Ok(false);
        };

        self.store
            .delete_all(item.event_id, item.uuid, &item.stored_relpath)
            .await
            .map_err(storage_err)?;

        self.repo.delete_by_id(media_id).await
    }

    /// Delete several media items, continuing past per-item failures.
    /// Returns how many records were removed.
    #[tracing::instrument(skip(self, media_ids), fields(count = media_ids.len()))]
    pub async fn delete_many(&self, media_ids: &[i64]) -> Result<usize, AppError> {
        let mut deleted = 0;
        for &id in media_ids {
            match self.delete(id).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(media_id = id, error = %e, "Failed to delete media item");
                }
            }
        }
        Ok(deleted)
    }
}
