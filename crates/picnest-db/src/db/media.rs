//! Media repository.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use picnest_core::models::{Fingerprint, MediaInfo, MediaItem, MediaKind};
use picnest_core::AppError;

/// Raw `media` table row.
#[derive(Debug, Clone, sqlx::FromRow)]
struct MediaRow {
    id: i64,
    event_id: i64,
    uuid: String,
    original_name: String,
    mime: String,
    kind: String,
    size_bytes: i64,
    width: Option<i64>,
    height: Option<i64>,
    duration_seconds: Option<f64>,
    stored_relpath: String,
    sha256: String,
    phash: Option<String>,
    uploader_name: String,
    created_at: DateTime<Utc>,
}

impl MediaRow {
    fn to_media_item(&self) -> Result<MediaItem, AppError> {
        let uuid = Uuid::parse_str(&self.uuid)
            .map_err(|e| AppError::Internal(format!("Corrupt uuid in media row {}: {}", self.id, e)))?;

        let kind = MediaKind::parse(&self.kind).ok_or_else(|| {
            AppError::Internal(format!(
                "Unknown media kind '{}' in media row {}",
                self.kind, self.id
            ))
        })?;

        let width = self.width.map(|w| w as u32);
        let height = self.height.map(|h| h as u32);
        let info = match kind {
            MediaKind::Image => MediaInfo::Image { width, height },
            MediaKind::Video => MediaInfo::Video {
                width,
                height,
                duration_seconds: self.duration_seconds,
            },
        };

        Ok(MediaItem {
            id: self.id,
            event_id: self.event_id,
            uuid,
            original_name: self.original_name.clone(),
            mime: self.mime.clone(),
            size_bytes: self.size_bytes,
            info,
            stored_relpath: self.stored_relpath.clone(),
            sha256: self.sha256.clone(),
            phash: parse_phash(self.id, self.phash.as_deref()),
            uploader_name: self.uploader_name.clone(),
            created_at: self.created_at,
        })
    }
}

/// An unparseable fingerprint disables perceptual dedup for the row instead
/// of poisoning reads.
fn parse_phash(row_id: i64, raw: Option<&str>) -> Option<Fingerprint> {
    let raw = raw?;
    match Fingerprint::from_hex(raw) {
        Ok(fp) => Some(fp),
        Err(e) => {
            tracing::warn!(row_id, error = %e, "Ignoring corrupt fingerprint");
            None
        }
    }
}

/// Fields of a new media record. The repository assigns `id` and
/// `created_at` on insert.
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub event_id: i64,
    pub uuid: Uuid,
    pub original_name: String,
    pub mime: String,
    pub kind: MediaKind,
    pub size_bytes: i64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_seconds: Option<f64>,
    pub stored_relpath: String,
    pub sha256: String,
    pub phash: Option<Fingerprint>,
    pub uploader_name: String,
}

/// Fields rewritten in place when a perceptual duplicate is replaced by a
/// better version. `id` and `event_id` never change.
#[derive(Debug, Clone)]
pub struct ReplacementFields {
    pub uuid: Uuid,
    pub original_name: String,
    pub stored_relpath: String,
    pub mime: String,
    pub size_bytes: i64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub sha256: String,
    pub phash: Option<Fingerprint>,
}

/// A same-event image row projected down to what the perceptual scan needs.
#[derive(Debug, Clone)]
pub struct ImageCandidate {
    pub id: i64,
    pub uuid: Uuid,
    pub phash: Fingerprint,
    pub size_bytes: i64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub stored_relpath: String,
}

/// Outcome of an insert attempt against the UNIQUE(sha256) constraint.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted(MediaItem),
    /// The digest already existed; carries the surviving row.
    DuplicateSha256(MediaItem),
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Repository over the media record store.
#[derive(Clone)]
pub struct MediaRepository {
    pool: SqlitePool,
}

impl MediaRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Global exact-duplicate lookup: the digest is unique system-wide, not
    /// per-event.
    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    pub async fn find_by_sha256(&self, sha256: &str) -> Result<Option<MediaItem>, AppError> {
        let row: Option<MediaRow> =
            sqlx::query_as("SELECT * FROM media WHERE sha256 = ?")
                .bind(sha256)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|r| r.to_media_item()).transpose()
    }

    /// Image rows of one event that can participate in perceptual dedup, in
    /// insertion order (the scan is first-match-wins).
    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    pub async fn find_images_by_event(
        &self,
        event_id: i64,
    ) -> Result<Vec<ImageCandidate>, AppError> {
        let rows: Vec<MediaRow> = sqlx::query_as(
            "SELECT * FROM media \
             WHERE event_id = ? AND kind = 'image' AND phash IS NOT NULL \
             ORDER BY id",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(phash) = parse_phash(row.id, row.phash.as_deref()) else {
                continue;
            };
            let uuid = Uuid::parse_str(&row.uuid).map_err(|e| {
                AppError::Internal(format!("Corrupt uuid in media row {}: {}", row.id, e))
            })?;
            candidates.push(ImageCandidate {
                id: row.id,
                uuid,
                phash,
                size_bytes: row.size_bytes,
                width: row.width.map(|w| w as u32),
                height: row.height.map(|h| h as u32),
                stored_relpath: row.stored_relpath,
            });
        }
        Ok(candidates)
    }

    /// Insert a new media record.
    ///
    /// The UNIQUE(sha256) constraint is the arbiter of identity: when a
    /// concurrent writer got there first, the conflict is observed and the
    /// surviving row is returned instead of an error.
    #[tracing::instrument(
        skip(self, new),
        fields(db.table = "media", db.operation = "insert", event_id = new.event_id)
    )]
    pub async fn insert(&self, new: NewMedia) -> Result<InsertOutcome, AppError> {
        let result: Result<MediaRow, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO media (
                event_id, uuid, original_name, mime, kind, size_bytes,
                width, height, duration_seconds,
                stored_relpath, sha256, phash, uploader_name, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(new.event_id)
        .bind(new.uuid.to_string())
        .bind(&new.original_name)
        .bind(&new.mime)
        .bind(new.kind.as_str())
        .bind(new.size_bytes)
        .bind(new.width.map(|w| w as i64))
        .bind(new.height.map(|h| h as i64))
        .bind(new.duration_seconds)
        .bind(&new.stored_relpath)
        .bind(&new.sha256)
        .bind(new.phash.map(|p| p.to_hex()))
        .bind(&new.uploader_name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(InsertOutcome::Inserted(row.to_media_item()?)),
            Err(e) if is_unique_violation(&e) => {
                let existing = self.find_by_sha256(&new.sha256).await?.ok_or_else(|| {
                    AppError::Internal(
                        "Duplicate sha256 reported but no existing row found".to_string(),
                    )
                })?;
                tracing::info!(
                    existing_id = existing.id,
                    "Insert lost the digest race, returning existing row"
                );
                Ok(InsertOutcome::DuplicateSha256(existing))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Rewrite a record in place after a perceptual replacement.
    #[tracing::instrument(
        skip(self, fields),
        fields(db.table = "media", db.operation = "update")
    )]
    pub async fn update_replacement(
        &self,
        id: i64,
        fields: ReplacementFields,
    ) -> Result<MediaItem, AppError> {
        let row: MediaRow = sqlx::query_as(
            r#"
            UPDATE media SET
                uuid = ?,
                original_name = ?,
                stored_relpath = ?,
                mime = ?,
                size_bytes = ?,
                width = ?,
                height = ?,
                sha256 = ?,
                phash = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(fields.uuid.to_string())
        .bind(&fields.original_name)
        .bind(&fields.stored_relpath)
        .bind(&fields.mime)
        .bind(fields.size_bytes)
        .bind(fields.width.map(|w| w as i64))
        .bind(fields.height.map(|h| h as i64))
        .bind(&fields.sha256)
        .bind(fields.phash.map(|p| p.to_hex()))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        row.to_media_item()
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    pub async fn get_by_id(&self, id: i64) -> Result<Option<MediaItem>, AppError> {
        let row: Option<MediaRow> = sqlx::query_as("SELECT * FROM media WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.to_media_item()).transpose()
    }

    /// Delete a record. Returns false when the id did not exist.
    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "delete"))]
    pub async fn delete_by_id(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM media WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All media of one event, newest first.
    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    pub async fn list_by_event(&self, event_id: i64) -> Result<Vec<MediaItem>, AppError> {
        let rows: Vec<MediaRow> = sqlx::query_as(
            "SELECT * FROM media WHERE event_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|r| r.to_media_item()).collect()
    }
}
