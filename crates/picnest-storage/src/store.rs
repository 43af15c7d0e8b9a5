//! Local filesystem content store.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::keys;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Content store rooted at a base directory, with every file scoped under an
/// event-specific root.
#[derive(Clone)]
pub struct ContentStore {
    base_path: PathBuf,
}

impl ContentStore {
    /// Create a content store, creating the base directory if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(ContentStore { base_path })
    }

    fn event_root(&self, event_id: i64) -> PathBuf {
        self.base_path.join("events").join(event_id.to_string())
    }

    /// Resolve an event-relative path to an absolute filesystem path,
    /// rejecting traversal sequences that could escape the event root.
    fn resolve(&self, event_id: i64, relpath: &str) -> StorageResult<PathBuf> {
        if relpath.contains("..") || relpath.starts_with('/') || relpath.contains('\\') {
            return Err(StorageError::InvalidPath(format!(
                "Path contains invalid components: {}",
                relpath
            )));
        }
        Ok(self.event_root(event_id).join(relpath))
    }

    /// Absolute path of a stored file, for handing to external tools.
    pub fn abs_path(&self, event_id: i64, relpath: &str) -> StorageResult<PathBuf> {
        self.resolve(event_id, relpath)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes to an event-relative path, creating parents as needed.
    /// Overwrites any existing file at the same path.
    pub async fn write(&self, event_id: i64, relpath: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.resolve(event_id, relpath)?;
        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            event_id,
            relpath,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Content store write successful"
        );

        Ok(())
    }

    /// Write an uploaded original under the date-sharded original layout and
    /// return the event-relative path it was stored at. The shard is the UTC
    /// write date, not any content timestamp.
    pub async fn write_original(
        &self,
        event_id: i64,
        uuid: Uuid,
        ext: &str,
        data: &[u8],
    ) -> StorageResult<String> {
        let relpath = keys::original_relpath(chrono::Utc::now().date_naive(), uuid, ext);
        self.write(event_id, &relpath, data).await?;
        Ok(relpath)
    }

    /// Read a stored file.
    pub async fn read(&self, event_id: i64, relpath: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(event_id, relpath)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(relpath.to_string()));
        }

        fs::read(&path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })
    }

    /// Check whether a stored file exists.
    pub async fn exists(&self, event_id: i64, relpath: &str) -> StorageResult<bool> {
        let path = self.resolve(event_id, relpath)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    /// Delete a stored file. A missing file is the common "already cleaned
    /// up" case and is not an error; any other I/O failure is surfaced.
    pub async fn delete(&self, event_id: i64, relpath: &str) -> StorageResult<()> {
        let path = self.resolve(event_id, relpath)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(event_id, relpath, "Content store delete successful");
        Ok(())
    }

    /// Delete a media item's original plus its derived assets. All three
    /// deletes are attempted; missing files are skipped silently, and the
    /// first hard failure (if any) is returned after the rest have run.
    pub async fn delete_all(
        &self,
        event_id: i64,
        uuid: Uuid,
        original_relpath: &str,
    ) -> StorageResult<()> {
        let targets = [
            original_relpath.to_string(),
            keys::thumbnail_relpath(uuid),
            keys::poster_relpath(uuid),
        ];

        let mut first_error = None;
        for relpath in &targets {
            if let Err(e) = self.delete(event_id, relpath).await {
                tracing::warn!(event_id, relpath, error = %e, "Failed to delete media file");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path()).await.unwrap();

        let data = b"test data".to_vec();
        store.write(1, "original/2026-01-01/a.jpg", &data).await.unwrap();

        let read_back = store.read(1, "original/2026-01-01/a.jpg").await.unwrap();
        assert_eq!(data, read_back);
        assert!(store.exists(1, "original/2026-01-01/a.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_events_are_isolated() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path()).await.unwrap();

        store.write(1, "original/2026-01-01/a.jpg", b"one").await.unwrap();
        assert!(!store.exists(2, "original/2026-01-01/a.jpg").await.unwrap());

        // Removing the event root removes all its files in one operation.
        let root = dir.path().join("events").join("1");
        assert!(root.exists());
        std::fs::remove_dir_all(&root).unwrap();
        assert!(!store.exists(1, "original/2026-01-01/a.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path()).await.unwrap();

        let result = store.read(1, "../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));

        let result = store.delete(1, "../sibling/file").await;
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));

        let result = store.write(1, "/etc/passwd", b"x").await;
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_delete_nonexistent_is_ok() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path()).await.unwrap();

        assert!(store.delete(1, "original/nope/missing.jpg").await.is_ok());
    }

    #[tokio::test]
    async fn test_write_original_shards_by_date() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path()).await.unwrap();

        let uuid = Uuid::new_v4();
        let relpath = store.write_original(7, uuid, "png", b"pixels").await.unwrap();

        let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
        assert_eq!(relpath, format!("original/{}/{}.png", today, uuid));
        assert!(store.exists(7, &relpath).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_all_removes_existing_subset() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path()).await.unwrap();

        let uuid = Uuid::new_v4();
        let relpath = store.write_original(3, uuid, "jpg", b"orig").await.unwrap();
        store
            .write(3, &keys::thumbnail_relpath(uuid), b"thumb")
            .await
            .unwrap();
        // No poster was ever generated; delete_all must not mind.

        store.delete_all(3, uuid, &relpath).await.unwrap();

        assert!(!store.exists(3, &relpath).await.unwrap());
        assert!(!store.exists(3, &keys::thumbnail_relpath(uuid)).await.unwrap());
    }
}
