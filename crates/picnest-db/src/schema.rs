//! Media table bootstrap.
//!
//! The `sha256` column carries a schema-level UNIQUE constraint: exact-
//! duplicate rejection is enforced by the record store itself, not only by
//! the engine's pre-check.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use picnest_core::AppError;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS media (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id INTEGER NOT NULL,
    uuid TEXT NOT NULL,
    original_name TEXT NOT NULL,
    mime TEXT NOT NULL,
    kind TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    width INTEGER,
    height INTEGER,
    duration_seconds REAL,
    stored_relpath TEXT NOT NULL,
    sha256 TEXT NOT NULL UNIQUE,
    phash TEXT,
    uploader_name TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_media_event ON media(event_id);
CREATE INDEX IF NOT EXISTS idx_media_event_kind ON media(event_id, kind);
"#;

/// Create (if needed) the tables and indexes the engine owns.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}

/// Open a pool against `database_url`, creating the database file if it does
/// not exist, and bootstrap the schema.
pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(AppError::Database)?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;

    tracing::info!(database_url, "Media record store ready");
    Ok(pool)
}
