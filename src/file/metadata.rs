//! File records and their repository.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, SqlitePool};

use crate::datetime::{parse_db_timestamp, to_db_timestamp};
use crate::{LanshareError, Result};

use super::naming::Category;

const RECORD_COLUMNS: &str = "id, orig_name, stored_name, ext, mime, category, size_bytes, \
                              uploaded_at, expires_at, is_forever, downloads";

/// Metadata for one stored object.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FileRecord {
    /// Unique record ID.
    pub id: i64,
    /// Filename supplied by the uploader.
    pub orig_name: String,
    /// Generated on-disk name.
    pub stored_name: String,
    /// Lowercase extension with leading dot, or empty.
    pub ext: String,
    /// Guessed content type.
    pub mime: String,
    /// Category derived from the extension.
    #[sqlx(try_from = "String")]
    pub category: Category,
    /// Size of the stored object in bytes.
    pub size_bytes: i64,
    /// Upload time (UTC, storage format).
    pub uploaded_at: String,
    /// Expiry time (UTC, storage format); `None` for forever files.
    pub expires_at: Option<String>,
    /// Exempt from expiry.
    pub is_forever: bool,
    /// Number of completed downloads.
    pub downloads: i64,
}

impl FileRecord {
    /// Expiry as a datetime, if set and parseable.
    pub fn expires_at_datetime(&self) -> Option<DateTime<Utc>> {
        self.expires_at.as_deref().and_then(parse_db_timestamp)
    }
}

/// Data for inserting a new record.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub orig_name: String,
    pub stored_name: String,
    pub ext: String,
    pub mime: String,
    pub category: Category,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_forever: bool,
}

/// Builder for updating a record's expiry fields.
#[derive(Debug, Clone, Default)]
pub struct FileUpdate {
    /// New forever flag.
    pub is_forever: Option<bool>,
    /// New expiry (`Some(None)` clears it).
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

impl FileUpdate {
    /// Create a new FileUpdate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the forever flag.
    pub fn is_forever(mut self, is_forever: bool) -> Self {
        self.is_forever = Some(is_forever);
        self
    }

    /// Set or clear the expiry.
    pub fn expires_at(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.is_forever.is_none() && self.expires_at.is_none()
    }
}

/// Repository for file records.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a record and return it with its assigned ID.
    ///
    /// A duplicate stored name fails on the UNIQUE constraint.
    pub async fn insert(&self, record: &NewFileRecord) -> Result<FileRecord> {
        let result = sqlx::query(
            "INSERT INTO files (orig_name, stored_name, ext, mime, category, size_bytes,
                                uploaded_at, expires_at, is_forever)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.orig_name)
        .bind(&record.stored_name)
        .bind(&record.ext)
        .bind(&record.mime)
        .bind(record.category.as_str())
        .bind(record.size_bytes)
        .bind(to_db_timestamp(&record.uploaded_at))
        .bind(record.expires_at.as_ref().map(to_db_timestamp))
        .bind(record.is_forever)
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get(id)
            .await?
            .ok_or_else(|| LanshareError::NotFound(format!("file {id}")))
    }

    /// Get a record by ID.
    pub async fn get(&self, id: i64) -> Result<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// List records, newest first, optionally restricted to one category.
    pub async fn list(&self, category: Option<Category>) -> Result<Vec<FileRecord>> {
        let records = match category {
            Some(category) => {
                sqlx::query_as::<_, FileRecord>(&format!(
                    "SELECT {RECORD_COLUMNS} FROM files WHERE category = ? ORDER BY id DESC"
                ))
                .bind(category.as_str())
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, FileRecord>(&format!(
                    "SELECT {RECORD_COLUMNS} FROM files ORDER BY id DESC"
                ))
                .fetch_all(self.pool)
                .await?
            }
        };

        Ok(records)
    }

    /// Records whose expiry has passed at `now`. Forever records never match.
    pub async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM files
             WHERE is_forever = 0 AND expires_at IS NOT NULL AND expires_at <= ?
             ORDER BY id"
        ))
        .bind(to_db_timestamp(&now))
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }

    /// Update the expiry fields. Returns `false` if the record does not exist.
    pub async fn update_fields(&self, id: i64, update: &FileUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(self.get(id).await?.is_some());
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE files SET ");
        let mut separated = query.separated(", ");

        if let Some(is_forever) = update.is_forever {
            separated.push("is_forever = ");
            separated.push_bind_unseparated(is_forever);
        }

        if let Some(ref expires_at) = update.expires_at {
            separated.push("expires_at = ");
            separated.push_bind_unseparated(expires_at.as_ref().map(to_db_timestamp));
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query.build().execute(self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    /// Add one to the download counter.
    pub async fn increment_downloads(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE files SET downloads = downloads + 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a record. Returns `false` if it was already gone.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Total bytes of all records present right now.
    pub async fn sum_live_bytes(&self) -> Result<i64> {
        let (used,): (i64,) = sqlx::query_as("SELECT COALESCE(SUM(size_bytes), 0) FROM files")
            .fetch_one(self.pool)
            .await?;

        Ok(used)
    }

    /// Number of records.
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM files")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}
