use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::debug;

use cask_types::ObjectId;

use crate::error::{MetaError, MetaResult};
use crate::names::normalize_property_name;
use crate::records::{DatasetRecord, MetadataRecord};

/// Append-only metadata history keyed by object identifier.
///
/// All implementations must satisfy these invariants:
/// - `set` appends; existing history is never mutated or deleted.
/// - A `set` call is atomic: either the dataset row and every property row
///   land, or none do. Partial writes are not observable.
/// - "Current value" is the entry whose owning dataset has the maximum
///   timestamp for the object, with the higher dataset id breaking ties.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Record one metadata-writing event for `id`.
    ///
    /// `user` defaults to the store's configured default, `timestamp_utc`
    /// to the current UTC time. Property names are normalized; names that
    /// collapse to the same identifier within one call are rejected.
    /// Returns the new dataset id.
    async fn set(
        &self,
        id: &ObjectId,
        properties: BTreeMap<String, Value>,
        user: Option<&str>,
        timestamp_utc: Option<DateTime<Utc>>,
    ) -> MetaResult<i64>;

    /// Current value for one property of `id`.
    ///
    /// Fails with `NotFound` if the pair has no recorded history.
    async fn get(&self, id: &ObjectId, identifier: &str) -> MetaResult<Value>;

    /// Current value for every property ever recorded for `id`.
    ///
    /// An object with no history yields an empty map, not an error.
    async fn get_all(&self, id: &ObjectId) -> MetaResult<BTreeMap<String, Value>>;

    /// The full append-only history for `id`, oldest dataset first.
    async fn get_all_extended(&self, id: &ObjectId) -> MetaResult<Vec<MetadataRecord>>;
}

/// SQLite-backed [`MetadataStore`].
///
/// One pooled connection per open store; WAL journaling and a busy timeout
/// make the database safe to share across processes, and every `set` runs in
/// its own transaction.
pub struct SqliteMetadataStore {
    pool: SqlitePool,
    path: PathBuf,
    default_user: String,
}

impl SqliteMetadataStore {
    /// Open (or create) the database at `path`.
    ///
    /// `default_user` is recorded on datasets whose `set` call does not name
    /// a user explicitly.
    pub async fn open(path: impl AsRef<Path>, default_user: impl Into<String>) -> MetaResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| MetaError::Database(sqlx::Error::Io(err)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Avoid transient "database is locked" errors when several
            // processes share the file.
            .busy_timeout(Duration::from_secs(5));

        // SQLite permits only limited write concurrency; a single pooled
        // connection per open store sidesteps lock churn entirely.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::init_schema(&pool).await?;
        debug!(path = %path.display(), "opened metadata store");

        Ok(Self {
            pool,
            path,
            default_user: default_user.into(),
        })
    }

    async fn init_schema(pool: &SqlitePool) -> MetaResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dataset (
                dataset_id    INTEGER PRIMARY KEY,
                file_id       CHAR(64) NOT NULL,
                user          VARCHAR(128) NOT NULL,
                timestamp_utc DATETIME NOT NULL,
                UNIQUE (file_id, timestamp_utc)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS metadata (
                dataset_id    INTEGER NOT NULL REFERENCES dataset (dataset_id),
                identifier    VARCHAR(128) NOT NULL,
                value_json    TEXT NOT NULL,
                PRIMARY KEY (dataset_id, identifier)
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The user recorded when a `set` call names none.
    pub fn default_user(&self) -> &str {
        &self.default_user
    }

    /// Close the connection pool. Further operations will fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Every metadata-writing event recorded for `id`, oldest first.
    pub async fn datasets(&self, id: &ObjectId) -> MetaResult<Vec<DatasetRecord>> {
        let rows: Vec<(i64, String, String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT dataset_id, file_id, user, timestamp_utc
            FROM dataset
            WHERE file_id = ?
            ORDER BY dataset_id ASC
            "#,
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(dataset_id, file_id, user, timestamp_utc)| {
                Ok(DatasetRecord {
                    dataset_id,
                    file_id: ObjectId::infer(&file_id)?,
                    user,
                    timestamp_utc,
                })
            })
            .collect()
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn set(
        &self,
        id: &ObjectId,
        properties: BTreeMap<String, Value>,
        user: Option<&str>,
        timestamp_utc: Option<DateTime<Utc>>,
    ) -> MetaResult<i64> {
        // Normalize and serialize everything up front so validation errors
        // cannot leave a half-written dataset behind.
        let mut entries = Vec::with_capacity(properties.len());
        let mut seen = BTreeSet::new();
        for (name, value) in &properties {
            let identifier = normalize_property_name(name)?;
            if !seen.insert(identifier.clone()) {
                return Err(MetaError::DuplicateProperty(identifier));
            }
            entries.push((identifier, serde_json::to_string(value)?));
        }

        let user = user.unwrap_or(&self.default_user);
        let timestamp_utc = timestamp_utc.unwrap_or_else(Utc::now);

        let mut tx = self.pool.begin().await?;

        let dataset_id = sqlx::query(
            "INSERT INTO dataset (file_id, user, timestamp_utc) VALUES (?, ?, ?)",
        )
        .bind(id.as_str())
        .bind(user)
        .bind(timestamp_utc)
        .execute(&mut *tx)
        .await
        .map_err(|err| match err.as_database_error() {
            Some(db) if db.is_unique_violation() => MetaError::DuplicateTimestamp {
                id: id.clone(),
                timestamp_utc,
            },
            _ => MetaError::Database(err),
        })?
        .last_insert_rowid();

        for (identifier, value_json) in &entries {
            sqlx::query("INSERT INTO metadata (dataset_id, identifier, value_json) VALUES (?, ?, ?)")
                .bind(dataset_id)
                .bind(identifier)
                .bind(value_json)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(
            id = %id,
            dataset_id,
            properties = entries.len(),
            user,
            "recorded metadata dataset"
        );
        Ok(dataset_id)
    }

    async fn get(&self, id: &ObjectId, identifier: &str) -> MetaResult<Value> {
        let identifier = normalize_property_name(identifier)?;

        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT m.value_json
            FROM metadata m
            JOIN dataset d ON m.dataset_id = d.dataset_id
            WHERE d.file_id = ? AND m.identifier = ?
            ORDER BY d.timestamp_utc DESC, d.dataset_id DESC
            LIMIT 1
            "#,
        )
        .bind(id.as_str())
        .bind(&identifier)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((value_json,)) => Ok(serde_json::from_str(&value_json)?),
            None => Err(MetaError::NotFound {
                id: id.clone(),
                identifier: Some(identifier),
            }),
        }
    }

    async fn get_all(&self, id: &ObjectId) -> MetaResult<BTreeMap<String, Value>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT m.identifier, m.value_json
            FROM metadata m
            JOIN dataset d ON m.dataset_id = d.dataset_id
            WHERE d.file_id = ?
            ORDER BY d.timestamp_utc ASC, d.dataset_id ASC
            "#,
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?;

        // Ascending order lets later datasets overwrite earlier values,
        // leaving exactly the latest value per property.
        let mut latest = BTreeMap::new();
        for (identifier, value_json) in rows {
            latest.insert(identifier, serde_json::from_str(&value_json)?);
        }
        Ok(latest)
    }

    async fn get_all_extended(&self, id: &ObjectId) -> MetaResult<Vec<MetadataRecord>> {
        let rows: Vec<(i64, String, String, String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT d.dataset_id, m.identifier, m.value_json, d.user, d.timestamp_utc
            FROM metadata m
            JOIN dataset d ON m.dataset_id = d.dataset_id
            WHERE d.file_id = ?
            ORDER BY d.dataset_id ASC, m.identifier ASC
            "#,
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(dataset_id, identifier, value_json, user, timestamp_utc)| {
                Ok(MetadataRecord {
                    dataset_id,
                    identifier,
                    value: serde_json::from_str(&value_json)?,
                    user,
                    timestamp_utc,
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for SqliteMetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteMetadataStore")
            .field("path", &self.path)
            .field("default_user", &self.default_user)
            .finish()
    }
}
