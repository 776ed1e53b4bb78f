use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::fs;
use tracing::info;

use cask_hash::{ByteSource, HashingReader};
use cask_meta::{MetadataRecord, MetadataStore, SqliteMetadataStore};
use cask_store::{FileStore, FileStoreConfig, LocalFileStore};
use cask_types::ObjectId;

use crate::config::StorageConfig;
use crate::error::StorageResult;

/// Combined blob + metadata storage behind one lifecycle.
///
/// Opening acquires both components in order (blob directory, then database
/// connection); [`close`](Self::close) releases them in reverse. `close`
/// consumes the facade, so a closed store cannot be used again by
/// construction.
pub struct Storage {
    files: LocalFileStore,
    metadata: SqliteMetadataStore,
}

impl Storage {
    /// Open both stores under `config.root`, creating them as needed.
    pub async fn open(config: StorageConfig) -> StorageResult<Self> {
        let files = LocalFileStore::open(
            FileStoreConfig::new(config.root.join("files"))
                .algorithm(config.algorithm)
                .shard_len(config.shard_len),
        )
        .await?;
        let metadata = SqliteMetadataStore::open(
            config.root.join("metadata.sqlite3"),
            config.resolved_user(),
        )
        .await?;
        Ok(Self { files, metadata })
    }

    /// Release both components, metadata first (reverse of acquisition).
    pub async fn close(self) {
        self.metadata.close().await;
        drop(self.files);
    }

    /// Direct access to the blob store component.
    pub fn files(&self) -> &LocalFileStore {
        &self.files
    }

    /// Direct access to the metadata store component.
    pub fn metadata(&self) -> &SqliteMetadataStore {
        &self.metadata
    }

    // ---- Blob pass-throughs ----

    /// Ingest a byte stream; returns its content-addressed identifier.
    pub async fn put_file(&self, source: ByteSource) -> StorageResult<ObjectId> {
        Ok(self.files.put(source).await?)
    }

    /// Open a readable stream over a stored blob.
    pub async fn get_file(
        &self,
        id: &ObjectId,
        check_integrity: bool,
    ) -> StorageResult<HashingReader> {
        Ok(self.files.get(id, check_integrity).await?)
    }

    /// Whether a blob exists for `id`.
    pub async fn contains_file(&self, id: &ObjectId) -> StorageResult<bool> {
        Ok(self.files.contains(id).await?)
    }

    // ---- Metadata pass-throughs ----

    /// Record one metadata-writing event for `id`; returns the dataset id.
    pub async fn set_metadata(
        &self,
        id: &ObjectId,
        properties: BTreeMap<String, Value>,
        user: Option<&str>,
        timestamp_utc: Option<DateTime<Utc>>,
    ) -> StorageResult<i64> {
        Ok(self.metadata.set(id, properties, user, timestamp_utc).await?)
    }

    /// Current value for one property of `id`.
    pub async fn get_metadata(&self, id: &ObjectId, identifier: &str) -> StorageResult<Value> {
        Ok(self.metadata.get(id, identifier).await?)
    }

    /// Current value for every property recorded for `id`.
    pub async fn get_all_metadata(&self, id: &ObjectId) -> StorageResult<BTreeMap<String, Value>> {
        Ok(self.metadata.get_all(id).await?)
    }

    /// Full append-only metadata history for `id`.
    pub async fn get_all_metadata_extended(
        &self,
        id: &ObjectId,
    ) -> StorageResult<Vec<MetadataRecord>> {
        Ok(self.metadata.get_all_extended(id).await?)
    }

    // ---- Derived convenience ----

    /// Ingest a local file and record its descriptive metadata.
    ///
    /// Stores the file's bytes, then tags the resulting identifier with
    /// `file_name`, `file_extension`, `file_uri`, and `file_path`, attributed
    /// to the acting process user. This is the only operation that derives
    /// metadata from context; everything else must be supplied explicitly.
    pub async fn add_file_by_path(&self, path: impl AsRef<Path>) -> StorageResult<ObjectId> {
        let path = fs::canonicalize(path.as_ref()).await?;
        let file = fs::File::open(&path).await?;
        let id = self.files.put(file.into()).await?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        let properties = BTreeMap::from([
            ("file_name".to_string(), json!(file_name)),
            ("file_extension".to_string(), json!(file_extension)),
            ("file_uri".to_string(), json!(path_to_file_uri(&path))),
            ("file_path".to_string(), json!(path.to_string_lossy())),
        ]);
        self.metadata.set(&id, properties, None, None).await?;

        info!(id = %id, path = %path.display(), "added file with derived metadata");
        Ok(id)
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("files", &self.files)
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// `file://` URI for an absolute local path.
fn path_to_file_uri(path: &Path) -> String {
    let mut normalized = path.to_string_lossy().replace('\\', "/");
    if !normalized.starts_with('/') {
        // Windows drive paths need the extra leading slash.
        normalized.insert(0, '/');
    }
    format!("file://{normalized}")
}
