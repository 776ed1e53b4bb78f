use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use cask_hash::{ByteSource, HashingReader, DEFAULT_CHUNK_SIZE};
use cask_types::{HashAlgorithm, IdError, ObjectId};

use crate::error::{StoreError, StoreResult};
use crate::traits::FileStore;

/// Default digest-prefix length for sharding blobs into subdirectories.
pub const DEFAULT_SHARD_LEN: usize = 2;

/// Configuration for a [`LocalFileStore`].
#[derive(Clone, Debug)]
pub struct FileStoreConfig {
    /// Root directory holding the blobs.
    pub root: PathBuf,
    /// Digest algorithm; fixes the identifier width for this store.
    pub algorithm: HashAlgorithm,
    /// Number of leading digest characters used as a subdirectory name.
    /// `0` stores all blobs flat in the root.
    pub shard_len: usize,
}

impl FileStoreConfig {
    /// Configuration with the default algorithm and sharding.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            algorithm: HashAlgorithm::default(),
            shard_len: DEFAULT_SHARD_LEN,
        }
    }

    /// Select the digest algorithm.
    pub fn algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Select the shard prefix length (`0` disables sharding).
    pub fn shard_len(mut self, shard_len: usize) -> Self {
        self.shard_len = shard_len;
        self
    }
}

/// Filesystem-backed content-addressed blob store.
///
/// Each blob lives at `<root>/<prefix>/<digest>` where `<prefix>` is the
/// first [`shard_len`](FileStoreConfig::shard_len) characters of the digest
/// and the filename is the full digest. Ingestion writes to a temp file in
/// the root (same filesystem, so the final rename is atomic) and marks the
/// result read-only.
#[derive(Debug)]
pub struct LocalFileStore {
    root: PathBuf,
    algorithm: HashAlgorithm,
    shard_len: usize,
}

impl LocalFileStore {
    /// Open (or create) a store rooted at `config.root`.
    pub async fn open(config: FileStoreConfig) -> StoreResult<Self> {
        fs::create_dir_all(&config.root).await?;
        debug!(root = %config.root.display(), algorithm = %config.algorithm, "opened file store");
        Ok(Self {
            root: config.root,
            algorithm: config.algorithm,
            shard_len: config.shard_len,
        })
    }

    /// The digest algorithm this store is fixed to.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic on-disk location for an identifier.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.as_str();
        if self.shard_len > 0 && self.shard_len < hex.len() {
            self.root.join(&hex[..self.shard_len]).join(hex)
        } else {
            self.root.join(hex)
        }
    }

    /// Reject identifiers that do not belong to this store's algorithm.
    fn check_id(&self, id: &ObjectId) -> StoreResult<()> {
        if id.algorithm() != self.algorithm {
            return Err(StoreError::InvalidId(IdError::AlgorithmMismatch {
                expected: self.algorithm,
                actual: id.algorithm(),
            }));
        }
        Ok(())
    }

    /// Clear the write bits on a freshly stored blob.
    ///
    /// Content durability does not depend on the permission bit, so failure
    /// here is logged and not fatal.
    async fn make_readonly(&self, path: &Path) {
        let result = async {
            let mut perms = fs::metadata(path).await?.permissions();
            perms.set_readonly(true);
            fs::set_permissions(path, perms).await
        }
        .await;
        if let Err(err) = result {
            warn!(path = %path.display(), error = %err, "failed to mark blob read-only");
        }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put(&self, source: ByteSource) -> StoreResult<ObjectId> {
        let mut reader = HashingReader::with_algorithm(source, self.algorithm);

        // Stream into a temp file next to the final location; dropping the
        // handle on any error path below removes the partial file.
        let temp = NamedTempFile::new_in(&self.root)?;
        let mut out = fs::File::from_std(temp.as_file().try_clone()?);
        while let Some(chunk) = reader.next_chunk(DEFAULT_CHUNK_SIZE).await? {
            out.write_all(&chunk).await?;
        }
        out.flush().await?;
        out.sync_all().await?;

        let id = reader.current_digest()?;
        let size = reader.current_size();
        let target = self.object_path(&id);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        if fs::try_exists(&target).await? {
            debug!(id = %id, size, "blob already stored, dropping duplicate");
            return Ok(id);
        }

        match temp.persist_noclobber(&target) {
            Ok(_) => {}
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                // Lost a same-digest race; the winner's blob is identical.
                debug!(id = %id, size, "blob appeared concurrently, dropping duplicate");
                return Ok(id);
            }
            Err(err) => return Err(StoreError::Io(err.error)),
        }

        self.make_readonly(&target).await;
        info!(id = %id, size, path = %target.display(), "stored blob");
        Ok(id)
    }

    async fn get(&self, id: &ObjectId, check_integrity: bool) -> StoreResult<HashingReader> {
        self.check_id(id)?;
        let path = self.object_path(id);
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.clone()));
            }
            Err(err) => return Err(err.into()),
        };
        let reader = if check_integrity {
            HashingReader::with_expected(file, id.clone())
        } else {
            HashingReader::new(file)
        };
        Ok(reader)
    }

    async fn contains(&self, id: &ObjectId) -> StoreResult<bool> {
        self.check_id(id)?;
        Ok(fs::try_exists(self.object_path(id)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cask_hash::HashError;
    use tempfile::TempDir;

    async fn open_store(dir: &TempDir, algorithm: HashAlgorithm) -> LocalFileStore {
        LocalFileStore::open(FileStoreConfig::new(dir.path().join("files")).algorithm(algorithm))
            .await
            .unwrap()
    }

    fn blob_files(root: &Path) -> Vec<PathBuf> {
        fn walk(dir: &Path, out: &mut Vec<PathBuf>) {
            for entry in std::fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    walk(&path, out);
                } else {
                    out.push(path);
                }
            }
        }
        let mut out = Vec::new();
        walk(root, &mut out);
        out
    }

    // -----------------------------------------------------------------------
    // Determinism and round-trip
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn md5_hello_world_scenario() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, HashAlgorithm::Md5).await;

        let id = store.put(b"hello world".as_slice().into()).await.unwrap();
        assert_eq!(id.as_str(), "5eb63bbbe01eeed093cb22bb8f5acdc3");

        let mut reader = store.get(&id, false).await.unwrap();
        assert_eq!(reader.read_to_end().await.unwrap().as_ref(), b"hello world");
    }

    #[tokio::test]
    async fn put_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, HashAlgorithm::Sha256).await;

        let id1 = store.put(b"same bytes".as_slice().into()).await.unwrap();
        let id2 = store.put(b"same bytes".as_slice().into()).await.unwrap();
        assert_eq!(id1, id2);
    }

    // -----------------------------------------------------------------------
    // Idempotence and immutability
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn repeated_put_leaves_one_blob_on_disk() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, HashAlgorithm::Sha256).await;

        let id = store.put(b"duplicate content".as_slice().into()).await.unwrap();
        store.put(b"duplicate content".as_slice().into()).await.unwrap();
        store.put(b"duplicate content".as_slice().into()).await.unwrap();

        let files = blob_files(store.root());
        assert_eq!(files, vec![store.object_path(&id)]);
    }

    #[tokio::test]
    async fn stored_blob_is_readonly() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, HashAlgorithm::Sha256).await;

        let id = store.put(b"immutable".as_slice().into()).await.unwrap();
        let path = store.object_path(&id);

        let perms = std::fs::metadata(&path).unwrap().permissions();
        assert!(perms.readonly(), "stored blob must carry read-only bits");
    }

    // -----------------------------------------------------------------------
    // Identifier validation and lookup failures
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn get_rejects_foreign_algorithm_ids() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, HashAlgorithm::Sha256).await;

        let md5_id = ObjectId::infer("5eb63bbbe01eeed093cb22bb8f5acdc3").unwrap();
        let err = store.get(&md5_id, false).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidId(IdError::AlgorithmMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, HashAlgorithm::Sha256).await;

        let id = ObjectId::parse(&"0".repeat(64), HashAlgorithm::Sha256).unwrap();
        assert!(matches!(
            store.get(&id, false).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
        assert!(!store.contains(&id).await.unwrap());
    }

    // -----------------------------------------------------------------------
    // Integrity checking
    // -----------------------------------------------------------------------

    fn corrupt_blob(store: &LocalFileStore, id: &ObjectId) {
        let path = store.object_path(id);
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        std::fs::set_permissions(&path, perms).unwrap();
        std::fs::write(&path, b"corrupted payload").unwrap();
    }

    #[tokio::test]
    async fn corrupted_blob_fails_checked_read_at_drain() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, HashAlgorithm::Sha256).await;

        let id = store.put(b"pristine payload".as_slice().into()).await.unwrap();
        corrupt_blob(&store, &id);

        let mut reader = store.get(&id, true).await.unwrap();
        let err = reader.read_to_end().await.unwrap_err();
        assert!(matches!(err, HashError::Integrity { .. }));
    }

    #[tokio::test]
    async fn corrupted_blob_passes_unchecked_read() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, HashAlgorithm::Sha256).await;

        let id = store.put(b"pristine payload".as_slice().into()).await.unwrap();
        corrupt_blob(&store, &id);

        let mut reader = store.get(&id, false).await.unwrap();
        assert_eq!(
            reader.read_to_end().await.unwrap().as_ref(),
            b"corrupted payload"
        );
    }

    // -----------------------------------------------------------------------
    // Layout
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn blobs_are_sharded_by_digest_prefix() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, HashAlgorithm::Md5).await;

        let id = store.put(b"hello world".as_slice().into()).await.unwrap();
        let path = store.object_path(&id);
        assert_eq!(
            path,
            store.root().join("5e").join("5eb63bbbe01eeed093cb22bb8f5acdc3")
        );
        assert!(path.is_file());
    }

    #[tokio::test]
    async fn flat_layout_with_sharding_disabled() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::open(
            FileStoreConfig::new(dir.path().join("files"))
                .algorithm(HashAlgorithm::Md5)
                .shard_len(0),
        )
        .await
        .unwrap();

        let id = store.put(b"hello world".as_slice().into()).await.unwrap();
        assert_eq!(
            store.object_path(&id),
            store.root().join("5eb63bbbe01eeed093cb22bb8f5acdc3")
        );
    }

    #[tokio::test]
    async fn large_streams_hash_in_chunks() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, HashAlgorithm::Sha256).await;

        // Larger than one pull, exercised through the chunk-iterator shape.
        let content = vec![0xa7u8; 3 * DEFAULT_CHUNK_SIZE + 11];
        let chunks: Vec<bytes::Bytes> = content
            .chunks(64 * 1024)
            .map(bytes::Bytes::copy_from_slice)
            .collect();
        let source = ByteSource::Chunks(Box::new(chunks.into_iter()));

        let id = store.put(source).await.unwrap();
        let mut reader = store.get(&id, true).await.unwrap();
        assert_eq!(reader.read_to_end().await.unwrap().len(), content.len());
    }
}
