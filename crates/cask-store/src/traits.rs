use async_trait::async_trait;

use cask_hash::{ByteSource, HashingReader};
use cask_types::ObjectId;

use crate::error::StoreResult;

/// Content-addressed blob store.
///
/// All implementations must satisfy these invariants:
/// - The identifier is derived from the content, never chosen by the caller.
/// - Objects are immutable once written; identical bytes always map to the
///   same identifier, so a repeated `put` keeps the existing blob.
/// - Concurrent reads are always safe (objects never change).
/// - The store never interprets blob contents.
/// - All I/O errors are propagated, never silently ignored.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Ingest a byte stream and return its content-addressed identifier.
    ///
    /// Idempotent: if a blob with the same digest already exists it is kept
    /// and the same identifier is returned without error.
    async fn put(&self, source: ByteSource) -> StoreResult<ObjectId>;

    /// Open a readable stream over the blob for `id`.
    ///
    /// Fails with `NotFound` if no blob exists. With `check_integrity` the
    /// returned reader verifies the digest against `id` once the stream is
    /// fully drained; a corrupted blob surfaces there, not up front.
    async fn get(&self, id: &ObjectId, check_integrity: bool) -> StoreResult<HashingReader>;

    /// Check whether a blob exists for `id` without reading its content.
    async fn contains(&self, id: &ObjectId) -> StoreResult<bool>;
}
