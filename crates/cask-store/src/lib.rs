//! Content-addressed blob storage for Cask.
//!
//! Blobs are named by the hex digest of their complete byte content and laid
//! out under a single root directory, optionally sharded into digest-prefix
//! subdirectories to bound directory fan-out. Ingestion streams through the
//! hashing reader into a private temporary file and atomically renames it
//! into place, so a partially written object is never discoverable.
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written; the blob file is marked read-only
//!    at the filesystem level after a successful `put`.
//! 2. A second ingestion of identical bytes is a no-op: the existing blob is
//!    kept, never overwritten, and no error is raised.
//! 3. Writes always go to a temp name first, then rename. A failed rename
//!    cleans up its temp file and propagates the error.
//! 4. Concurrent readers need no locking — a stored blob never changes.
//! 5. Integrity checking on read is streaming: corruption surfaces only once
//!    the returned stream is fully drained.

pub mod error;
pub mod local;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use local::{FileStoreConfig, LocalFileStore, DEFAULT_SHARD_LEN};
pub use traits::FileStore;
