//! Combined storage facade for Cask.
//!
//! [`Storage`] pairs a content-addressed blob store with the append-only
//! metadata index behind one open/close lifecycle and one configuration
//! struct. Everything except [`Storage::add_file_by_path`] is a direct
//! pass-through to the underlying component; that one convenience ingests a
//! local file and records its name, extension, URI, and path as metadata in
//! the same call.
//!
//! Layout under the configured root:
//!
//! ```text
//! <root>/
//!   files/              blob store (digest-named, read-only files)
//!   metadata.sqlite3    metadata history database
//! ```

pub mod config;
pub mod error;
pub mod storage;

pub use config::{process_user, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use storage::Storage;
