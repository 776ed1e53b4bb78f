use cask_meta::MetaError;
use cask_store::StoreError;

/// Errors from the combined storage facade.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Error from the blob store component.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Error from the metadata store component.
    #[error(transparent)]
    Metadata(#[from] MetaError),

    /// I/O error outside either component (e.g. opening a source file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for facade operations.
pub type StorageResult<T> = Result<T, StorageError>;
