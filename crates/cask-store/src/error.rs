use cask_hash::HashError;
use cask_types::{IdError, ObjectId};

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Malformed object identifier, rejected before any filesystem access.
    #[error("invalid object id: {0}")]
    InvalidId(#[from] IdError),

    /// No blob exists for a well-formed identifier.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// Digest of the stored bytes does not match the requested identifier.
    #[error("integrity check failed: expected {expected}, computed {computed}")]
    Integrity {
        expected: ObjectId,
        computed: ObjectId,
    },

    /// Lifecycle-order violation (e.g. digest taken from a non-hashing reader).
    #[error("invalid state: {0}")]
    State(&'static str),

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<HashError> for StoreError {
    fn from(err: HashError) -> Self {
        match err {
            HashError::Integrity { expected, computed } => Self::Integrity { expected, computed },
            HashError::Io(err) => Self::Io(err),
            HashError::NotHashing => Self::State("reader was not configured to hash"),
        }
    }
}

/// Result alias for blob store operations.
pub type StoreResult<T> = Result<T, StoreError>;
