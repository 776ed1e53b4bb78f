use cask_types::ObjectId;

/// Errors from hashing and hashing-reader operations.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// A digest was requested from a reader that was not configured to hash.
    #[error("no digest available: reader was not configured to hash")]
    NotHashing,

    /// The digest computed over the drained stream does not match the
    /// expected identifier.
    #[error("integrity check failed: expected {expected}, computed {computed}")]
    Integrity {
        expected: ObjectId,
        computed: ObjectId,
    },

    /// I/O failure in the underlying byte source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for hashing operations.
pub type HashResult<T> = Result<T, HashError>;
