use thiserror::Error;

use crate::algorithm::HashAlgorithm;

/// Rejection of a malformed object identifier.
///
/// Raised before any filesystem or database access is attempted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("invalid identifier length: expected {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("no supported algorithm produces a {0}-character identifier")]
    AmbiguousLength(usize),

    #[error("invalid identifier character {ch:?} at position {position}")]
    InvalidCharacter { ch: char, position: usize },

    #[error("identifier algorithm mismatch: store uses {expected}, id is {actual}")]
    AlgorithmMismatch {
        expected: HashAlgorithm,
        actual: HashAlgorithm,
    },

    #[error("unknown hash algorithm: {0:?}")]
    UnknownAlgorithm(String),
}
