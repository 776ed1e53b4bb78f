use chrono::{DateTime, Utc};

use cask_types::{IdError, ObjectId};

/// Errors from metadata store operations.
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    /// Malformed object identifier, rejected before touching the database.
    #[error("invalid object id: {0}")]
    InvalidId(#[from] IdError),

    /// No metadata recorded for the identifier / property pair.
    #[error("no metadata for object {id}{}", .identifier.as_deref().map(|i| format!(", property {i:?}")).unwrap_or_default())]
    NotFound {
        id: ObjectId,
        identifier: Option<String>,
    },

    /// A property name that is empty or out of bounds after normalization.
    #[error("invalid property name {name:?}: {reason}")]
    InvalidProperty { name: String, reason: String },

    /// Two properties in one `set` call collapsed to the same identifier.
    #[error("duplicate property in set call: {0:?}")]
    DuplicateProperty(String),

    /// A second write for the same object at the exact same timestamp.
    #[error("duplicate dataset for object {id} at {timestamp_utc}")]
    DuplicateTimestamp {
        id: ObjectId,
        timestamp_utc: DateTime<Utc>,
    },

    /// Error from the backing relational store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A value failed to serialize to (or parse from) JSON text.
    #[error("value serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for metadata operations.
pub type MetaResult<T> = Result<T, MetaError>;
