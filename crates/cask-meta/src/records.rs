use chrono::{DateTime, Utc};
use serde_json::Value;

use cask_types::ObjectId;

/// One metadata-writing event: who wrote metadata for which object, when.
///
/// Dataset ids increase monotonically; rows are never mutated or deleted.
/// `(file_id, timestamp_utc)` pairs are unique.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetRecord {
    pub dataset_id: i64,
    pub file_id: ObjectId,
    pub user: String,
    pub timestamp_utc: DateTime<Utc>,
}

/// One property/value pair together with its owning dataset's context.
///
/// Returned by extended history queries; the plain `get`/`get_all` surface
/// resolves these down to latest values only.
#[derive(Clone, Debug, PartialEq)]
pub struct MetadataRecord {
    pub dataset_id: i64,
    pub identifier: String,
    pub value: Value,
    pub user: String,
    pub timestamp_utc: DateTime<Utc>,
}
