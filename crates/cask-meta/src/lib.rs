//! Append-only metadata history for Cask objects.
//!
//! Every write creates one immutable *dataset* row (who wrote, when, for
//! which object) plus one *metadata* row per property. Nothing is ever
//! updated or deleted; "current value" queries resolve to the entry whose
//! owning dataset has the most recent timestamp (ties broken by the higher
//! dataset id).
//!
//! The backing store is a small two-table SQLite schema accessed through one
//! connection per open store. Write atomicity comes from SQLite transactions,
//! so several processes may share the same database file.
//!
//! Property values are arbitrary JSON ([`serde_json::Value`]), serialized to
//! text on write and parsed back on read — round-trip fidelity is exactly
//! what JSON preserves.

pub mod error;
pub mod names;
pub mod records;
pub mod store;

pub use error::{MetaError, MetaResult};
pub use names::{normalize_property_name, MAX_PROPERTY_LEN};
pub use records::{DatasetRecord, MetadataRecord};
pub use store::{MetadataStore, SqliteMetadataStore};
