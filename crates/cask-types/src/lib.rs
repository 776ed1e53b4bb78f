//! Foundation types for the Cask storage engine.
//!
//! This crate provides the identifier and configuration types shared by every
//! other Cask crate.
//!
//! # Key Types
//!
//! - [`HashAlgorithm`] — per-store digest algorithm selection (MD5 or SHA-256)
//! - [`ObjectId`] — content-addressed identifier: the fixed-width lowercase
//!   hex digest of an object's complete byte content
//! - [`IdError`] — rejection of malformed identifiers before any I/O happens

pub mod algorithm;
pub mod error;
pub mod object_id;

pub use algorithm::HashAlgorithm;
pub use error::IdError;
pub use object_id::ObjectId;
