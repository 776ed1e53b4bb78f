//! Streaming digest computation for the Cask storage engine.
//!
//! The central abstraction is the [`HashingReader`]: a pull-based chunk
//! interface over an arbitrary byte source that transparently feeds every
//! consumed byte through a digest accumulator and a running size counter.
//! Both the file store's ingestion path and its integrity-checked read path
//! are built on it.
//!
//! Three source shapes are supported uniformly through [`ByteSource`]:
//!
//! - an already-open readable handle (any `AsyncRead`, including stdin)
//! - a raw in-memory byte buffer
//! - a generic iterator of byte chunks
//!
//! Hashing is applied lazily per chunk, never by buffering the whole source,
//! so arbitrarily large objects are digested in constant memory relative to
//! the chosen chunk size.

pub mod error;
pub mod hasher;
pub mod reader;

pub use error::{HashError, HashResult};
pub use hasher::ContentHasher;
pub use reader::{ByteSource, HashingReader, DEFAULT_CHUNK_SIZE};
