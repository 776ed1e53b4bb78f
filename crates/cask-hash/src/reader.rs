use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use cask_types::{HashAlgorithm, ObjectId};

use crate::error::{HashError, HashResult};
use crate::hasher::ContentHasher;

/// Default pull size for callers that have no reason to pick one (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 20;

/// A byte source behind the hashing reader's pull interface.
///
/// The three supported shapes — an open readable handle, a raw buffer, and a
/// generic chunk iterator — are wrapped into the same interface before any
/// hashing happens, so consumers never branch on where the bytes come from.
pub enum ByteSource {
    /// Any open async readable handle (a file, stdin, a network stream).
    Reader(Box<dyn AsyncRead + Send + Unpin>),
    /// An in-memory byte buffer, consumed front to back.
    Buffer(Bytes),
    /// An iterator producing byte chunks of arbitrary sizes.
    Chunks(Box<dyn Iterator<Item = Bytes> + Send>),
}

impl From<tokio::fs::File> for ByteSource {
    fn from(file: tokio::fs::File) -> Self {
        Self::Reader(Box::new(file))
    }
}

impl From<Bytes> for ByteSource {
    fn from(data: Bytes) -> Self {
        Self::Buffer(data)
    }
}

impl From<Vec<u8>> for ByteSource {
    fn from(data: Vec<u8>) -> Self {
        Self::Buffer(Bytes::from(data))
    }
}

impl From<&[u8]> for ByteSource {
    fn from(data: &[u8]) -> Self {
        Self::Buffer(Bytes::copy_from_slice(data))
    }
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reader(_) => f.write_str("ByteSource::Reader"),
            Self::Buffer(b) => write!(f, "ByteSource::Buffer({} bytes)", b.len()),
            Self::Chunks(_) => f.write_str("ByteSource::Chunks"),
        }
    }
}

/// Pull-based chunk reader that digests every byte it hands out.
///
/// Wraps a [`ByteSource`] and exposes the bytes to the consumer exactly once
/// via [`next_chunk`](Self::next_chunk). Consumed bytes are fed into the
/// digest accumulator and a running byte counter before they are returned.
///
/// If an expected identifier was supplied at construction, reaching the end
/// of the stream triggers a single comparison against the computed digest;
/// a mismatch surfaces as [`HashError::Integrity`]. Verification is
/// streaming by design: corruption is only detectable once the stream has
/// been fully drained.
pub struct HashingReader {
    source: ByteSource,
    hasher: Option<ContentHasher>,
    expected: Option<ObjectId>,
    size: u64,
    max_bytes: Option<u64>,
    /// Carry-over buffer for chunk-iterator sources whose chunk sizes do not
    /// line up with the consumer's pull size.
    pending: BytesMut,
    done: bool,
}

impl HashingReader {
    /// Plain pass-through reader; no digest is computed.
    pub fn new(source: impl Into<ByteSource>) -> Self {
        Self::build(source.into(), None, None)
    }

    /// Reader that digests with the given algorithm as bytes flow through.
    pub fn with_algorithm(source: impl Into<ByteSource>, algorithm: HashAlgorithm) -> Self {
        Self::build(source.into(), Some(ContentHasher::new(algorithm)), None)
    }

    /// Reader that verifies the drained stream against `expected`.
    ///
    /// The digest algorithm is implied by the expected identifier.
    pub fn with_expected(source: impl Into<ByteSource>, expected: ObjectId) -> Self {
        let hasher = ContentHasher::new(expected.algorithm());
        Self::build(source.into(), Some(hasher), Some(expected))
    }

    /// Cap the total number of bytes this reader will yield; anything past
    /// the cap is treated as end of stream.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    fn build(source: ByteSource, hasher: Option<ContentHasher>, expected: Option<ObjectId>) -> Self {
        Self {
            source,
            hasher,
            expected,
            size: 0,
            max_bytes: None,
            pending: BytesMut::new(),
            done: false,
        }
    }

    /// Pull the next chunk of up to `max_size` bytes.
    ///
    /// Returns `Ok(None)` at end of stream. The final call that detects end
    /// of stream also performs the expected-digest comparison, if one was
    /// configured.
    pub async fn next_chunk(&mut self, max_size: usize) -> HashResult<Option<Bytes>> {
        if self.done {
            return Ok(None);
        }

        let mut budget = max_size.max(1);
        if let Some(cap) = self.max_bytes {
            let remaining = cap.saturating_sub(self.size);
            if remaining == 0 {
                return self.finish().map(|_| None);
            }
            budget = budget.min(remaining as usize);
        }

        let chunk = match &mut self.source {
            ByteSource::Buffer(data) => {
                if data.is_empty() {
                    None
                } else {
                    Some(data.split_to(budget.min(data.len())))
                }
            }
            ByteSource::Reader(reader) => {
                let mut buf = vec![0u8; budget];
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    None
                } else {
                    buf.truncate(n);
                    Some(Bytes::from(buf))
                }
            }
            ByteSource::Chunks(chunks) => {
                while self.pending.len() < budget {
                    match chunks.next() {
                        Some(chunk) => self.pending.extend_from_slice(&chunk),
                        None => break,
                    }
                }
                if self.pending.is_empty() {
                    None
                } else {
                    let take = budget.min(self.pending.len());
                    Some(self.pending.split_to(take).freeze())
                }
            }
        };

        match chunk {
            Some(chunk) => {
                if let Some(hasher) = &mut self.hasher {
                    hasher.update(&chunk);
                }
                self.size += chunk.len() as u64;
                trace!(bytes = chunk.len(), total = self.size, "read chunk");
                Ok(Some(chunk))
            }
            None => self.finish().map(|_| None),
        }
    }

    /// Drain the remainder of the stream into one buffer.
    pub async fn read_to_end(&mut self) -> HashResult<Bytes> {
        let mut out = BytesMut::new();
        while let Some(chunk) = self.next_chunk(DEFAULT_CHUNK_SIZE).await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out.freeze())
    }

    /// Hex digest of all bytes consumed so far.
    ///
    /// Fails with [`HashError::NotHashing`] if this reader was constructed
    /// without a digest algorithm.
    pub fn current_digest(&self) -> HashResult<ObjectId> {
        self.hasher
            .as_ref()
            .map(ContentHasher::current_id)
            .ok_or(HashError::NotHashing)
    }

    /// Running count of bytes consumed.
    pub fn current_size(&self) -> u64 {
        self.size
    }

    /// The digest algorithm in use, if any.
    pub fn algorithm(&self) -> Option<HashAlgorithm> {
        self.hasher.as_ref().map(ContentHasher::algorithm)
    }

    /// Mark end of stream and run the expected-digest comparison once.
    fn finish(&mut self) -> HashResult<()> {
        self.done = true;
        if let Some(expected) = self.expected.take() {
            let computed = self
                .hasher
                .as_ref()
                .map(ContentHasher::current_id)
                .ok_or(HashError::NotHashing)?;
            if computed != expected {
                return Err(HashError::Integrity { expected, computed });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for HashingReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashingReader")
            .field("source", &self.source)
            .field("algorithm", &self.algorithm())
            .field("size", &self.size)
            .field("done", &self.done)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::ContentHasher;

    fn md5_of(data: &[u8]) -> ObjectId {
        ContentHasher::hash_bytes(HashAlgorithm::Md5, data)
    }

    // -----------------------------------------------------------------------
    // Source shapes
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn buffer_source_roundtrip() {
        let mut reader = HashingReader::with_algorithm(&b"hello world"[..], HashAlgorithm::Md5);
        let mut collected = Vec::new();
        while let Some(chunk) = reader.next_chunk(2).await.unwrap() {
            assert!(chunk.len() <= 2);
            collected.extend_from_slice(&chunk);
        }
        assert_eq!(collected, b"hello world");
        assert_eq!(reader.current_size(), 11);
        assert_eq!(
            reader.current_digest().unwrap().as_str(),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
    }

    #[tokio::test]
    async fn file_source_matches_buffer_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let content = vec![0x5au8; 40 * 1024];
        tokio::fs::write(&path, &content).await.unwrap();

        let file = tokio::fs::File::open(&path).await.unwrap();
        let mut reader = HashingReader::with_algorithm(file, HashAlgorithm::Sha256);
        let drained = reader.read_to_end().await.unwrap();

        assert_eq!(drained.as_ref(), content.as_slice());
        assert_eq!(
            reader.current_digest().unwrap(),
            ContentHasher::hash_bytes(HashAlgorithm::Sha256, &content)
        );
    }

    #[tokio::test]
    async fn chunk_iterator_source_reassembles() {
        let chunks: Vec<Bytes> = vec![
            Bytes::from_static(b"he"),
            Bytes::from_static(b"llo wo"),
            Bytes::from_static(b"rld"),
        ];
        let source = ByteSource::Chunks(Box::new(chunks.into_iter()));
        let mut reader = HashingReader::with_algorithm(source, HashAlgorithm::Md5);

        let mut collected = Vec::new();
        while let Some(chunk) = reader.next_chunk(4).await.unwrap() {
            assert!(chunk.len() <= 4);
            collected.extend_from_slice(&chunk);
        }
        assert_eq!(collected, b"hello world");
        assert_eq!(reader.current_digest().unwrap(), md5_of(b"hello world"));
    }

    // -----------------------------------------------------------------------
    // Counters, caps, state
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn max_bytes_caps_the_stream() {
        let mut reader =
            HashingReader::with_algorithm(&b"hello world"[..], HashAlgorithm::Md5).with_max_bytes(5);
        let drained = reader.read_to_end().await.unwrap();
        assert_eq!(drained.as_ref(), b"hello");
        assert_eq!(reader.current_size(), 5);
        assert_eq!(reader.current_digest().unwrap(), md5_of(b"hello"));
    }

    #[tokio::test]
    async fn digest_without_hashing_is_a_state_error() {
        let mut reader = HashingReader::new(&b"data"[..]);
        assert!(matches!(
            reader.current_digest(),
            Err(HashError::NotHashing)
        ));
        // The stream itself still works.
        let drained = reader.read_to_end().await.unwrap();
        assert_eq!(drained.as_ref(), b"data");
    }

    #[tokio::test]
    async fn next_chunk_after_end_keeps_returning_none() {
        let mut reader = HashingReader::with_algorithm(&b"x"[..], HashAlgorithm::Md5);
        assert!(reader.next_chunk(16).await.unwrap().is_some());
        assert!(reader.next_chunk(16).await.unwrap().is_none());
        assert!(reader.next_chunk(16).await.unwrap().is_none());
    }

    // -----------------------------------------------------------------------
    // Integrity verification
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn matching_expected_digest_passes_on_drain() {
        let expected = md5_of(b"hello world");
        let mut reader = HashingReader::with_expected(&b"hello world"[..], expected);
        assert!(reader.read_to_end().await.is_ok());
    }

    #[tokio::test]
    async fn mismatched_expected_digest_fails_only_at_end_of_stream() {
        let expected = md5_of(b"something else");
        let mut reader = HashingReader::with_expected(&b"hello world"[..], expected.clone());

        // Chunks before the end are handed out without complaint.
        let first = reader.next_chunk(5).await.unwrap();
        assert_eq!(first.unwrap().as_ref(), b"hello");

        let err = loop {
            match reader.next_chunk(5).await {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("corrupt stream drained without error"),
                Err(err) => break err,
            }
        };
        match err {
            HashError::Integrity {
                expected: e,
                computed,
            } => {
                assert_eq!(e, expected);
                assert_eq!(computed, md5_of(b"hello world"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // -----------------------------------------------------------------------
    // Property tests
    // -----------------------------------------------------------------------

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn chunked_digest_matches_one_shot(
                content in prop::collection::vec(any::<u8>(), 0..4096),
                chunk_size in 1usize..512,
            ) {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .build()
                    .unwrap();
                rt.block_on(async {
                    let mut reader = HashingReader::with_algorithm(
                        content.as_slice(),
                        HashAlgorithm::Sha256,
                    );
                    let mut collected = Vec::new();
                    while let Some(chunk) = reader.next_chunk(chunk_size).await.unwrap() {
                        collected.extend_from_slice(&chunk);
                    }
                    prop_assert_eq!(&collected, &content);
                    prop_assert_eq!(
                        reader.current_digest().unwrap(),
                        ContentHasher::hash_bytes(HashAlgorithm::Sha256, &content)
                    );
                    prop_assert_eq!(reader.current_size(), content.len() as u64);
                    Ok(())
                })?;
            }
        }
    }
}
