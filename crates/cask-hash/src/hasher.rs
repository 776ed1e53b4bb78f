use md5::{Digest as _, Md5};
use sha2::Sha256;

use cask_types::{HashAlgorithm, ObjectId};

/// Incremental content digest, dispatching on the store's [`HashAlgorithm`].
///
/// Both algorithms stream: feed bytes with [`update`](Self::update) as they
/// pass through, then take the identifier with
/// [`finalize`](Self::finalize). [`current_id`](Self::current_id) snapshots
/// the digest state without consuming it, which is what the hashing reader
/// uses for its "digest of all bytes consumed so far" query.
#[derive(Clone)]
pub struct ContentHasher {
    inner: Inner,
}

#[derive(Clone)]
enum Inner {
    Md5(Md5),
    Sha256(Sha256),
}

impl ContentHasher {
    /// Create a fresh hasher for the given algorithm.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let inner = match algorithm {
            HashAlgorithm::Md5 => Inner::Md5(Md5::new()),
            HashAlgorithm::Sha256 => Inner::Sha256(Sha256::new()),
        };
        Self { inner }
    }

    /// The algorithm this hasher computes.
    pub fn algorithm(&self) -> HashAlgorithm {
        match self.inner {
            Inner::Md5(_) => HashAlgorithm::Md5,
            Inner::Sha256(_) => HashAlgorithm::Sha256,
        }
    }

    /// Feed a chunk of bytes into the digest.
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.inner {
            Inner::Md5(h) => h.update(data),
            Inner::Sha256(h) => h.update(data),
        }
    }

    /// Consume the hasher and return the identifier of everything fed so far.
    pub fn finalize(self) -> ObjectId {
        let algorithm = self.algorithm();
        let digest = match self.inner {
            Inner::Md5(h) => h.finalize().to_vec(),
            Inner::Sha256(h) => h.finalize().to_vec(),
        };
        ObjectId::from_digest(&digest, algorithm)
            .expect("digest width always matches its algorithm")
    }

    /// Identifier of the bytes fed so far, without ending the stream.
    pub fn current_id(&self) -> ObjectId {
        self.clone().finalize()
    }

    /// One-shot digest of a byte slice.
    pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> ObjectId {
        let mut hasher = Self::new(algorithm);
        hasher.update(data);
        hasher.finalize()
    }
}

impl std::fmt::Debug for ContentHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentHasher")
            .field("algorithm", &self.algorithm())
            .finish()
    }
}
