use std::path::PathBuf;

use cask_store::DEFAULT_SHARD_LEN;
use cask_types::HashAlgorithm;

/// Configuration for a combined [`Storage`](crate::Storage).
///
/// All storage state lives under `root`; there are no implicit process-wide
/// defaults. Construct with [`new`](Self::new) and override fields with the
/// builder methods.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// Directory holding the blob store and the metadata database.
    pub root: PathBuf,
    /// Digest algorithm for object identifiers (fixed per store).
    pub algorithm: HashAlgorithm,
    /// User recorded on metadata writes that name none. `None` resolves to
    /// the acting process user at open time.
    pub default_user: Option<String>,
    /// Digest-prefix length for blob sharding (`0` = flat layout).
    pub shard_len: usize,
}

impl StorageConfig {
    /// Configuration rooted at `root` with default algorithm and sharding.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            algorithm: HashAlgorithm::default(),
            default_user: None,
            shard_len: DEFAULT_SHARD_LEN,
        }
    }

    /// Select the digest algorithm.
    pub fn algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Record this user on metadata writes that name none.
    pub fn default_user(mut self, user: impl Into<String>) -> Self {
        self.default_user = Some(user.into());
        self
    }

    /// Select the blob shard prefix length.
    pub fn shard_len(mut self, shard_len: usize) -> Self {
        self.shard_len = shard_len;
        self
    }

    /// The user to record when none is configured or supplied.
    pub(crate) fn resolved_user(&self) -> String {
        self.default_user.clone().unwrap_or_else(process_user)
    }
}

/// Identity of the acting process user, taken from the environment.
pub fn process_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
