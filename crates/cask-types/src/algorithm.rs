use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IdError;

/// Digest algorithm used to derive object identifiers.
///
/// The algorithm is fixed per store instance: every identifier a store
/// produces or accepts has the width implied by this choice, so 32- and
/// 64-character ids can never be confused within one store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// MD5, 128-bit digest, 32 hex characters. Kept for compatibility with
    /// stores created by the original tooling; not collision-resistant.
    Md5,
    /// SHA-256, 256-bit digest, 64 hex characters. The default.
    #[default]
    Sha256,
}

impl HashAlgorithm {
    /// Digest width in raw bytes.
    pub const fn digest_len(&self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha256 => 32,
        }
    }

    /// Identifier width in hex characters.
    pub const fn hex_len(&self) -> usize {
        self.digest_len() * 2
    }

    /// Canonical lowercase name ("md5" / "sha256").
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }

    /// Infer the algorithm from an identifier's character count.
    pub const fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            32 => Some(Self::Md5),
            64 => Some(Self::Sha256),
            _ => None,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            other => Err(IdError::UnknownAlgorithm(other.to_string())),
        }
    }
}
