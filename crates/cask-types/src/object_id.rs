use std::fmt;
use std::str::FromStr;

use crate::algorithm::HashAlgorithm;
use crate::error::IdError;

/// Content-addressed identifier for a stored object.
///
/// An `ObjectId` is the lowercase hex digest of an object's complete byte
/// content, with a fixed width determined by the digest algorithm. Identical
/// bytes always yield the identical identifier; the identifier is computed at
/// ingestion time and never chosen by the caller.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    algorithm: HashAlgorithm,
    hex: String,
}

impl ObjectId {
    /// Parse an identifier that must belong to the given algorithm.
    ///
    /// Uppercase hex input is normalized to lowercase; wrong length or
    /// non-hex characters are rejected without touching any storage.
    pub fn parse(s: &str, algorithm: HashAlgorithm) -> Result<Self, IdError> {
        if s.len() != algorithm.hex_len() {
            return Err(IdError::InvalidLength {
                expected: algorithm.hex_len(),
                actual: s.len(),
            });
        }
        Self::from_validated(s, algorithm)
    }

    /// Parse an identifier, inferring the algorithm from its length
    /// (32 characters → MD5, 64 → SHA-256).
    pub fn infer(s: &str) -> Result<Self, IdError> {
        let algorithm =
            HashAlgorithm::from_hex_len(s.len()).ok_or(IdError::AmbiguousLength(s.len()))?;
        Self::from_validated(s, algorithm)
    }

    /// Build an identifier from a finished raw digest.
    ///
    /// Used by the hashing layer; the byte width must match the algorithm.
    pub fn from_digest(digest: &[u8], algorithm: HashAlgorithm) -> Result<Self, IdError> {
        if digest.len() != algorithm.digest_len() {
            return Err(IdError::InvalidLength {
                expected: algorithm.hex_len(),
                actual: digest.len() * 2,
            });
        }
        Ok(Self {
            algorithm,
            hex: hex::encode(digest),
        })
    }

    fn from_validated(s: &str, algorithm: HashAlgorithm) -> Result<Self, IdError> {
        for (position, ch) in s.chars().enumerate() {
            if !ch.is_ascii_hexdigit() {
                return Err(IdError::InvalidCharacter { ch, position });
            }
        }
        Ok(Self {
            algorithm,
            hex: s.to_ascii_lowercase(),
        })
    }

    /// The algorithm this identifier was derived with.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The full lowercase hex digest.
    pub fn as_str(&self) -> &str {
        &self.hex
    }

    /// Abbreviated form (first 8 characters) for logs and display.
    pub fn short(&self) -> &str {
        &self.hex[..8]
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({}:{})", self.algorithm, self.short())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

impl FromStr for ObjectId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::infer(s)
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.hex
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MD5_HELLO: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";
    const SHA256_EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn parse_valid_md5() {
        let id = ObjectId::parse(MD5_HELLO, HashAlgorithm::Md5).unwrap();
        assert_eq!(id.as_str(), MD5_HELLO);
        assert_eq!(id.algorithm(), HashAlgorithm::Md5);
    }

    #[test]
    fn parse_normalizes_case() {
        let upper = MD5_HELLO.to_ascii_uppercase();
        let id = ObjectId::parse(&upper, HashAlgorithm::Md5).unwrap();
        assert_eq!(id.as_str(), MD5_HELLO);
    }

    #[test]
    fn parse_rejects_wrong_length() {
        let err = ObjectId::parse("abc123", HashAlgorithm::Md5).unwrap_err();
        assert_eq!(
            err,
            IdError::InvalidLength {
                expected: 32,
                actual: 6
            }
        );
    }

    #[test]
    fn parse_rejects_non_hex() {
        let bad = "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz";
        let err = ObjectId::parse(bad, HashAlgorithm::Md5).unwrap_err();
        assert!(matches!(err, IdError::InvalidCharacter { ch: 'z', position: 0 }));
    }

    #[test]
    fn infer_by_length() {
        assert_eq!(
            ObjectId::infer(MD5_HELLO).unwrap().algorithm(),
            HashAlgorithm::Md5
        );
        assert_eq!(
            ObjectId::infer(SHA256_EMPTY).unwrap().algorithm(),
            HashAlgorithm::Sha256
        );
        assert_eq!(
            ObjectId::infer("not-a-valid-hash").unwrap_err(),
            IdError::AmbiguousLength(16)
        );
    }

    #[test]
    fn from_digest_roundtrip() {
        let digest = [0xabu8; 16];
        let id = ObjectId::from_digest(&digest, HashAlgorithm::Md5).unwrap();
        assert_eq!(id.as_str(), "ab".repeat(16));
        assert!(ObjectId::from_digest(&digest, HashAlgorithm::Sha256).is_err());
    }

    #[test]
    fn display_and_debug() {
        let id = ObjectId::infer(MD5_HELLO).unwrap();
        assert_eq!(id.to_string(), MD5_HELLO);
        assert_eq!(format!("{id:?}"), "ObjectId(md5:5eb63bbb)");
    }
}
