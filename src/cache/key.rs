//! Content fingerprinting for cache lookup.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 hex fingerprint of a source text.
///
/// Equal texts always produce equal hashes, so this is the exact-match lookup
/// key for cached generations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn of(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let hex: String = hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect();
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContentHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContentHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(ContentHash::of("hello"), ContentHash::of("hello"));
    }

    #[test]
    fn test_hash_differs_on_any_change() {
        assert_ne!(ContentHash::of("hello"), ContentHash::of("hello "));
        assert_ne!(ContentHash::of("hello"), ContentHash::of("Hello"));
    }

    #[test]
    fn test_hash_is_lower_hex_sha256() {
        let h = ContentHash::of("abc");
        // Known SHA-256 of "abc"
        assert_eq!(
            h.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(h.as_str().len(), 64);
    }

    #[test]
    fn test_hash_of_empty_text() {
        assert_eq!(
            ContentHash::of("").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
