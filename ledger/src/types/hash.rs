//! Strongly-typed 256-bit hash wrapper and canonical-bytes hashing.
//!
//! Backed by SHA-256 (see DESIGN.md for why this diverges from a
//! BLAKE3-based hash newtype elsewhere in the workspace).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length in bytes of all 256-bit hashes used in this crate.
pub const HASH_LEN: usize = 32;

/// Strongly-typed 256-bit hash wrapper (SHA-256).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// The all-zero hash used as genesis's `previous_hash`.
    pub const ZERO: Hash256 = Hash256([0u8; HASH_LEN]);

    /// Computes a SHA-256 digest of `data`.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let digest = hasher.finalize();
        let mut bytes = [0u8; HASH_LEN];
        bytes.copy_from_slice(&digest);
        Hash256(bytes)
    }

    /// Returns the underlying bytes as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Lowercase hex encoding, used in canonical bytes and diagnostics.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_is_deterministic() {
        let a = Hash256::compute(b"hello ledger");
        let b = Hash256::compute(b"hello ledger");
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn distinct_inputs_hash_differently() {
        let a = Hash256::compute(b"alice");
        let b = Hash256::compute(b"bob");
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn hex_roundtrips_lowercase() {
        let h = Hash256([0xABu8; HASH_LEN]);
        let hex_str = h.to_hex();
        assert_eq!(hex_str.len(), HASH_LEN * 2);
        assert!(hex_str.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn zero_hash_is_all_zero_bytes() {
        assert_eq!(Hash256::ZERO.as_bytes(), &[0u8; HASH_LEN]);
    }
}
