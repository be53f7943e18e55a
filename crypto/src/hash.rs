//! SHA-256 hashing rendered as lower-case hex.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of arbitrary data as 64 lower-case hex digits.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn sha256_hex_multi(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

/// A SHA-256 state primed with a fixed prefix.
///
/// Proof-of-work hashes the same block preimage with a different trailing nonce
/// on every attempt; cloning the primed state skips rehashing the prefix.
#[derive(Clone)]
pub struct PrefixHasher {
    primed: Sha256,
}

impl PrefixHasher {
    pub fn new(prefix: &[u8]) -> Self {
        let mut primed = Sha256::new();
        primed.update(prefix);
        Self { primed }
    }

    /// Hash `prefix ++ suffix` as hex.
    pub fn finish_with(&self, suffix: &[u8]) -> String {
        let mut hasher = self.primed.clone();
        hasher.update(suffix);
        hex::encode(hasher.finalize())
    }
}
