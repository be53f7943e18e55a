//! PoW validation.

use evote_crypto::sha256_hex_multi;

use crate::meets_difficulty;

/// Hash of `preimage` followed by the decimal rendering of `nonce`.
pub fn work_hash(preimage: &[u8], nonce: u64) -> String {
    sha256_hex_multi(&[preimage, nonce.to_string().as_bytes()])
}

/// Validate that `nonce` seals `preimage` at `difficulty`.
pub fn validate_work(preimage: &[u8], nonce: u64, difficulty: u32) -> bool {
    meets_difficulty(&work_hash(preimage, nonce), difficulty)
}
