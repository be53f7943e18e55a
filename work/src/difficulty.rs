//! Leading-zero difficulty.
//!
//! Difficulty is the number of leading `'0'` hex digits a block hash must carry.
//! Each digit multiplies the expected search effort by 16.

/// Whether `hash` starts with at least `difficulty` zero hex digits.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let needed = difficulty as usize;
    hash.len() >= needed && hash.bytes().take(needed).all(|b| b == b'0')
}

/// Expected number of hash attempts to satisfy `difficulty` (16^difficulty).
///
/// Saturates at `u64::MAX` for difficulties above 15.
pub fn expected_attempts(difficulty: u32) -> u64 {
    16u64.checked_pow(difficulty).unwrap_or(u64::MAX)
}
