//! Block hash type for the vote chain.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A block hash rendered as lower-case hex (SHA-256, 64 digits).
///
/// The genesis block's `previous_hash` is the literal `"0"`, which is why this
/// is a string newtype rather than a fixed byte array.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHash(String);

impl BlockHash {
    /// Parent hash recorded by the genesis block.
    pub const GENESIS_PARENT: &'static str = "0";

    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The `"0"` parent of the genesis block.
    pub fn genesis_parent() -> Self {
        Self(Self::GENESIS_PARENT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `len` hex digits, used for display in receipts and stats.
    pub fn prefix(&self, len: usize) -> &str {
        let end = self.0.len().min(len);
        &self.0[..end]
    }

    /// Number of leading `'0'` hex digits.
    pub fn leading_zero_digits(&self) -> usize {
        self.0.bytes().take_while(|b| *b == b'0').count()
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({}\u{2026})", self.prefix(8))
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_parent_is_zero() {
        assert_eq!(BlockHash::genesis_parent().as_str(), "0");
    }

    #[test]
    fn prefix_is_bounded() {
        let h = BlockHash::new("abc");
        assert_eq!(h.prefix(16), "abc");
        assert_eq!(h.prefix(2), "ab");
    }

    #[test]
    fn counts_leading_zeros() {
        assert_eq!(BlockHash::new("0000af").leading_zero_digits(), 4);
        assert_eq!(BlockHash::new("f000").leading_zero_digits(), 0);
    }
}
