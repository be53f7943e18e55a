//! Ledger parameters injected into the block sealer.

use serde::{Deserialize, Serialize};

/// Parameters that shape how votes are sealed into blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerParams {
    /// Required number of leading zero hex digits in a sealed block's hash.
    pub difficulty: u32,
    /// Pool size at which sealing is triggered.
    pub batch_size: usize,
}

impl LedgerParams {
    /// Largest meaningful difficulty: a SHA-256 hex digest has 64 digits.
    pub const MAX_DIFFICULTY: u32 = 64;

    /// Reference configuration: difficulty 4, batches of 10 votes.
    pub fn reference() -> Self {
        Self {
            difficulty: 4,
            batch_size: 10,
        }
    }

    /// Cheap sealing for local development and tests.
    pub fn dev() -> Self {
        Self {
            difficulty: 1,
            batch_size: 10,
        }
    }
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self::reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_values() {
        let p = LedgerParams::default();
        assert_eq!(p.difficulty, 4);
        assert_eq!(p.batch_size, 10);
    }

    #[test]
    fn dev_keeps_batch_size() {
        assert_eq!(LedgerParams::dev().batch_size, LedgerParams::reference().batch_size);
        assert!(LedgerParams::dev().difficulty < LedgerParams::reference().difficulty);
    }
}
