//! The node's single chain instance, shared by readers and the sealer.
//!
//! Reads take a read lock and never observe a block mid-append. The sealer is
//! the only writer. Once corruption has been detected the latch stays set for
//! the life of the process and every append is refused.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use evote_ledger::{Block, Chain, LedgerError};
use evote_types::BlockHash;

use crate::SealError;

pub struct LedgerState {
    chain: RwLock<Chain>,
    corrupted: AtomicBool,
}

impl LedgerState {
    /// Wrap a chain, validating it first. An invalid chain starts latched.
    pub fn new(chain: Chain) -> Self {
        let corrupted = match chain.first_invalid() {
            None => false,
            Some(e) => {
                tracing::error!(error = %e, blocks = chain.len(), "loaded chain failed validation");
                true
            }
        };
        Self {
            chain: RwLock::new(chain),
            corrupted: AtomicBool::new(corrupted),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Chain> {
        self.chain.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of blocks, which is also the index of the next block.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Index and hash the next block must build on.
    pub fn head(&self) -> (u64, BlockHash) {
        let chain = self.read();
        (chain.next_index(), chain.latest().hash.clone())
    }

    pub fn is_corrupted(&self) -> bool {
        self.corrupted.load(Ordering::Acquire)
    }

    /// Latch the corrupted flag. Returns true if this call set it.
    pub fn mark_corrupted(&self) -> bool {
        !self.corrupted.swap(true, Ordering::AcqRel)
    }

    /// Append a sealed block unless the chain is latched corrupted.
    pub fn append(&self, block: Block) -> Result<(), SealError> {
        self.append_with(block, |_| {})
    }

    /// Append a sealed block, then run `on_commit` on it before the write lock
    /// is released. Readers never see the block without the effects of `on_commit`.
    pub fn append_with<F>(&self, block: Block, on_commit: F) -> Result<(), SealError>
    where
        F: FnOnce(&Block),
    {
        if self.is_corrupted() {
            return Err(SealError::ChainCorruption);
        }
        let mut chain = self.chain.write().unwrap_or_else(PoisonError::into_inner);
        chain
            .append(block)
            .map_err(|e: LedgerError| SealError::SealerInternal(e.to_string()))?;
        on_commit(chain.latest());
        Ok(())
    }

    /// Run `f` with every reader and the sealer shut out.
    pub fn exclusive<R>(&self, f: impl FnOnce(&Chain) -> R) -> R {
        let chain = self.chain.write().unwrap_or_else(PoisonError::into_inner);
        f(&chain)
    }

    /// Full validation. Returns the first failure, if any.
    pub fn validate(&self) -> Result<(), LedgerError> {
        match self.read().first_invalid() {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evote_types::Timestamp;

    #[test]
    fn fresh_chain_is_not_corrupted() {
        let state = LedgerState::new(Chain::new(1, Timestamp::from_millis(1)).unwrap());
        assert!(!state.is_corrupted());
        assert_eq!(state.len(), 1);
        assert_eq!(state.head().0, 1);
        assert!(state.validate().is_ok());
    }

    #[test]
    fn corrupted_chain_refuses_appends() {
        let mut genesis = Chain::new(1, Timestamp::from_millis(1)).unwrap().into_blocks();
        genesis[0].timestamp = Timestamp::from_millis(2);
        let state = LedgerState::new(Chain::from_blocks(genesis, 1).unwrap());
        assert!(state.is_corrupted());

        let (index, previous_hash) = state.head();
        let block = Block {
            index,
            timestamp: Timestamp::from_millis(3),
            votes: Vec::new(),
            previous_hash,
            nonce: 0,
            hash: BlockHash::new(""),
        };
        assert!(matches!(state.append(block), Err(SealError::ChainCorruption)));
    }

    #[test]
    fn latch_reports_first_setter() {
        let state = LedgerState::new(Chain::new(1, Timestamp::from_millis(1)).unwrap());
        assert!(state.mark_corrupted());
        assert!(!state.mark_corrupted());
        assert!(state.is_corrupted());
    }

    #[test]
    fn commit_hook_runs_under_write_lock() {
        let state = LedgerState::new(Chain::new(0, Timestamp::from_millis(1)).unwrap());
        let (index, previous_hash) = state.head();
        let mut block = Block {
            index,
            timestamp: Timestamp::from_millis(3),
            votes: vec![evote_ledger::PendingVote {
                voter_id: "v1".into(),
                candidate_id: "c1".into(),
                constituency: "Agra".into(),
                submitted_at: Timestamp::from_millis(2),
                verification_hash: String::new(),
                receipt_id: "VOTE-0000000000000001".into(),
            }],
            previous_hash,
            nonce: 0,
            hash: BlockHash::new(""),
        };
        block.hash = block.compute_hash().unwrap();

        let mut seen = None;
        state
            .append_with(block, |b| {
                assert!(state.chain.try_read().is_err());
                seen = Some(b.index);
            })
            .unwrap();
        assert_eq!(seen, Some(1));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn exclusive_blocks_readers() {
        let state = LedgerState::new(Chain::new(1, Timestamp::from_millis(1)).unwrap());
        let len = state.exclusive(|chain| {
            assert!(state.chain.try_read().is_err());
            chain.len()
        });
        assert_eq!(len, 1);
        assert!(state.chain.try_read().is_ok());
    }
}
