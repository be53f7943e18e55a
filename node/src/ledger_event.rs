//! Events emitted as votes move through the ledger.

use evote_types::{BlockHash, CandidateId, ReceiptId, VoterId};

/// Ledger-level events that observers can subscribe to via the [`EventBus`].
#[derive(Clone, Debug)]
pub enum LedgerEvent {
    /// A vote was accepted into the pool.
    VoteAccepted {
        receipt: ReceiptId,
        voter: VoterId,
        anticipated_block: u64,
    },
    /// A block was mined and appended.
    BlockSealed {
        index: u64,
        hash: BlockHash,
        votes: usize,
        nonce: u64,
    },
    /// A vote's block was appended. Emitted once per vote, in block order.
    VoteConfirmed {
        receipt: ReceiptId,
        candidate: CandidateId,
        block_index: u64,
        position: usize,
    },
    /// An administrator revoked a confirmed vote.
    VoteRevoked {
        receipt: ReceiptId,
        voter: VoterId,
        candidate: CandidateId,
        reason: String,
    },
    /// A sealing run failed; its votes were returned to the pool.
    SealFailed { reason: String, retained_votes: usize },
    /// Chain validation failed. The node no longer appends.
    ChainCorrupted { block_index: Option<u64>, reason: String },
}

/// Synchronous fan-out event bus for ledger events.
///
/// Listeners are invoked inline on the emitting thread; keep handlers fast to
/// avoid stalling submissions and sealing.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&LedgerEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&LedgerEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &LedgerEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
