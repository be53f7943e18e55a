//! Blocks: an ordered batch of votes sealed by proof-of-work.

use serde::{Deserialize, Serialize};

use evote_types::{BlockHash, Timestamp};
use evote_work::{meets_difficulty, work_hash, WorkNonce};

use crate::{LedgerError, PendingVote};

/// A sealed block.
///
/// `hash = SHA256(index ++ timestamp ++ json(votes) ++ previous_hash ++ nonce)`, all
/// numbers rendered in decimal and concatenated without separators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain; 0 is genesis.
    pub index: u64,
    pub timestamp: Timestamp,
    /// Votes in pool insertion order.
    pub votes: Vec<PendingVote>,
    pub previous_hash: BlockHash,
    pub nonce: u64,
    pub hash: BlockHash,
}

/// Hash preimage without the trailing nonce.
fn preimage(
    index: u64,
    timestamp: Timestamp,
    votes: &[PendingVote],
    previous_hash: &BlockHash,
) -> Result<Vec<u8>, LedgerError> {
    let votes_json =
        serde_json::to_string(votes).map_err(|e| LedgerError::Serialization(e.to_string()))?;
    Ok(format!(
        "{}{}{}{}",
        index,
        timestamp.as_millis(),
        votes_json,
        previous_hash
    )
    .into_bytes())
}

impl Block {
    /// Everything the hash commits to except the nonce.
    pub fn preimage(&self) -> Result<Vec<u8>, LedgerError> {
        preimage(self.index, self.timestamp, &self.votes, &self.previous_hash)
    }

    /// Recompute the hash from the stored fields.
    pub fn compute_hash(&self) -> Result<BlockHash, LedgerError> {
        Ok(BlockHash::new(work_hash(&self.preimage()?, self.nonce)))
    }

    /// Verify the stored hash matches the block's contents.
    pub fn verify_hash(&self) -> Result<(), LedgerError> {
        let computed = self.compute_hash()?;
        if computed != self.hash {
            return Err(LedgerError::HashMismatch {
                index: self.index,
                stored: self.hash.to_string(),
                computed: computed.to_string(),
            });
        }
        Ok(())
    }

    /// Whether the stored hash satisfies `difficulty`.
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        meets_difficulty(self.hash.as_str(), difficulty)
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }
}

/// A block under construction: contents frozen, nonce not yet found.
#[derive(Clone, Debug)]
pub struct BlockTemplate {
    pub index: u64,
    pub timestamp: Timestamp,
    pub votes: Vec<PendingVote>,
    pub previous_hash: BlockHash,
}

impl BlockTemplate {
    pub fn new(
        index: u64,
        timestamp: Timestamp,
        votes: Vec<PendingVote>,
        previous_hash: BlockHash,
    ) -> Self {
        Self {
            index,
            timestamp,
            votes,
            previous_hash,
        }
    }

    /// Bytes the proof-of-work search extends with each candidate nonce.
    pub fn preimage(&self) -> Result<Vec<u8>, LedgerError> {
        preimage(self.index, self.timestamp, &self.votes, &self.previous_hash)
    }

    /// Attach a found nonce, producing the sealed block.
    pub fn seal(self, work: WorkNonce) -> Block {
        Block {
            index: self.index,
            timestamp: self.timestamp,
            votes: self.votes,
            previous_hash: self.previous_hash,
            nonce: work.nonce,
            hash: BlockHash::new(work.hash),
        }
    }

    /// Give the votes back, e.g. when mining was cancelled.
    pub fn into_votes(self) -> Vec<PendingVote> {
        self.votes
    }
}
