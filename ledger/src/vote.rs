//! Votes before and after sealing.

use serde::{Deserialize, Serialize};

use evote_types::{BlockHash, CandidateId, Constituency, ReceiptId, Timestamp, VoterId};

use crate::HASH_PREFIX_LEN;

/// An accepted but unsealed vote.
///
/// Field order is part of the block hash preimage (votes are serialised as JSON).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingVote {
    pub voter_id: VoterId,
    pub candidate_id: CandidateId,
    pub constituency: Constituency,
    pub submitted_at: Timestamp,
    /// `SHA256(voterId ++ candidateId ++ sessionNonce)`.
    pub verification_hash: String,
    pub receipt_id: ReceiptId,
}

/// Where a sealed vote sits in the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteLocation {
    pub block_index: u64,
    pub position: usize,
}

/// A vote whose containing block has been appended to the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedVote {
    pub vote: PendingVote,
    pub location: VoteLocation,
    pub block_hash: BlockHash,
    /// Timestamp of the containing block.
    pub sealed_at: Timestamp,
}

impl ConfirmedVote {
    pub fn block_index(&self) -> u64 {
        self.location.block_index
    }

    pub fn block_hash_prefix(&self) -> &str {
        self.block_hash.prefix(HASH_PREFIX_LEN)
    }
}
