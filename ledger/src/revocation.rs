//! Audit records for sealed votes voided by an administrator.

use serde::{Deserialize, Serialize};

use evote_types::{CandidateId, ReceiptId, Timestamp, VoterId};

use crate::VoteLocation;

/// A sealed vote that no longer counts. The block holding it is unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revocation {
    pub receipt_id: ReceiptId,
    pub voter_id: VoterId,
    pub candidate_id: CandidateId,
    pub block_index: u64,
    pub position: usize,
    pub reason: String,
    pub revoked_at: Timestamp,
}

impl Revocation {
    pub fn location(&self) -> VoteLocation {
        VoteLocation {
            block_index: self.block_index,
            position: self.position,
        }
    }
}
