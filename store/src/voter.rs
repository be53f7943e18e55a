//! Voter storage trait.

use crate::StoreError;
use evote_types::{VoterId, VoterRecord, VotingStatus};

/// Read/write access to voter records.
///
/// The ledger only ever writes the voting status; verification flags are owned
/// by the OTP and identity flows.
pub trait VoterStore: Send + Sync {
    fn get_voter(&self, id: &VoterId) -> Result<VoterRecord, StoreError>;
    fn put_voter(&self, voter: &VoterRecord) -> Result<(), StoreError>;

    /// Overwrite the voting status of an existing voter.
    fn set_voting_status(&self, id: &VoterId, status: &VotingStatus) -> Result<(), StoreError>;

    fn voter_count(&self) -> Result<u64, StoreError>;

    /// Count voters whose status records a vote.
    fn voted_count(&self) -> Result<u64, StoreError>;
}
