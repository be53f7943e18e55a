//! Candidate storage trait.

use crate::StoreError;
use evote_types::{CandidateId, CandidateRecord, Constituency};

/// Read access to candidate records (plus registration for seeding).
pub trait CandidateStore: Send + Sync {
    fn get_candidate(&self, id: &CandidateId) -> Result<CandidateRecord, StoreError>;
    fn put_candidate(&self, candidate: &CandidateRecord) -> Result<(), StoreError>;

    /// All candidates registered in a constituency, ordered by id.
    fn candidates_in(&self, constituency: &Constituency) -> Result<Vec<CandidateRecord>, StoreError>;
}
