//! Thread-safe in-memory registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use evote_types::{CandidateId, CandidateRecord, Constituency, VoterId, VoterRecord, VotingStatus};

use crate::{CandidateStore, ElectoralRoll, StoreError, VoterStore};

/// Voter and candidate records held in process memory.
#[derive(Default)]
pub struct MemoryRegistry {
    voters: Mutex<HashMap<VoterId, VoterRecord>>,
    candidates: Mutex<BTreeMap<CandidateId, CandidateRecord>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from an electoral roll. Duplicate ids are rejected.
    pub fn from_roll(roll: &ElectoralRoll) -> Result<Self, StoreError> {
        let registry = Self::new();
        {
            let mut voters = lock(&registry.voters);
            for voter in &roll.voters {
                if voters.insert(voter.id.clone(), voter.clone()).is_some() {
                    return Err(StoreError::Duplicate(format!("voter {}", voter.id)));
                }
            }
        }
        {
            let mut candidates = lock(&registry.candidates);
            for candidate in &roll.candidates {
                if candidates
                    .insert(candidate.id.clone(), candidate.clone())
                    .is_some()
                {
                    return Err(StoreError::Duplicate(format!("candidate {}", candidate.id)));
                }
            }
        }
        Ok(registry)
    }
}

impl VoterStore for MemoryRegistry {
    fn get_voter(&self, id: &VoterId) -> Result<VoterRecord, StoreError> {
        lock(&self.voters)
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("voter {id}")))
    }

    fn put_voter(&self, voter: &VoterRecord) -> Result<(), StoreError> {
        lock(&self.voters).insert(voter.id.clone(), voter.clone());
        Ok(())
    }

    fn set_voting_status(&self, id: &VoterId, status: &VotingStatus) -> Result<(), StoreError> {
        let mut voters = lock(&self.voters);
        let voter = voters
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("voter {id}")))?;
        voter.voting_status = status.clone();
        Ok(())
    }

    fn voter_count(&self) -> Result<u64, StoreError> {
        Ok(lock(&self.voters).len() as u64)
    }

    fn voted_count(&self) -> Result<u64, StoreError> {
        Ok(lock(&self.voters).values().filter(|v| v.has_voted()).count() as u64)
    }
}

impl CandidateStore for MemoryRegistry {
    fn get_candidate(&self, id: &CandidateId) -> Result<CandidateRecord, StoreError> {
        lock(&self.candidates)
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("candidate {id}")))
    }

    fn put_candidate(&self, candidate: &CandidateRecord) -> Result<(), StoreError> {
        lock(&self.candidates).insert(candidate.id.clone(), candidate.clone());
        Ok(())
    }

    fn candidates_in(&self, constituency: &Constituency) -> Result<Vec<CandidateRecord>, StoreError> {
        Ok(lock(&self.candidates)
            .values()
            .filter(|c| &c.constituency == constituency)
            .cloned()
            .collect())
    }
}
