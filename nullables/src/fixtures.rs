//! Ready-made electoral rolls for tests and demos.

use std::sync::Arc;

use evote_store::MemoryRegistry;
use evote_types::{CandidateId, CandidateRecord, Constituency, VoterId, VoterRecord};

/// A registry seeded with verified voters and active candidates in one constituency.
pub struct ElectionFixture {
    pub registry: Arc<MemoryRegistry>,
    pub constituency: Constituency,
    pub voters: Vec<VoterId>,
    pub candidates: Vec<CandidateId>,
}

impl ElectionFixture {
    /// `voters` verified voters `voter-0..` and `candidates` candidates `cand-0..`.
    pub fn new(constituency: &str, voters: usize, candidates: usize) -> Self {
        let registry = Arc::new(MemoryRegistry::new());
        let constituency = Constituency::from(constituency);

        let voter_ids: Vec<VoterId> = (0..voters)
            .map(|n| VoterId::new(format!("voter-{n}")))
            .collect();
        for id in &voter_ids {
            let record = VoterRecord::new(id.clone(), constituency.clone()).verified();
            put_voter(&registry, &record);
        }

        let candidate_ids: Vec<CandidateId> = (0..candidates)
            .map(|n| CandidateId::new(format!("cand-{n}")))
            .collect();
        for (n, id) in candidate_ids.iter().enumerate() {
            let record = CandidateRecord::new(
                id.clone(),
                format!("Candidate {n}"),
                format!("Party {n}"),
                constituency.clone(),
            );
            put_candidate(&registry, &record);
        }

        Self {
            registry,
            constituency,
            voters: voter_ids,
            candidates: candidate_ids,
        }
    }

    /// Register an extra voter, e.g. one who has not completed verification.
    pub fn add_voter(&self, record: VoterRecord) {
        put_voter(&self.registry, &record);
    }

    pub fn add_candidate(&self, record: CandidateRecord) {
        put_candidate(&self.registry, &record);
    }
}

fn put_voter(registry: &MemoryRegistry, record: &VoterRecord) {
    // The in-memory registry never fails a put.
    let _ = evote_store::VoterStore::put_voter(registry, record);
}

fn put_candidate(registry: &MemoryRegistry, record: &CandidateRecord) {
    let _ = evote_store::CandidateStore::put_candidate(registry, record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use evote_store::{CandidateStore, VoterStore};

    #[test]
    fn fixture_registers_everyone() {
        let f = ElectionFixture::new("Mumbai South", 3, 2);
        assert_eq!(f.registry.voter_count().unwrap(), 3);
        assert!(f.registry.get_voter(&f.voters[0]).unwrap().otp_verified);
        assert_eq!(f.registry.candidates_in(&f.constituency).unwrap().len(), 2);
    }
}
