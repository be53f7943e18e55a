//! Candidate records as seen by the ledger subsystem.

use serde::{Deserialize, Serialize};

use crate::{CandidateId, Constituency};

/// Standing of a candidate in the election.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    #[default]
    Active,
    Suspended,
    Withdrawn,
}

impl CandidateStatus {
    /// Only active candidates can receive votes.
    pub fn accepts_votes(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// A candidate standing in one constituency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: CandidateId,
    pub name: String,
    pub party: String,
    pub constituency: Constituency,
    #[serde(default)]
    pub status: CandidateStatus,
}

impl CandidateRecord {
    pub fn new(
        id: impl Into<CandidateId>,
        name: impl Into<String>,
        party: impl Into<String>,
        constituency: impl Into<Constituency>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            party: party.into(),
            constituency: constituency.into(),
            status: CandidateStatus::Active,
        }
    }

    /// Whether a voter registered in `constituency` may vote for this candidate.
    pub fn is_votable_in(&self, constituency: &Constituency) -> bool {
        self.status.accepts_votes() && &self.constituency == constituency
    }
}
