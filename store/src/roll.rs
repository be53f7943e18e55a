//! Electoral roll: the seed data for an in-memory registry.

use serde::{Deserialize, Serialize};

use evote_types::{CandidateRecord, VoterRecord};

/// Voters and candidates to load into a registry at startup.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ElectoralRoll {
    #[serde(default)]
    pub voters: Vec<VoterRecord>,
    #[serde(default)]
    pub candidates: Vec<CandidateRecord>,
}
