//! Running per-candidate tallies and their reconciliation against the chain.
//!
//! The sealer increments a candidate's counter once per confirmed vote and an
//! administrative reset decrements it. At every point the counters must equal
//! a full recount of the chain minus revoked receipts; any difference is a
//! defect reported by the health check.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use evote_ledger::Chain;
use evote_types::{CandidateId, Constituency, ReceiptId};

/// A candidate whose running counter disagrees with the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TallyDivergence {
    pub candidate: CandidateId,
    pub running: u64,
    pub recount: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CandidateResult {
    pub candidate: CandidateId,
    pub votes: u64,
    /// Share of the constituency's effective votes, in basis points (1/100 of a percent).
    pub share_bps: u32,
}

/// Effective results for one constituency, highest count first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConstituencyResults {
    pub constituency: Constituency,
    pub total_votes: u64,
    pub candidates: Vec<CandidateResult>,
}

impl ConstituencyResults {
    /// Candidate with the most votes. Ties go to the lower candidate id.
    pub fn leader(&self) -> Option<&CandidateResult> {
        self.candidates.first()
    }
}

#[derive(Default)]
pub struct TallyBoard {
    counts: Mutex<HashMap<CandidateId, u64>>,
}

impl TallyBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters seeded from an existing chain, e.g. after restoring a snapshot.
    pub fn from_chain(chain: &Chain, revoked: &HashSet<ReceiptId>) -> Self {
        Self {
            counts: Mutex::new(chain.tally_excluding(revoked).into_iter().collect()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CandidateId, u64>> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, candidate: &CandidateId) {
        *self.lock().entry(candidate.clone()).or_insert(0) += 1;
    }

    pub fn revoke(&self, candidate: &CandidateId) {
        if let Some(count) = self.lock().get_mut(candidate) {
            *count = count.saturating_sub(1);
        }
    }

    pub fn count(&self, candidate: &CandidateId) -> u64 {
        self.lock().get(candidate).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> BTreeMap<CandidateId, u64> {
        self.lock()
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(c, n)| (c.clone(), *n))
            .collect()
    }

    /// Candidates whose running counter differs from a recount of `chain`.
    pub fn divergences(&self, chain: &Chain, revoked: &HashSet<ReceiptId>) -> Vec<TallyDivergence> {
        let recount = chain.tally_excluding(revoked);
        let running = self.snapshot();

        let mut candidates: Vec<&CandidateId> = recount.keys().chain(running.keys()).collect();
        candidates.sort();
        candidates.dedup();

        candidates
            .into_iter()
            .filter_map(|candidate| {
                let r = running.get(candidate).copied().unwrap_or(0);
                let c = recount.get(candidate).copied().unwrap_or(0);
                (r != c).then(|| TallyDivergence {
                    candidate: candidate.clone(),
                    running: r,
                    recount: c,
                })
            })
            .collect()
    }
}

/// Effective per-candidate results for `constituency`, recounted from the chain.
pub fn constituency_results(
    chain: &Chain,
    constituency: &Constituency,
    revoked: &HashSet<ReceiptId>,
) -> ConstituencyResults {
    let mut counts: BTreeMap<CandidateId, u64> = BTreeMap::new();
    for vote in chain.blocks().iter().flat_map(|b| b.votes.iter()) {
        if &vote.constituency != constituency || revoked.contains(&vote.receipt_id) {
            continue;
        }
        *counts.entry(vote.candidate_id.clone()).or_insert(0) += 1;
    }

    let total_votes: u64 = counts.values().sum();
    let mut candidates: Vec<CandidateResult> = counts
        .into_iter()
        .map(|(candidate, votes)| CandidateResult {
            candidate,
            votes,
            share_bps: if total_votes == 0 {
                0
            } else {
                (votes * 10_000 / total_votes) as u32
            },
        })
        .collect();
    // Stable sort keeps id order among equal counts.
    candidates.sort_by(|a, b| b.votes.cmp(&a.votes));

    ConstituencyResults {
        constituency: constituency.clone(),
        total_votes,
        candidates,
    }
}
