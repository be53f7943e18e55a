//! Administrative voter reset and its audit trail.
//!
//! A reset never touches sealed blocks. It appends a [`Revocation`] naming the
//! sealed vote, removes that vote from the effective tallies and clears the
//! voter's status so they may vote again.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::Instrument;

pub use evote_ledger::Revocation;
use evote_types::{ReceiptId, VoterId, VotingStatus};

use crate::ledger_event::LedgerEvent;
use crate::orchestrator::Orchestrator;
use crate::tracing_spans::admin_reset_span;
use crate::AdminError;

/// Append-only list of revocations.
#[derive(Default)]
pub struct RevocationLog {
    entries: Mutex<Vec<Revocation>>,
}

impl RevocationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log holding previously recorded revocations, e.g. from a snapshot.
    pub fn from_entries(entries: Vec<Revocation>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Revocation>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, revocation: Revocation) {
        self.lock().push(revocation);
    }

    pub fn entries(&self) -> Vec<Revocation> {
        self.lock().clone()
    }

    pub fn is_revoked(&self, receipt: &ReceiptId) -> bool {
        self.lock().iter().any(|r| &r.receipt_id == receipt)
    }

    pub fn revoked_receipts(&self) -> HashSet<ReceiptId> {
        self.lock().iter().map(|r| r.receipt_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Orchestrator {
    /// Revoke `voter`'s confirmed vote and make them eligible again.
    ///
    /// Runs under the voter's lock. A vote still waiting in the pool cannot be
    /// revoked until it is sealed.
    pub async fn admin_reset_voter(
        &self,
        voter: &VoterId,
        reason: &str,
    ) -> Result<Revocation, AdminError> {
        let span = admin_reset_span(voter.as_str());
        self.admin_reset_inner(voter, reason).instrument(span).await
    }

    async fn admin_reset_inner(
        &self,
        voter_id: &VoterId,
        reason: &str,
    ) -> Result<Revocation, AdminError> {
        if self.ledger.is_corrupted() {
            return Err(AdminError::ChainCorruption);
        }
        let _guard = self
            .locks
            .acquire(voter_id)
            .await
            .map_err(|_| AdminError::Busy)?;

        let voter = match self.voters.get_voter(voter_id) {
            Ok(voter) => voter,
            Err(evote_store::StoreError::NotFound(_)) => {
                return Err(AdminError::UnknownVoter(voter_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        if !voter.has_voted() {
            return Err(AdminError::NotVoted);
        }
        let receipt = voter
            .voting_status
            .vote_reference
            .clone()
            .ok_or(AdminError::NotVoted)?;

        // The read lock keeps a drained vote from being appended between lookups.
        let confirmed = {
            let chain = self.ledger.read();
            match chain.locate(&receipt) {
                Some(confirmed) => confirmed,
                None if self.pool.contains(&receipt) => return Err(AdminError::VotePending),
                None => return Err(AdminError::VoteNotFound(receipt.to_string())),
            }
        };

        self.voters
            .set_voting_status(voter_id, &VotingStatus::default())?;

        let revocation = Revocation {
            receipt_id: receipt,
            voter_id: voter_id.clone(),
            candidate_id: confirmed.vote.candidate_id.clone(),
            block_index: confirmed.location.block_index,
            position: confirmed.location.position,
            reason: reason.to_string(),
            revoked_at: self.clock.now(),
        };
        // Readers holding the chain lock see the log and the tally change together.
        self.ledger.exclusive(|_| {
            self.revocations.record(revocation.clone());
            self.tally.revoke(&revocation.candidate_id);
        });
        if let Some(m) = &self.metrics {
            m.votes_revoked.inc();
        }
        self.events.emit(&LedgerEvent::VoteRevoked {
            receipt: revocation.receipt_id.clone(),
            voter: revocation.voter_id.clone(),
            candidate: revocation.candidate_id.clone(),
            reason: revocation.reason.clone(),
        });

        tracing::warn!(
            receipt = %revocation.receipt_id,
            block = revocation.block_index,
            reason = %revocation.reason,
            "confirmed vote revoked by administrator"
        );
        Ok(revocation)
    }

    /// Every revocation recorded so far, oldest first.
    pub fn revocations(&self) -> Vec<Revocation> {
        self.revocations.entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evote_types::{CandidateId, Timestamp};

    fn revocation(n: u64) -> Revocation {
        Revocation {
            receipt_id: ReceiptId::new(format!("VOTE-{n:016X}")),
            voter_id: VoterId::new(format!("v{n}")),
            candidate_id: CandidateId::from("c1"),
            block_index: 1,
            position: n as usize,
            reason: "duplicate registration".into(),
            revoked_at: Timestamp::from_millis(n),
        }
    }

    #[test]
    fn log_is_append_only() {
        let log = RevocationLog::new();
        assert!(log.is_empty());
        log.record(revocation(1));
        log.record(revocation(2));

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].position, 1);
        assert!(log.is_revoked(&ReceiptId::new(format!("VOTE-{:016X}", 2))));
        assert!(!log.is_revoked(&ReceiptId::from("VOTE-FFFFFFFFFFFFFFFF")));
        assert_eq!(log.revoked_receipts().len(), 2);
    }

    #[test]
    fn log_seeded_from_entries() {
        let log = RevocationLog::from_entries(vec![revocation(4)]);
        assert_eq!(log.len(), 1);
        assert!(log.is_revoked(&ReceiptId::new(format!("VOTE-{:016X}", 4))));
    }
}
