//! Vote submission and the read-side queries over pool and chain.
//!
//! `submit` is the only path that sets a voter's `has_voted` flag. The flag
//! flip and the pool insert happen in one pool critical section while the
//! voter's lock is held, so concurrent submissions for one voter cannot both
//! pass the eligibility check and a failed flip leaves nothing pooled.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Notify;
use tracing::Instrument;

use evote_crypto::{generate_receipt_id, verification_hash};
use evote_ledger::{ChainSnapshot, ChainStats, ConfirmedVote, PendingVote};
use evote_store::{CandidateStore, StoreError, VoterStore};
use evote_types::{
    BlockHash, CandidateId, Clock, Constituency, ReceiptId, Timestamp, VoterId, VotingStatus,
};

use crate::admin::RevocationLog;
use crate::eligibility::{self, Ineligibility};
use crate::ledger_event::{EventBus, LedgerEvent};
use crate::ledger_state::LedgerState;
use crate::metrics::NodeMetrics;
use crate::tally::{constituency_results, ConstituencyResults, TallyBoard, TallyDivergence};
use crate::tracing_spans::{submit_span, verify_span};
use crate::vote_pool::VotePool;
use crate::voter_locks::VoterLockTable;
use crate::SubmitError;

/// A ballot as handed over by the (out of scope) HTTP layer.
#[derive(Clone, Debug)]
pub struct VoteRequest {
    /// Taken from the authenticated session, never from the request body.
    pub voter_id: VoterId,
    pub candidate_id: CandidateId,
    pub constituency: Constituency,
    /// Per-session nonce mixed into the verification hash.
    pub session_nonce: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    PendingConfirmation,
}

/// Provisional receipt returned before the vote is sealed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub receipt_id: ReceiptId,
    /// Chain length at submission: the block the vote is expected to land in.
    pub anticipated_block_index: u64,
    pub status: ReceiptStatus,
    pub verification_hash: String,
    pub submitted_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Accepted, not yet sealed.
    Pending,
    Confirmed {
        block_index: u64,
        position: usize,
        block_hash: BlockHash,
    },
    /// Sealed, then revoked by an administrator. The block is unchanged.
    Revoked { block_index: u64, position: usize },
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VoteVerification {
    pub receipt_id: ReceiptId,
    pub status: VerificationStatus,
    pub chain_valid: bool,
    pub latest_index: u64,
}

/// One sealed vote in a voter's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub confirmed: ConfirmedVote,
    /// Voided by an administrative reset. The block itself is unchanged.
    pub revoked: bool,
}

/// Outcome of a full integrity check.
#[derive(Clone, Debug, Serialize)]
pub struct HealthReport {
    pub chain_valid: bool,
    /// Whether appends are suspended. Stays true once set.
    pub fail_closed: bool,
    pub failure: Option<String>,
    pub divergences: Vec<TallyDivergence>,
    pub block_count: usize,
    pub pending_count: usize,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.chain_valid && !self.fail_closed && self.divergences.is_empty()
    }
}

pub struct Orchestrator {
    pub(crate) voters: Arc<dyn VoterStore>,
    pub(crate) candidates: Arc<dyn CandidateStore>,
    pub(crate) locks: VoterLockTable,
    pub(crate) pool: Arc<VotePool>,
    pub(crate) ledger: Arc<LedgerState>,
    pub(crate) tally: Arc<TallyBoard>,
    pub(crate) revocations: RevocationLog,
    pub(crate) events: Arc<EventBus>,
    pub(crate) metrics: Option<Arc<NodeMetrics>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) seal_signal: Arc<Notify>,
}

impl Orchestrator {
    /// Accept a vote into the pool and return a provisional receipt.
    ///
    /// Never waits for mining. The sealer is signalled after the vote is pooled.
    pub async fn submit(&self, request: VoteRequest) -> Result<Receipt, SubmitError> {
        let span = submit_span(request.voter_id.as_str(), request.candidate_id.as_str());
        let started = Instant::now();
        let result = self.submit_inner(request).instrument(span.clone()).await;

        if let Err(e) = &result {
            span.in_scope(|| tracing::debug!(error = %e, retryable = e.is_retryable(), "submission rejected"));
        }
        if let Some(m) = &self.metrics {
            m.votes_submitted.inc();
            match &result {
                Ok(_) => m.votes_accepted.inc(),
                Err(_) => m.votes_rejected.inc(),
            }
            m.submit_latency_ms.observe(started.elapsed().as_secs_f64() * 1_000.0);
        }
        result
    }

    async fn submit_inner(&self, request: VoteRequest) -> Result<Receipt, SubmitError> {
        if self.ledger.is_corrupted() {
            return Err(SubmitError::ChainCorruption);
        }
        if self.pool.is_closed() {
            return Err(SubmitError::ShuttingDown);
        }

        let _guard = self
            .locks
            .acquire(&request.voter_id)
            .await
            .map_err(|_| SubmitError::Busy)?;

        let voter = match self.voters.get_voter(&request.voter_id) {
            Ok(voter) => voter,
            Err(StoreError::NotFound(_)) => {
                return Err(SubmitError::NotEligible("voter is not registered".into()))
            }
            Err(e) => return Err(e.into()),
        };
        eligibility::check(&voter).map_err(|reason| match reason {
            Ineligibility::AlreadyVoted => SubmitError::AlreadyVoted,
            other => SubmitError::NotEligible(other.as_str().into()),
        })?;

        if request.constituency != voter.constituency {
            return Err(SubmitError::InvalidCandidate(format!(
                "voter is registered in {}, not {}",
                voter.constituency, request.constituency
            )));
        }
        let candidate = match self.candidates.get_candidate(&request.candidate_id) {
            Ok(candidate) => candidate,
            Err(StoreError::NotFound(_)) => {
                return Err(SubmitError::InvalidCandidate(format!(
                    "unknown candidate {}",
                    request.candidate_id
                )))
            }
            Err(e) => return Err(e.into()),
        };
        if !candidate.is_votable_in(&voter.constituency) {
            return Err(SubmitError::InvalidCandidate(format!(
                "candidate {} is not standing in {}",
                candidate.id, voter.constituency
            )));
        }

        let submitted_at = self.clock.now();
        let receipt_id = generate_receipt_id();
        let verification_hash = verification_hash(&voter.id, &candidate.id, &request.session_nonce);
        let vote = PendingVote {
            voter_id: voter.id.clone(),
            candidate_id: candidate.id.clone(),
            constituency: voter.constituency.clone(),
            submitted_at,
            verification_hash: verification_hash.clone(),
            receipt_id: receipt_id.clone(),
        };
        let status = VotingStatus::voted(submitted_at, candidate.id.clone(), receipt_id.clone());
        let anticipated_block_index = self.ledger.len() as u64;

        let pool_size = self.pool.admit(vote, || {
            self.voters.set_voting_status(&voter.id, &status)?;
            Ok(())
        })?;

        if let Some(m) = &self.metrics {
            m.pool_size.set(pool_size as i64);
        }
        self.events.emit(&LedgerEvent::VoteAccepted {
            receipt: receipt_id.clone(),
            voter: voter.id.clone(),
            anticipated_block: anticipated_block_index,
        });
        self.seal_signal.notify_one();

        tracing::debug!(receipt = %receipt_id, pool_size, "vote accepted");
        Ok(Receipt {
            receipt_id,
            anticipated_block_index,
            status: ReceiptStatus::PendingConfirmation,
            verification_hash,
            submitted_at,
        })
    }

    /// Where a receipt's vote currently stands.
    pub fn verify(&self, receipt: &ReceiptId) -> VoteVerification {
        let _span = verify_span(receipt.as_str()).entered();
        let chain = self.ledger.read();

        let status = match chain.locate(receipt) {
            Some(confirmed) if self.revocations.is_revoked(receipt) => VerificationStatus::Revoked {
                block_index: confirmed.location.block_index,
                position: confirmed.location.position,
            },
            Some(confirmed) => VerificationStatus::Confirmed {
                block_index: confirmed.location.block_index,
                position: confirmed.location.position,
                block_hash: confirmed.block_hash,
            },
            // The chain read lock is held, so a drained vote cannot be
            // appended between the two lookups.
            None if self.pool.contains(receipt) => VerificationStatus::Pending,
            None => VerificationStatus::Unknown,
        };

        VoteVerification {
            receipt_id: receipt.clone(),
            status,
            chain_valid: !self.ledger.is_corrupted() && chain.is_valid(),
            latest_index: chain.latest().index,
        }
    }

    /// Sealed votes cast by `voter` in chain order, revoked ones flagged.
    pub fn history(&self, voter: &VoterId) -> Vec<HistoryEntry> {
        let chain = self.ledger.read();
        let revoked = self.revocations.revoked_receipts();
        chain
            .history(voter)
            .into_iter()
            .map(|confirmed| HistoryEntry {
                revoked: revoked.contains(&confirmed.vote.receipt_id),
                confirmed,
            })
            .collect()
    }

    pub fn stats(&self) -> ChainStats {
        let mut stats = self.ledger.read().stats(self.pool.size());
        if self.ledger.is_corrupted() {
            stats.chain_valid = false;
        }
        stats
    }

    /// Re-verify the whole chain and reconcile tallies.
    ///
    /// A failed verification latches the node into fail-closed mode. The chain,
    /// revocations and counters are read under one chain read lock; sealing
    /// and revocation update them under the write lock.
    pub fn health_check(&self) -> HealthReport {
        let chain = self.ledger.read();
        let failure = chain.first_invalid();

        if let Some(e) = &failure {
            if self.ledger.mark_corrupted() {
                tracing::error!(error = %e, block = ?e.block_index(), "chain integrity check failed, appends suspended");
                self.events.emit(&LedgerEvent::ChainCorrupted {
                    block_index: e.block_index(),
                    reason: e.to_string(),
                });
            }
        }

        let divergences = self
            .tally
            .divergences(&chain, &self.revocations.revoked_receipts());
        for d in &divergences {
            tracing::error!(candidate = %d.candidate, running = d.running, recount = d.recount, "tally diverges from chain");
        }

        HealthReport {
            chain_valid: failure.is_none(),
            fail_closed: self.ledger.is_corrupted(),
            failure: failure.map(|e| e.to_string()),
            divergences,
            block_count: chain.len(),
            pending_count: self.pool.size(),
        }
    }

    /// Running per-candidate counts with revocations applied.
    pub fn tallies(&self) -> BTreeMap<CandidateId, u64> {
        self.tally.snapshot()
    }

    /// Per-candidate results for one constituency, recounted from the chain.
    pub fn results(&self, constituency: &Constituency) -> ConstituencyResults {
        constituency_results(
            &self.ledger.read(),
            constituency,
            &self.revocations.revoked_receipts(),
        )
    }

    /// The chain and its revocations, captured under one read lock.
    pub fn snapshot(&self) -> ChainSnapshot {
        let chain = self.ledger.read();
        ChainSnapshot::capture(&chain, self.revocations.entries(), self.clock.now())
    }

    pub fn pending_count(&self) -> usize {
        self.pool.size()
    }

    pub fn revoked_receipts(&self) -> HashSet<ReceiptId> {
        self.revocations.revoked_receipts()
    }

    /// Drop lock-table entries for voters nobody is submitting for.
    pub async fn prune_locks(&self) {
        let before = self.locks.tracked_voters().await;
        self.locks.cleanup().await;
        let after = self.locks.tracked_voters().await;
        tracing::debug!(pruned = before.saturating_sub(after), remaining = after, "voter locks pruned");
    }
}
