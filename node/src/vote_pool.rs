//! The vote pool: accepted but unsealed votes, in insertion order.
//!
//! Every operation takes the pool mutex for its whole duration, so a drain
//! either sees a push completely or not at all. The pool is the durability
//! boundary: votes leave it only through a drain, and a failed seal puts them
//! back at the front. Drained votes stay visible to [`VotePool::contains`]
//! until the sealer settles them, so a receipt never looks unknown while its
//! block is being mined.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use evote_ledger::PendingVote;
use evote_types::ReceiptId;

use crate::SubmitError;

#[derive(Default)]
struct PoolInner {
    votes: VecDeque<PendingVote>,
    /// Receipts drained into a block that has not been appended yet.
    in_flight: HashSet<ReceiptId>,
    closed: bool,
}

#[derive(Default)]
pub struct VotePool {
    inner: Mutex<PoolInner>,
}

impl VotePool {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PoolInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a vote unconditionally. Returns the new pool size.
    pub fn push(&self, vote: PendingVote) -> usize {
        let mut inner = self.lock();
        inner.votes.push_back(vote);
        inner.votes.len()
    }

    /// Run `commit` and append `vote` inside one critical section.
    ///
    /// The vote is appended only if `commit` succeeds, and a closed pool
    /// refuses before `commit` runs. Returns the new pool size.
    pub fn admit<F>(&self, vote: PendingVote, commit: F) -> Result<usize, SubmitError>
    where
        F: FnOnce() -> Result<(), SubmitError>,
    {
        let mut inner = self.lock();
        if inner.closed {
            return Err(SubmitError::ShuttingDown);
        }
        commit()?;
        inner.votes.push_back(vote);
        Ok(inner.votes.len())
    }

    /// Take every pooled vote, oldest first.
    pub fn drain_all(&self) -> Vec<PendingVote> {
        let mut inner = self.lock();
        let votes: Vec<PendingVote> = inner.votes.drain(..).collect();
        inner
            .in_flight
            .extend(votes.iter().map(|v| v.receipt_id.clone()));
        votes
    }

    /// Forget drained votes whose block has been appended.
    pub fn settle(&self, votes: &[PendingVote]) {
        let mut inner = self.lock();
        for vote in votes {
            inner.in_flight.remove(&vote.receipt_id);
        }
    }

    /// Put votes from a failed seal back ahead of anything pushed since.
    pub fn restore_front(&self, votes: Vec<PendingVote>) {
        let mut inner = self.lock();
        for vote in votes.into_iter().rev() {
            inner.in_flight.remove(&vote.receipt_id);
            inner.votes.push_front(vote);
        }
    }

    /// Whether the receipt is queued or drained but not yet appended.
    pub fn contains(&self, receipt: &ReceiptId) -> bool {
        let inner = self.lock();
        inner.in_flight.contains(receipt) || inner.votes.iter().any(|v| &v.receipt_id == receipt)
    }

    /// Votes drained and not yet settled or restored.
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight.len()
    }

    pub fn size(&self) -> usize {
        self.lock().votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Refuse further admissions. Already pooled votes stay.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evote_store::StoreError;
    use evote_types::{CandidateId, Constituency, Timestamp, VoterId};
    use std::sync::Arc;

    fn vote(n: u64) -> PendingVote {
        PendingVote {
            voter_id: VoterId::new(format!("v{n}")),
            candidate_id: CandidateId::from("c1"),
            constituency: Constituency::from("Delhi"),
            submitted_at: Timestamp::from_millis(n),
            verification_hash: String::new(),
            receipt_id: ReceiptId::new(format!("VOTE-{n:016X}")),
        }
    }

    #[test]
    fn drain_preserves_insertion_order() {
        let pool = VotePool::new();
        for n in 0..5 {
            pool.push(vote(n));
        }
        let drained = pool.drain_all();
        let order: Vec<_> = drained.iter().map(|v| v.submitted_at.as_millis()).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        assert!(pool.is_empty());
    }

    #[test]
    fn failed_commit_leaves_pool_untouched() {
        let pool = VotePool::new();
        let err = pool
            .admit(vote(1), || Err(StoreError::Unavailable("down".into()).into()))
            .unwrap_err();
        assert!(matches!(err, SubmitError::Store(_)));
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn closed_pool_refuses_before_commit() {
        let pool = VotePool::new();
        pool.push(vote(1));
        pool.close();
        let mut committed = false;
        let err = pool
            .admit(vote(2), || {
                committed = true;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, SubmitError::ShuttingDown));
        assert!(!committed);
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn restore_front_goes_before_newer_votes() {
        let pool = VotePool::new();
        pool.push(vote(1));
        pool.push(vote(2));
        let drained = pool.drain_all();
        pool.push(vote(3));
        pool.restore_front(drained);

        let order: Vec<_> = pool.drain_all().iter().map(|v| v.submitted_at.as_millis()).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn drained_votes_stay_visible_until_settled() {
        let pool = VotePool::new();
        pool.push(vote(1));
        let receipt = ReceiptId::new(format!("VOTE-{:016X}", 1));

        let drained = pool.drain_all();
        assert_eq!(pool.size(), 0);
        assert!(pool.contains(&receipt));
        assert_eq!(pool.in_flight(), 1);

        pool.settle(&drained);
        assert!(!pool.contains(&receipt));
        assert_eq!(pool.in_flight(), 0);
    }

    #[test]
    fn restored_votes_leave_in_flight() {
        let pool = VotePool::new();
        pool.push(vote(1));
        let drained = pool.drain_all();
        pool.restore_front(drained);
        assert_eq!(pool.in_flight(), 0);
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn contains_queued_receipt() {
        let pool = VotePool::new();
        pool.push(vote(7));
        assert!(pool.contains(&ReceiptId::new(format!("VOTE-{:016X}", 7))));
        assert!(!pool.contains(&ReceiptId::from("VOTE-FFFFFFFFFFFFFFFF")));
    }

    #[test]
    fn concurrent_push_and_drain_lose_nothing() {
        let pool = Arc::new(VotePool::new());
        let producers: Vec<_> = (0..4)
            .map(|t| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for n in 0..250 {
                        pool.push(vote(t * 1_000 + n));
                    }
                })
            })
            .collect();

        let mut drained = Vec::new();
        while producers.iter().any(|p| !p.is_finished()) {
            drained.extend(pool.drain_all());
        }
        for p in producers {
            p.join().unwrap();
        }
        drained.extend(pool.drain_all());

        assert_eq!(drained.len(), 1_000);
        let mut ids: Vec<_> = drained.iter().map(|v| v.receipt_id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 1_000);
    }
}
