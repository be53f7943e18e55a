//! Nullable voter store: delegates to an in-memory registry, fails on demand.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use evote_store::{MemoryRegistry, StoreError, VoterStore};
use evote_types::{VoterId, VoterRecord, VotingStatus};

/// A voter store whose status writes can be made to fail and whose reads can stall.
///
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct FlakyVoterStore {
    inner: Arc<MemoryRegistry>,
    failing_writes: AtomicUsize,
    read_delay_ms: AtomicU64,
    writes: AtomicUsize,
}

impl FlakyVoterStore {
    pub fn new(inner: Arc<MemoryRegistry>) -> Self {
        Self {
            inner,
            failing_writes: AtomicUsize::new(0),
            read_delay_ms: AtomicU64::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Make the next `n` status writes fail with `StoreError::Unavailable`.
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Block every voter read for `delay` (zero to disable).
    pub fn delay_reads(&self, delay: Duration) {
        self.read_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of status writes that succeeded.
    pub fn successful_writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl VoterStore for FlakyVoterStore {
    fn get_voter(&self, id: &VoterId) -> Result<VoterRecord, StoreError> {
        let delay = self.read_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        self.inner.get_voter(id)
    }

    fn put_voter(&self, voter: &VoterRecord) -> Result<(), StoreError> {
        self.inner.put_voter(voter)
    }

    fn set_voting_status(&self, id: &VoterId, status: &VotingStatus) -> Result<(), StoreError> {
        if self.take_failure() {
            return Err(StoreError::Unavailable(format!("injected failure writing {id}")));
        }
        self.inner.set_voting_status(id, status)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn voter_count(&self) -> Result<u64, StoreError> {
        self.inner.voter_count()
    }

    fn voted_count(&self) -> Result<u64, StoreError> {
        self.inner.voted_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evote_types::{CandidateId, ReceiptId, Timestamp};

    fn status() -> VotingStatus {
        VotingStatus::voted(
            Timestamp::from_millis(1),
            CandidateId::from("c1"),
            ReceiptId::from("VOTE-0000000000000001"),
        )
    }

    #[test]
    fn injected_failure_leaves_record_unchanged() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.put_voter(&VoterRecord::new("v1", "X").verified()).unwrap();
        let store = FlakyVoterStore::new(Arc::clone(&registry));

        store.fail_next_writes(1);
        assert!(matches!(
            store.set_voting_status(&VoterId::from("v1"), &status()),
            Err(StoreError::Unavailable(_))
        ));
        assert!(!registry.get_voter(&VoterId::from("v1")).unwrap().has_voted());

        store.set_voting_status(&VoterId::from("v1"), &status()).unwrap();
        assert!(registry.get_voter(&VoterId::from("v1")).unwrap().has_voted());
        assert_eq!(store.successful_writes(), 1);
    }
}
