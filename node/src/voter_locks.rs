use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use evote_types::VoterId;

/// Per-voter exclusivity for check-then-act on the voting status.
/// Submissions for different voters proceed concurrently.
/// Submissions for the same voter are serialized.
pub struct VoterLockTable {
    /// Per-voter mutexes
    voter_locks: Arc<Mutex<HashMap<VoterId, Arc<Mutex<()>>>>>,
    /// How long to wait for a contended voter lock
    timeout: Duration,
}

/// Returned when a voter lock could not be acquired in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockTimeout;

/// Held for the duration of a voter's critical section.
pub struct VoterGuard {
    _guard: OwnedMutexGuard<()>,
}

impl VoterLockTable {
    pub fn new(timeout: Duration) -> Self {
        Self {
            voter_locks: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    /// Get or create the lock for a specific voter.
    async fn get_voter_lock(&self, voter: &VoterId) -> Arc<Mutex<()>> {
        let mut locks = self.voter_locks.lock().await;
        locks
            .entry(voter.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Acquire the voter's lock, giving up after the configured timeout.
    pub async fn acquire(&self, voter: &VoterId) -> Result<VoterGuard, LockTimeout> {
        let lock = self.get_voter_lock(voter).await;
        match tokio::time::timeout(self.timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(VoterGuard { _guard: guard }),
            Err(_) => {
                tracing::debug!(voter = %voter, timeout_ms = self.timeout.as_millis() as u64, "voter lock timed out");
                Err(LockTimeout)
            }
        }
    }

    /// Number of voters with a lock entry.
    pub async fn tracked_voters(&self) -> usize {
        let locks = self.voter_locks.lock().await;
        locks.len()
    }

    /// Drop lock entries nobody is holding or waiting on.
    pub async fn cleanup(&self) {
        let mut locks = self.voter_locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}
