//! The vote node: one owned ledger instance and its sealing loop.
//!
//! Constructed once at process start with injected configuration. `start`
//! spawns the sealing loop; `stop` closes the pool, stops the loop and seals
//! whatever is still pooled; `abort` cancels an in-progress mining run and
//! leaves its votes in the pool.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use evote_ledger::{Block, Chain, ChainSnapshot, ChainStats};
use evote_store::{CandidateStore, VoterStore};
use evote_types::{CandidateId, Clock, Constituency, ReceiptId, SystemClock, VoterId};

use crate::admin::{Revocation, RevocationLog};
use crate::config::NodeConfig;
use crate::ledger_event::EventBus;
use crate::ledger_state::LedgerState;
use crate::metrics::NodeMetrics;
use crate::orchestrator::{
    HealthReport, HistoryEntry, Orchestrator, Receipt, VoteRequest, VoteVerification,
};
use crate::sealer::BlockSealer;
use crate::shutdown::{ShutdownController, ShutdownSignal};
use crate::tally::{ConstituencyResults, TallyBoard};
use crate::vote_pool::VotePool;
use crate::voter_locks::VoterLockTable;
use crate::{AdminError, NodeError, SealError, SubmitError};

/// How long `stop` waits for the sealing loop to finish its current run.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// How often idle voter-lock entries are pruned.
const LOCK_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Assembles a [`VoteNode`] from its collaborators.
pub struct NodeBuilder {
    config: NodeConfig,
    voters: Arc<dyn VoterStore>,
    candidates: Arc<dyn CandidateStore>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    snapshot: Option<ChainSnapshot>,
}

impl NodeBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Start from a previously exported chain instead of a fresh genesis.
    pub fn snapshot(mut self, snapshot: ChainSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn build(self) -> Result<VoteNode, NodeError> {
        let config = self.config;
        config.validate()?;
        let params = config.params();

        let (chain, revocations) = match self.snapshot {
            Some(snapshot) => {
                if snapshot.difficulty != params.difficulty {
                    return Err(NodeError::Config(format!(
                        "snapshot difficulty {} does not match configured difficulty {}",
                        snapshot.difficulty, params.difficulty
                    )));
                }
                tracing::info!(
                    blocks = snapshot.block_count(),
                    revocations = snapshot.revocations.len(),
                    "restoring chain from snapshot"
                );
                snapshot.into_parts()?
            }
            None => (Chain::new(params.difficulty, self.clock.now())?, Vec::new()),
        };

        let metrics = if config.enable_metrics {
            let m = NodeMetrics::new().map_err(|e| NodeError::Config(e.to_string()))?;
            m.chain_length.set(chain.len() as i64);
            Some(Arc::new(m))
        } else {
            None
        };

        let revoked: HashSet<_> = revocations.iter().map(|r| r.receipt_id.clone()).collect();
        let tally = Arc::new(TallyBoard::from_chain(&chain, &revoked));
        let ledger = Arc::new(LedgerState::new(chain));
        let pool = Arc::new(VotePool::new());
        let events = Arc::new(self.events);

        let sealer = Arc::new(BlockSealer::new(
            params,
            Arc::clone(&ledger),
            Arc::clone(&pool),
            Arc::clone(&tally),
            Arc::clone(&events),
            metrics.clone(),
            Arc::clone(&self.clock),
        )?);

        let seal_signal = Arc::new(Notify::new());
        let orchestrator = Arc::new(Orchestrator {
            voters: self.voters,
            candidates: self.candidates,
            locks: VoterLockTable::new(config.lock_timeout()),
            pool,
            ledger,
            tally,
            revocations: RevocationLog::from_entries(revocations),
            events,
            metrics: metrics.clone(),
            clock: self.clock,
            seal_signal: Arc::clone(&seal_signal),
        });

        Ok(VoteNode {
            config,
            orchestrator,
            sealer,
            seal_signal,
            metrics,
            shutdown: ShutdownController::new(),
            task_handles: Vec::new(),
        })
    }
}

pub struct VoteNode {
    config: NodeConfig,
    orchestrator: Arc<Orchestrator>,
    sealer: Arc<BlockSealer>,
    seal_signal: Arc<Notify>,
    metrics: Option<Arc<NodeMetrics>>,
    shutdown: ShutdownController,
    /// Handles for spawned background tasks (joined during shutdown).
    task_handles: Vec<JoinHandle<()>>,
}

impl VoteNode {
    pub fn builder(
        config: NodeConfig,
        voters: Arc<dyn VoterStore>,
        candidates: Arc<dyn CandidateStore>,
    ) -> NodeBuilder {
        NodeBuilder {
            config,
            voters,
            candidates,
            clock: Arc::new(SystemClock),
            events: EventBus::new(),
            snapshot: None,
        }
    }

    /// A node with a fresh chain, the system clock and no event listeners.
    pub fn new(
        config: NodeConfig,
        voters: Arc<dyn VoterStore>,
        candidates: Arc<dyn CandidateStore>,
    ) -> Result<Self, NodeError> {
        Self::builder(config, voters, candidates).build()
    }

    /// Spawn the sealing loop and the lock-table pruner.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        if !self.task_handles.is_empty() {
            return Err(NodeError::AlreadyStarted);
        }
        tracing::info!(
            difficulty = self.config.difficulty,
            batch_size = self.config.batch_size,
            flush_interval_secs = self.config.flush_interval_secs,
            blocks = self.orchestrator.ledger.len(),
            "vote node starting"
        );
        if self.orchestrator.ledger.is_corrupted() {
            tracing::warn!("chain failed validation at startup, running fail-closed");
        }

        self.task_handles.push(tokio::spawn(sealing_loop(
            Arc::clone(&self.sealer),
            Arc::clone(&self.seal_signal),
            self.config.flush_interval(),
            self.shutdown.subscribe(),
        )));

        let orchestrator = Arc::clone(&self.orchestrator);
        let mut shutdown_rx = self.shutdown.subscribe();
        self.task_handles.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(LOCK_PRUNE_INTERVAL);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    _ = interval.tick() => orchestrator.prune_locks().await,
                }
            }
        }));
        Ok(())
    }

    /// Close the pool, stop background tasks, then seal anything still pooled.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!(pending = self.orchestrator.pending_count(), "vote node stopping");
        self.orchestrator.pool.close();
        self.shutdown.shutdown();
        self.join_tasks().await;

        let result = match self.sealer.seal().await {
            Ok(Some(block)) => {
                tracing::info!(block = block.index, votes = block.votes.len(), "final flush sealed");
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(SealError::Cancelled { .. }) => Ok(()),
            Err(e) => Err(NodeError::Seal(e)),
        };

        tracing::info!(stats = ?self.stats(), "vote node stopped");
        result
    }

    /// Cancel mining and stop without a final seal. Pooled votes stay pooled.
    pub async fn abort(&mut self) {
        tracing::warn!(pending = self.orchestrator.pending_count(), "vote node aborting");
        self.orchestrator.pool.close();
        self.sealer.cancel();
        self.shutdown.shutdown();
        self.join_tasks().await;
    }

    async fn join_tasks(&mut self) {
        let handles: Vec<JoinHandle<()>> = self.task_handles.drain(..).collect();
        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all).await.is_err() {
            tracing::warn!(
                "shutdown timeout ({:?}), sealing loop may still be running",
                SHUTDOWN_TIMEOUT
            );
        }
    }

    pub async fn submit(&self, request: VoteRequest) -> Result<Receipt, SubmitError> {
        self.orchestrator.submit(request).await
    }

    pub fn verify(&self, receipt: &ReceiptId) -> VoteVerification {
        self.orchestrator.verify(receipt)
    }

    pub fn history(&self, voter: &VoterId) -> Vec<HistoryEntry> {
        self.orchestrator.history(voter)
    }

    pub fn stats(&self) -> ChainStats {
        self.orchestrator.stats()
    }

    pub fn health_check(&self) -> HealthReport {
        self.orchestrator.health_check()
    }

    pub async fn admin_reset_voter(
        &self,
        voter: &VoterId,
        reason: &str,
    ) -> Result<Revocation, AdminError> {
        self.orchestrator.admin_reset_voter(voter, reason).await
    }

    /// Seal the pool now regardless of batch size.
    pub async fn seal_now(&self) -> Result<Option<Block>, SealError> {
        self.sealer.seal().await
    }

    pub fn tallies(&self) -> BTreeMap<CandidateId, u64> {
        self.orchestrator.tallies()
    }

    pub fn results(&self, constituency: &Constituency) -> ConstituencyResults {
        self.orchestrator.results(constituency)
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        self.orchestrator.snapshot()
    }

    /// Shared handle for issuing submissions from many tasks.
    pub fn orchestrator(&self) -> Arc<Orchestrator> {
        Arc::clone(&self.orchestrator)
    }

    pub fn metrics(&self) -> Option<&NodeMetrics> {
        self.metrics.as_deref()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }
}

/// Seal when the pool reaches a full batch or the flush interval elapses.
async fn sealing_loop(
    sealer: Arc<BlockSealer>,
    signal: Arc<Notify>,
    flush_interval: Option<Duration>,
    mut shutdown_rx: ShutdownSignal,
) {
    let mut flush = flush_interval.map(|period| {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval
    });

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                tracing::debug!("sealing loop shutting down");
                break;
            }
            _ = signal.notified() => {
                while sealer.is_due() {
                    match sealer.seal_if_due().await {
                        Ok(Some(_)) => {}
                        Ok(None) | Err(_) => break,
                    }
                }
            }
            _ = async {
                match flush.as_mut() {
                    Some(interval) => { interval.tick().await; }
                    None => std::future::pending::<()>().await,
                }
            } => {
                // Failures are logged and reported by the sealer itself.
                let _ = sealer.seal().await;
            }
        }
    }
}
