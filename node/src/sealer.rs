//! The block sealer: drain the pool, mine a block, append it.
//!
//! Only one sealing run is active at a time. Mining runs on the blocking pool
//! so submissions never wait on it, and it polls a shared cancellation flag.
//! Any failure returns the drained votes to the front of the pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::Instrument;

use evote_ledger::{Block, BlockTemplate, PendingVote, HASH_PREFIX_LEN};
use evote_types::{Clock, LedgerParams};
use evote_work::{expected_attempts, WorkError, WorkGenerator};

use crate::ledger_event::{EventBus, LedgerEvent};
use crate::ledger_state::LedgerState;
use crate::metrics::NodeMetrics;
use crate::tally::TallyBoard;
use crate::tracing_spans::seal_span;
use crate::vote_pool::VotePool;
use crate::{NodeError, SealError};

pub struct BlockSealer {
    ledger: Arc<LedgerState>,
    pool: Arc<VotePool>,
    tally: Arc<TallyBoard>,
    events: Arc<EventBus>,
    metrics: Option<Arc<NodeMetrics>>,
    clock: Arc<dyn Clock>,
    generator: WorkGenerator,
    batch_size: usize,
    run_lock: Mutex<()>,
    cancel: Arc<AtomicBool>,
}

impl BlockSealer {
    pub fn new(
        params: LedgerParams,
        ledger: Arc<LedgerState>,
        pool: Arc<VotePool>,
        tally: Arc<TallyBoard>,
        events: Arc<EventBus>,
        metrics: Option<Arc<NodeMetrics>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        let generator =
            WorkGenerator::new(params.difficulty).map_err(|e| NodeError::Config(e.to_string()))?;
        Ok(Self {
            ledger,
            pool,
            tally,
            events,
            metrics,
            clock,
            generator,
            batch_size: params.batch_size.max(1),
            run_lock: Mutex::new(()),
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn difficulty(&self) -> u32 {
        self.generator.difficulty()
    }

    /// Whether the pool has reached the batch threshold.
    pub fn is_due(&self) -> bool {
        self.pool.size() >= self.batch_size
    }

    /// Seal only if the pool still holds a full batch once this run gets its turn.
    pub async fn seal_if_due(&self) -> Result<Option<Block>, SealError> {
        self.run(true).await
    }

    /// Seal whatever is pooled. An empty pool is a no-op.
    pub async fn seal(&self) -> Result<Option<Block>, SealError> {
        self.run(false).await
    }

    /// Stop the current mining run and refuse further runs.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    async fn run(&self, only_if_due: bool) -> Result<Option<Block>, SealError> {
        let _run = self.run_lock.lock().await;

        if self.is_cancelled() {
            return Err(SealError::Cancelled { attempts: 0 });
        }
        if self.pool.is_empty() {
            return Ok(None);
        }
        if self.ledger.is_corrupted() {
            tracing::warn!(pending = self.pool.size(), "chain corrupted, not sealing");
            return Err(SealError::ChainCorruption);
        }
        if only_if_due && !self.is_due() {
            return Ok(None);
        }

        let votes = self.pool.drain_all();
        if votes.is_empty() {
            return Ok(None);
        }

        let (index, previous_hash) = self.ledger.head();
        let template = BlockTemplate::new(index, self.clock.now(), votes, previous_hash);
        let span = seal_span(index, template.votes.len());
        self.mine_and_append(template).instrument(span).await
    }

    async fn mine_and_append(&self, template: BlockTemplate) -> Result<Option<Block>, SealError> {
        let preimage = match template.preimage() {
            Ok(preimage) => preimage,
            Err(e) => {
                return Err(self.fail(template.into_votes(), SealError::SealerInternal(e.to_string())))
            }
        };

        let generator = self.generator;
        tracing::debug!(
            expected_attempts = expected_attempts(generator.difficulty()),
            "mining block"
        );
        let cancel = Arc::clone(&self.cancel);
        let started = Instant::now();
        let mined =
            tokio::task::spawn_blocking(move || generator.generate(&preimage, &cancel)).await;
        let elapsed = started.elapsed();

        let work = match mined {
            Ok(Ok(work)) => work,
            Ok(Err(WorkError::Cancelled { attempts })) => {
                return Err(self.fail(template.into_votes(), SealError::Cancelled { attempts }))
            }
            Ok(Err(e)) => {
                return Err(self.fail(template.into_votes(), SealError::SealerInternal(e.to_string())))
            }
            Err(e) => {
                return Err(self.fail(
                    template.into_votes(),
                    SealError::SealerInternal(format!("mining task failed: {e}")),
                ))
            }
        };

        let block = template.seal(work);
        let appended = self.ledger.append_with(block.clone(), |sealed| {
            for vote in &sealed.votes {
                self.tally.record(&vote.candidate_id);
            }
        });
        if let Err(e) = appended {
            return Err(self.fail(block.votes, e));
        }
        self.pool.settle(&block.votes);

        for (position, vote) in block.votes.iter().enumerate() {
            self.events.emit(&LedgerEvent::VoteConfirmed {
                receipt: vote.receipt_id.clone(),
                candidate: vote.candidate_id.clone(),
                block_index: block.index,
                position,
            });
        }
        self.events.emit(&LedgerEvent::BlockSealed {
            index: block.index,
            hash: block.hash.clone(),
            votes: block.votes.len(),
            nonce: block.nonce,
        });

        if let Some(m) = &self.metrics {
            m.blocks_sealed.inc();
            m.votes_confirmed.inc_by(block.votes.len() as u64);
            m.mining_time_ms.observe(elapsed.as_secs_f64() * 1_000.0);
            m.chain_length.set(self.ledger.len() as i64);
            m.pool_size.set(self.pool.size() as i64);
        }

        tracing::info!(
            block = block.index,
            hash = %block.hash.prefix(HASH_PREFIX_LEN),
            votes = block.votes.len(),
            nonce = block.nonce,
            elapsed_ms = elapsed.as_millis() as u64,
            "block sealed"
        );
        Ok(Some(block))
    }

    /// Return `votes` to the pool and report `err`.
    fn fail(&self, votes: Vec<PendingVote>, err: SealError) -> SealError {
        let retained = votes.len();
        self.pool.restore_front(votes);

        match &err {
            SealError::Cancelled { attempts } => {
                tracing::warn!(attempts, retained, "mining cancelled, votes returned to pool");
            }
            other => {
                tracing::error!(error = %other, retained, "sealing failed, votes returned to pool");
            }
        }
        if let Some(m) = &self.metrics {
            m.seal_failures.inc();
            m.pool_size.set(self.pool.size() as i64);
        }
        self.events.emit(&LedgerEvent::SealFailed {
            reason: err.to_string(),
            retained_votes: retained,
        });
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evote_ledger::Chain;
    use evote_types::{CandidateId, Constituency, ReceiptId, SystemClock, Timestamp, VoterId};
    use std::sync::atomic::AtomicUsize;

    fn vote(n: u64, candidate: &str) -> PendingVote {
        PendingVote {
            voter_id: VoterId::new(format!("v{n}")),
            candidate_id: CandidateId::from(candidate),
            constituency: Constituency::from("Kochi"),
            submitted_at: Timestamp::from_millis(n),
            verification_hash: format!("{n:064x}"),
            receipt_id: ReceiptId::new(format!("VOTE-{n:016X}")),
        }
    }

    struct Fixture {
        ledger: Arc<LedgerState>,
        pool: Arc<VotePool>,
        tally: Arc<TallyBoard>,
        sealer: BlockSealer,
        confirmed: Arc<AtomicUsize>,
    }

    fn fixture(params: LedgerParams) -> Fixture {
        let ledger = Arc::new(LedgerState::new(
            Chain::new(params.difficulty, Timestamp::from_millis(1)).unwrap(),
        ));
        let pool = Arc::new(VotePool::new());
        let tally = Arc::new(TallyBoard::new());
        let confirmed = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();
        let c = Arc::clone(&confirmed);
        bus.subscribe(Box::new(move |e| {
            if let LedgerEvent::VoteConfirmed { .. } = e {
                c.fetch_add(1, Ordering::SeqCst);
            }
        }));
        let sealer = BlockSealer::new(
            params,
            Arc::clone(&ledger),
            Arc::clone(&pool),
            Arc::clone(&tally),
            Arc::new(bus),
            None,
            Arc::new(SystemClock),
        )
        .unwrap();
        Fixture {
            ledger,
            pool,
            tally,
            sealer,
            confirmed,
        }
    }

    fn params(batch_size: usize) -> LedgerParams {
        LedgerParams {
            difficulty: 1,
            batch_size,
        }
    }

    #[tokio::test]
    async fn empty_pool_is_noop() {
        let f = fixture(params(2));
        assert!(f.sealer.seal().await.unwrap().is_none());
        assert_eq!(f.ledger.len(), 1);
    }

    #[tokio::test]
    async fn seal_appends_votes_in_pool_order() {
        let f = fixture(params(10));
        for n in 0..3 {
            f.pool.push(vote(n, "a"));
        }
        let block = f.sealer.seal().await.unwrap().unwrap();

        assert_eq!(block.index, 1);
        assert!(block.meets_difficulty(1));
        let order: Vec<_> = block.votes.iter().map(|v| v.submitted_at.as_millis()).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(f.ledger.len(), 2);
        assert!(f.pool.is_empty());
        assert_eq!(f.pool.in_flight(), 0);
        assert_eq!(f.tally.count(&CandidateId::from("a")), 3);
        assert_eq!(f.confirmed.load(Ordering::SeqCst), 3);
        assert!(f.ledger.validate().is_ok());
    }

    #[tokio::test]
    async fn seal_if_due_waits_for_full_batch() {
        let f = fixture(params(3));
        f.pool.push(vote(1, "a"));
        f.pool.push(vote(2, "b"));
        assert!(!f.sealer.is_due());
        assert!(f.sealer.seal_if_due().await.unwrap().is_none());
        assert_eq!(f.pool.size(), 2);

        f.pool.push(vote(3, "a"));
        assert!(f.sealer.seal_if_due().await.unwrap().is_some());
        assert_eq!(f.ledger.len(), 2);
    }

    #[tokio::test]
    async fn cancelled_sealer_keeps_votes() {
        let f = fixture(params(10));
        f.pool.push(vote(1, "a"));
        f.sealer.cancel();
        assert!(matches!(f.sealer.seal().await, Err(SealError::Cancelled { .. })));
        assert_eq!(f.pool.size(), 1);
        assert_eq!(f.ledger.len(), 1);
    }

    #[tokio::test]
    async fn corrupted_chain_keeps_votes() {
        let f = fixture(params(10));
        f.pool.push(vote(1, "a"));
        f.ledger.mark_corrupted();
        assert!(matches!(f.sealer.seal().await, Err(SealError::ChainCorruption)));
        assert_eq!(f.pool.size(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_seals_never_duplicate_votes() {
        let f = Arc::new(fixture(params(1)));
        let mut handles = Vec::new();
        for n in 0..20 {
            f.pool.push(vote(n, "a"));
            let f = Arc::clone(&f);
            handles.push(tokio::spawn(async move { f.sealer.seal().await }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        f.sealer.seal().await.unwrap();

        let chain = f.ledger.read();
        assert!(chain.is_valid());
        assert_eq!(chain.total_votes(), 20);
        let mut receipts: Vec<_> = chain.confirmed_votes().map(|c| c.vote.receipt_id).collect();
        receipts.sort();
        receipts.dedup();
        assert_eq!(receipts.len(), 20);
    }
}
