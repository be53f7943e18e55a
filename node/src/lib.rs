//! evote node: the vote ledger service.
//!
//! The node ties together:
//! - the eligibility gate and per-voter locks that make voting exactly-once
//! - the vote pool that stages accepted votes
//! - the block sealer that mines pooled votes into the chain
//! - tallies, administrative resets and integrity checks over the chain

pub mod admin;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod ledger_event;
pub mod ledger_state;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod orchestrator;
pub mod sealer;
pub mod shutdown;
pub mod tally;
pub mod tracing_spans;
pub mod vote_pool;
pub mod voter_locks;

pub use admin::{Revocation, RevocationLog};
pub use config::NodeConfig;
pub use eligibility::{can_vote, Ineligibility};
pub use error::{AdminError, NodeError, SealError, SubmitError};
pub use ledger_event::{EventBus, LedgerEvent};
pub use ledger_state::LedgerState;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::{NodeBuilder, VoteNode};
pub use orchestrator::{
    HealthReport, HistoryEntry, Orchestrator, Receipt, ReceiptStatus, VerificationStatus,
    VoteRequest, VoteVerification,
};
pub use sealer::BlockSealer;
pub use shutdown::{ShutdownController, ShutdownSignal};
pub use tally::{CandidateResult, ConstituencyResults, TallyBoard, TallyDivergence};
pub use vote_pool::VotePool;
pub use voter_locks::VoterLockTable;
