//! Fundamental types for the evote ledger.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! identifiers, block hashes, timestamps and clocks, ledger parameters, and the
//! voter/candidate records read from the external registry.

pub mod block;
pub mod candidate;
pub mod ids;
pub mod params;
pub mod time;
pub mod voter;

pub use block::BlockHash;
pub use candidate::{CandidateRecord, CandidateStatus};
pub use ids::{CandidateId, Constituency, ReceiptId, VoterId};
pub use params::LedgerParams;
pub use time::{Clock, SystemClock, Timestamp};
pub use voter::{VoterRecord, VotingStatus};
