//! Append-only, hash-linked vote chain.
//!
//! Votes are batched into blocks; each block commits to its predecessor's hash
//! and carries a proof-of-work nonce. The chain is a plain value: locking,
//! sealing and eligibility live in `evote-node`.

pub mod block;
pub mod chain;
pub mod error;
pub mod genesis;
pub mod revocation;
pub mod snapshot;
pub mod vote;

pub use block::{Block, BlockTemplate};
pub use chain::{Chain, ChainStats};
pub use error::LedgerError;
pub use genesis::create_genesis_block;
pub use revocation::Revocation;
pub use snapshot::ChainSnapshot;
pub use vote::{ConfirmedVote, PendingVote, VoteLocation};

/// Number of hex digits shown wherever a hash is abbreviated.
pub const HASH_PREFIX_LEN: usize = 16;
