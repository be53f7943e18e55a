//! Proof-of-work for vote blocks.
//!
//! A block is sealed by finding a nonce such that
//! `SHA256(preimage ++ nonce)` starts with `difficulty` zero hex digits. This is
//! an integrity mechanism for the single-writer chain, not Sybil resistance:
//! the search is sequential within a block and can be cancelled cooperatively.

pub mod difficulty;
pub mod error;
pub mod generator;
pub mod validator;

pub use difficulty::{expected_attempts, meets_difficulty};
pub use error::WorkError;
pub use generator::WorkGenerator;
pub use validator::{validate_work, work_hash};

/// The result of a successful nonce search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkNonce {
    pub nonce: u64,
    /// Hex digest of `preimage ++ nonce`.
    pub hash: String,
}
