//! Cryptographic primitives for the evote ledger.
//!
//! - **SHA-256** for block hashes and the per-vote verification hash
//! - Random provisional receipt identifiers (`VOTE-` + 16 hex digits)

pub mod hash;
pub mod receipt;

pub use hash::{sha256_hex, sha256_hex_multi, PrefixHasher};
pub use receipt::{generate_receipt_id, verification_hash};
