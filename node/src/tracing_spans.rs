//! Span constructors shared by the submission, sealing and verification paths.
//!
//! Consistent span names and fields make it easy to follow a single vote from
//! acceptance to confirmation in the logs.

use tracing::{info_span, Span};

/// Span covering one vote submission.
pub fn submit_span(voter: &str, candidate: &str) -> Span {
    info_span!("submit", voter = %voter, candidate = %candidate)
}

/// Span covering one sealing run for the block at `index`.
pub fn seal_span(index: u64, votes: usize) -> Span {
    info_span!("seal", block = index, votes = votes)
}

/// Span covering a receipt lookup.
pub fn verify_span(receipt: &str) -> Span {
    info_span!("verify", receipt = %receipt)
}

/// Span covering an administrative voter reset.
pub fn admin_reset_span(voter: &str) -> Span {
    info_span!("admin_reset", voter = %voter)
}
