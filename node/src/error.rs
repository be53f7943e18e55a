use thiserror::Error;

use evote_store::StoreError;

/// Node-level failures: configuration, construction and lifecycle.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] evote_ledger::LedgerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("seal error: {0}")]
    Seal(#[from] SealError),

    #[error("config error: {0}")]
    Config(String),

    #[error("node already started")]
    AlreadyStarted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("shutdown timeout")]
    ShutdownTimeout,
}

/// Why a vote submission was refused.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("voter is not eligible: {0}")]
    NotEligible(String),

    #[error("voter has already voted")]
    AlreadyVoted,

    #[error("invalid candidate: {0}")]
    InvalidCandidate(String),

    #[error("voter lock contended, retry later")]
    Busy,

    #[error("chain integrity check failed; submissions are suspended")]
    ChainCorruption,

    #[error("node is shutting down")]
    ShuttingDown,

    #[error("voter store error: {0}")]
    Store(#[from] StoreError),
}

impl SubmitError {
    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

/// Why a sealing run produced no block. Drained votes are always returned to the pool.
#[derive(Debug, Error)]
pub enum SealError {
    #[error("sealer internal error: {0}")]
    SealerInternal(String),

    #[error("chain is corrupted; refusing to append")]
    ChainCorruption,

    #[error("mining cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },
}

/// Why an administrative reset was refused.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("unknown voter: {0}")]
    UnknownVoter(String),

    #[error("voter has not voted")]
    NotVoted,

    #[error("vote is still pending; wait for it to be sealed")]
    VotePending,

    #[error("vote {0} not found in chain")]
    VoteNotFound(String),

    #[error("voter lock contended, retry later")]
    Busy,

    #[error("chain integrity check failed")]
    ChainCorruption,

    #[error("voter store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_busy_is_retryable() {
        assert!(SubmitError::Busy.is_retryable());
        assert!(!SubmitError::AlreadyVoted.is_retryable());
        assert!(!SubmitError::NotEligible("otp".into()).is_retryable());
        assert!(!SubmitError::InvalidCandidate("c9".into()).is_retryable());
        assert!(!SubmitError::ChainCorruption.is_retryable());
        assert!(!SubmitError::ShuttingDown.is_retryable());
        assert!(!SubmitError::Store(StoreError::Unavailable("down".into())).is_retryable());
    }
}
