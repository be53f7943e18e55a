use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("block index {actual} does not extend chain of length {expected}")]
    IndexMismatch { expected: u64, actual: u64 },

    #[error("block {index}: previous hash {actual} does not match chain head {expected}")]
    PreviousHashMismatch {
        index: u64,
        expected: String,
        actual: String,
    },

    #[error("block {index}: stored hash {stored} does not match recomputed {computed}")]
    HashMismatch {
        index: u64,
        stored: String,
        computed: String,
    },

    #[error("block {index}: hash does not carry {difficulty} leading zero digits")]
    InsufficientWork { index: u64, difficulty: u32 },

    #[error("block {index} carries no votes")]
    EmptyBlock { index: u64 },

    #[error("invalid genesis block: {0}")]
    InvalidGenesis(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("inconsistent snapshot: {0}")]
    InvalidSnapshot(String),
}

impl LedgerError {
    /// Index of the offending block, when the error concerns one.
    pub fn block_index(&self) -> Option<u64> {
        match self {
            Self::IndexMismatch { actual, .. } => Some(*actual),
            Self::PreviousHashMismatch { index, .. }
            | Self::HashMismatch { index, .. }
            | Self::InsufficientWork { index, .. }
            | Self::EmptyBlock { index } => Some(*index),
            Self::InvalidGenesis(_) => Some(0),
            Self::Serialization(_) | Self::InvalidSnapshot(_) => None,
        }
    }
}
