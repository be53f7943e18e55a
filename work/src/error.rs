use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkError {
    #[error("difficulty {difficulty} exceeds the {max} hex digits of a SHA-256 hash")]
    DifficultyTooHigh { difficulty: u32, max: u32 },

    #[error("work generation cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },

    #[error("nonce space exhausted")]
    Exhausted,
}
