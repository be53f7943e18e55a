//! PoW generation (single thread, cooperatively cancellable).

use std::fmt::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use evote_crypto::PrefixHasher;

use crate::{meets_difficulty, WorkError, WorkNonce};

/// Attempts between checks of the cancellation flag.
const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Searches for a nonce that seals a block preimage at a fixed difficulty.
#[derive(Clone, Copy, Debug)]
pub struct WorkGenerator {
    difficulty: u32,
}

impl WorkGenerator {
    pub const MAX_DIFFICULTY: u32 = 64;

    pub fn new(difficulty: u32) -> Result<Self, WorkError> {
        if difficulty > Self::MAX_DIFFICULTY {
            return Err(WorkError::DifficultyTooHigh {
                difficulty,
                max: Self::MAX_DIFFICULTY,
            });
        }
        Ok(Self { difficulty })
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Find the smallest nonce, counting up from 0, whose hash meets the difficulty.
    ///
    /// `cancel` is polled every few thousand attempts; once set the search stops
    /// with [`WorkError::Cancelled`].
    pub fn generate(&self, preimage: &[u8], cancel: &AtomicBool) -> Result<WorkNonce, WorkError> {
        let primed = PrefixHasher::new(preimage);
        let mut suffix = String::with_capacity(20);
        let mut nonce: u64 = 0;

        loop {
            if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                return Err(WorkError::Cancelled { attempts: nonce });
            }

            suffix.clear();
            // Writing into a String cannot fail.
            let _ = write!(suffix, "{nonce}");
            let hash = primed.finish_with(suffix.as_bytes());
            if meets_difficulty(&hash, self.difficulty) {
                return Ok(WorkNonce { nonce, hash });
            }

            nonce = nonce.checked_add(1).ok_or(WorkError::Exhausted)?;
        }
    }
}
