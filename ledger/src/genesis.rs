//! Genesis block creation.
//!
//! The genesis block has index 0, no votes, previous hash `"0"` and nonce 0. It
//! is the only block that is never mined and the only block allowed to be empty.

use evote_types::{BlockHash, Timestamp};

use crate::{Block, LedgerError};

/// Create the genesis block stamped with `timestamp`.
pub fn create_genesis_block(timestamp: Timestamp) -> Result<Block, LedgerError> {
    let mut block = Block {
        index: 0,
        timestamp,
        votes: Vec::new(),
        previous_hash: BlockHash::genesis_parent(),
        nonce: 0,
        hash: BlockHash::new(String::new()),
    };
    block.hash = block.compute_hash()?;
    Ok(block)
}

/// Check the structural shape of a genesis block.
pub(crate) fn check_genesis(block: &Block) -> Result<(), LedgerError> {
    if !block.is_genesis() {
        return Err(LedgerError::InvalidGenesis(format!(
            "index is {}, expected 0",
            block.index
        )));
    }
    if block.previous_hash.as_str() != BlockHash::GENESIS_PARENT {
        return Err(LedgerError::InvalidGenesis(format!(
            "previous hash is {}, expected \"0\"",
            block.previous_hash
        )));
    }
    if !block.votes.is_empty() {
        return Err(LedgerError::InvalidGenesis(format!(
            "carries {} votes",
            block.votes.len()
        )));
    }
    if block.nonce != 0 {
        return Err(LedgerError::InvalidGenesis("nonce must be 0".into()));
    }
    block.verify_hash()
}
