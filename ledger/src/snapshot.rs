//! Chain snapshots for export and restart.
//!
//! A snapshot is the full block list, the difficulty it was mined at and the
//! revocations recorded against it, serialized with bincode. Restoring checks
//! that the snapshot is complete and self-consistent but does not validate
//! the blocks; callers run [`Chain::is_valid`] on the result and refuse to
//! extend a chain that fails.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use evote_types::{BlockHash, Timestamp};

use crate::{Block, Chain, LedgerError, Revocation};

/// Current snapshot format.
pub const SNAPSHOT_VERSION: u32 = 2;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub version: u32,
    pub created_at: Timestamp,
    pub difficulty: u32,
    /// Hash of the last block at capture time.
    pub head: BlockHash,
    pub blocks: Vec<Block>,
    /// Administrative revocations, oldest first.
    pub revocations: Vec<Revocation>,
}

impl ChainSnapshot {
    pub fn capture(chain: &Chain, revocations: Vec<Revocation>, created_at: Timestamp) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            created_at,
            difficulty: chain.difficulty(),
            head: chain.latest().hash.clone(),
            blocks: chain.blocks().to_vec(),
            revocations,
        }
    }

    /// Serialize the snapshot to bytes (bincode).
    pub fn to_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        bincode::serialize(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    /// Deserialize a snapshot from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        let snapshot: Self =
            bincode::deserialize(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(LedgerError::Serialization(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    /// Whether the recorded head matches the last block.
    pub fn head_matches(&self) -> bool {
        self.blocks.last().map(|b| &b.hash) == Some(&self.head)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Rebuild the chain, discarding the revocations.
    pub fn into_chain(self) -> Result<Chain, LedgerError> {
        self.into_parts().map(|(chain, _)| chain)
    }

    /// Rebuild the chain and return it with the revocations.
    ///
    /// Fails when blocks were cut off after capture, or when a revocation does
    /// not name a sealed vote at its recorded location. Block contents are not
    /// validated.
    pub fn into_parts(self) -> Result<(Chain, Vec<Revocation>), LedgerError> {
        if !self.head_matches() {
            return Err(LedgerError::InvalidSnapshot(format!(
                "recorded head {} is not the last of {} blocks",
                self.head.prefix(crate::HASH_PREFIX_LEN),
                self.blocks.len()
            )));
        }
        let chain = Chain::from_blocks(self.blocks, self.difficulty)?;

        let mut seen = HashSet::new();
        for revocation in &self.revocations {
            if !seen.insert(&revocation.receipt_id) {
                return Err(LedgerError::InvalidSnapshot(format!(
                    "receipt {} revoked twice",
                    revocation.receipt_id
                )));
            }
            match chain.locate(&revocation.receipt_id) {
                Some(confirmed) if confirmed.location == revocation.location() => {}
                _ => {
                    return Err(LedgerError::InvalidSnapshot(format!(
                        "revoked receipt {} is not sealed at block {} position {}",
                        revocation.receipt_id, revocation.block_index, revocation.position
                    )))
                }
            }
        }
        Ok((chain, self.revocations))
    }
}
