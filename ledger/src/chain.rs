//! The chain: an ordered, append-only sequence of sealed blocks.

use std::collections::{BTreeMap, HashMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use evote_types::{CandidateId, ReceiptId, Timestamp, VoterId};

use crate::genesis::{check_genesis, create_genesis_block};
use crate::{Block, ConfirmedVote, LedgerError, VoteLocation, HASH_PREFIX_LEN};

/// Read-only summary of the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStats {
    pub block_count: usize,
    /// Votes in all sealed blocks (genesis holds none).
    pub total_votes: usize,
    pub pending_count: usize,
    pub chain_valid: bool,
    pub latest_index: u64,
    pub latest_hash_prefix: String,
}

/// Append-only vote chain.
///
/// The chain never holds fewer than one block. `append` enforces linkage and
/// proof-of-work for every new block; `from_blocks` does not, so a restored
/// chain must be checked with [`Chain::is_valid`] before it is trusted.
#[derive(Clone, Debug)]
pub struct Chain {
    blocks: Vec<Block>,
    difficulty: u32,
    receipts: HashMap<ReceiptId, VoteLocation>,
}

impl Chain {
    /// A fresh chain holding only a genesis block stamped `genesis_time`.
    pub fn new(difficulty: u32, genesis_time: Timestamp) -> Result<Self, LedgerError> {
        Ok(Self {
            blocks: vec![create_genesis_block(genesis_time)?],
            difficulty,
            receipts: HashMap::new(),
        })
    }

    /// Rebuild a chain from stored blocks without validating them.
    pub fn from_blocks(blocks: Vec<Block>, difficulty: u32) -> Result<Self, LedgerError> {
        if blocks.is_empty() {
            return Err(LedgerError::InvalidGenesis("chain has no blocks".into()));
        }
        let mut receipts = HashMap::new();
        for block in &blocks {
            index_receipts(&mut receipts, block);
        }
        Ok(Self {
            blocks,
            difficulty,
            receipts,
        })
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn latest(&self) -> &Block {
        // Construction guarantees at least the genesis block.
        &self.blocks[self.blocks.len() - 1]
    }

    /// Index the next appended block must carry.
    pub fn next_index(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn get(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.blocks.get(i))
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// Append a sealed block after checking it extends the current head.
    pub fn append(&mut self, block: Block) -> Result<(), LedgerError> {
        let expected = self.next_index();
        if block.index != expected {
            return Err(LedgerError::IndexMismatch {
                expected,
                actual: block.index,
            });
        }
        if block.votes.is_empty() {
            return Err(LedgerError::EmptyBlock { index: block.index });
        }
        let head = &self.latest().hash;
        if &block.previous_hash != head {
            return Err(LedgerError::PreviousHashMismatch {
                index: block.index,
                expected: head.to_string(),
                actual: block.previous_hash.to_string(),
            });
        }
        block.verify_hash()?;
        if !block.meets_difficulty(self.difficulty) {
            return Err(LedgerError::InsufficientWork {
                index: block.index,
                difficulty: self.difficulty,
            });
        }

        index_receipts(&mut self.receipts, &block);
        self.blocks.push(block);
        Ok(())
    }

    /// Check block `i` against its stored hash, its predecessor and the difficulty.
    fn check_block(&self, i: usize) -> Result<(), LedgerError> {
        let block = &self.blocks[i];
        if i == 0 {
            return check_genesis(block);
        }
        if block.index != i as u64 {
            return Err(LedgerError::IndexMismatch {
                expected: i as u64,
                actual: block.index,
            });
        }
        block.verify_hash()?;
        let previous = &self.blocks[i - 1].hash;
        if &block.previous_hash != previous {
            return Err(LedgerError::PreviousHashMismatch {
                index: block.index,
                expected: previous.to_string(),
                actual: block.previous_hash.to_string(),
            });
        }
        if !block.meets_difficulty(self.difficulty) {
            return Err(LedgerError::InsufficientWork {
                index: block.index,
                difficulty: self.difficulty,
            });
        }
        Ok(())
    }

    /// Full re-verification of every block. Blocks are checked in parallel.
    pub fn is_valid(&self) -> bool {
        (0..self.blocks.len())
            .into_par_iter()
            .all(|i| self.check_block(i).is_ok())
    }

    /// The first block that fails verification, with the reason.
    pub fn first_invalid(&self) -> Option<LedgerError> {
        (0..self.blocks.len())
            .into_par_iter()
            .find_map_first(|i| self.check_block(i).err())
    }

    /// Every sealed vote in chain order.
    pub fn confirmed_votes(&self) -> impl Iterator<Item = ConfirmedVote> + '_ {
        self.blocks.iter().flat_map(|block| {
            block
                .votes
                .iter()
                .enumerate()
                .map(move |(position, vote)| ConfirmedVote {
                    vote: vote.clone(),
                    location: VoteLocation {
                        block_index: block.index,
                        position,
                    },
                    block_hash: block.hash.clone(),
                    sealed_at: block.timestamp,
                })
        })
    }

    /// All sealed votes cast by `voter`, in chain order.
    pub fn history(&self, voter: &VoterId) -> Vec<ConfirmedVote> {
        self.confirmed_votes()
            .filter(|c| &c.vote.voter_id == voter)
            .collect()
    }

    /// Look up a sealed vote by its receipt.
    pub fn locate(&self, receipt: &ReceiptId) -> Option<ConfirmedVote> {
        let location = *self.receipts.get(receipt)?;
        let block = self.get(location.block_index)?;
        let vote = block.votes.get(location.position)?;
        Some(ConfirmedVote {
            vote: vote.clone(),
            location,
            block_hash: block.hash.clone(),
            sealed_at: block.timestamp,
        })
    }

    pub fn total_votes(&self) -> usize {
        self.blocks.iter().map(Block::vote_count).sum()
    }

    /// Sealed votes per candidate, skipping receipts in `revoked`.
    pub fn tally_excluding(&self, revoked: &HashSet<ReceiptId>) -> BTreeMap<CandidateId, u64> {
        let mut tally = BTreeMap::new();
        for vote in self.blocks.iter().flat_map(|b| b.votes.iter()) {
            if revoked.contains(&vote.receipt_id) {
                continue;
            }
            *tally.entry(vote.candidate_id.clone()).or_insert(0) += 1;
        }
        tally
    }

    /// Sealed votes per candidate.
    pub fn tally(&self) -> BTreeMap<CandidateId, u64> {
        self.tally_excluding(&HashSet::new())
    }

    /// Sealed votes for a single candidate.
    pub fn tally_for(&self, candidate: &CandidateId) -> u64 {
        self.blocks
            .iter()
            .flat_map(|b| b.votes.iter())
            .filter(|v| &v.candidate_id == candidate)
            .count() as u64
    }

    pub fn stats(&self, pending_count: usize) -> ChainStats {
        let latest = self.latest();
        ChainStats {
            block_count: self.len(),
            total_votes: self.total_votes(),
            pending_count,
            chain_valid: self.is_valid(),
            latest_index: latest.index,
            latest_hash_prefix: latest.hash.prefix(HASH_PREFIX_LEN).to_string(),
        }
    }
}

fn index_receipts(receipts: &mut HashMap<ReceiptId, VoteLocation>, block: &Block) {
    for (position, vote) in block.votes.iter().enumerate() {
        receipts.insert(
            vote.receipt_id.clone(),
            VoteLocation {
                block_index: block.index,
                position,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlockTemplate, PendingVote};
    use evote_types::{BlockHash, Constituency};
    use evote_work::WorkGenerator;
    use std::sync::atomic::AtomicBool;

    const DIFFICULTY: u32 = 1;

    fn vote(voter: &str, candidate: &str, n: u64) -> PendingVote {
        PendingVote {
            voter_id: VoterId::from(voter),
            candidate_id: CandidateId::from(candidate),
            constituency: Constituency::from("Hyderabad"),
            submitted_at: Timestamp::from_millis(10_000 + n),
            verification_hash: format!("{n:064x}"),
            receipt_id: ReceiptId::new(format!("VOTE-{n:016X}")),
        }
    }

    fn mine(chain: &Chain, votes: Vec<PendingVote>) -> Block {
        let template = BlockTemplate::new(
            chain.next_index(),
            Timestamp::from_millis(20_000 + chain.next_index()),
            votes,
            chain.latest().hash.clone(),
        );
        let work = WorkGenerator::new(chain.difficulty())
            .unwrap()
            .generate(&template.preimage().unwrap(), &AtomicBool::new(false))
            .unwrap();
        template.seal(work)
    }

    fn chain_with_two_blocks() -> Chain {
        let mut chain = Chain::new(DIFFICULTY, Timestamp::from_millis(1)).unwrap();
        let b1 = mine(&chain, vec![vote("alice", "c1", 1), vote("bob", "c2", 2)]);
        chain.append(b1).unwrap();
        let b2 = mine(&chain, vec![vote("carol", "c1", 3)]);
        chain.append(b2).unwrap();
        chain
    }

    #[test]
    fn fresh_chain_is_valid() {
        let chain = Chain::new(4, Timestamp::from_millis(1)).unwrap();
        assert_eq!(chain.len(), 1);
        assert!(chain.is_valid());
        assert_eq!(chain.total_votes(), 0);
    }

    #[test]
    fn append_and_query() {
        let chain = chain_with_two_blocks();
        assert_eq!(chain.len(), 3);
        assert!(chain.is_valid());
        assert_eq!(chain.total_votes(), 3);
        assert_eq!(chain.tally_for(&CandidateId::from("c1")), 2);
        assert_eq!(chain.tally().get(&CandidateId::from("c2")), Some(&1));

        let history = chain.history(&VoterId::from("bob"));
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].block_index(), 1);
        assert_eq!(history[0].location.position, 1);
        assert_eq!(history[0].block_hash_prefix().len(), HASH_PREFIX_LEN);
    }

    #[test]
    fn locate_by_receipt() {
        let chain = chain_with_two_blocks();
        let found = chain.locate(&ReceiptId::new(format!("VOTE-{:016X}", 3))).unwrap();
        assert_eq!(found.location, VoteLocation { block_index: 2, position: 0 });
        assert_eq!(found.block_hash, chain.latest().hash);
        assert!(chain.locate(&ReceiptId::from("VOTE-FFFFFFFFFFFFFFFF")).is_none());
    }

    #[test]
    fn append_rejects_wrong_index() {
        let mut chain = chain_with_two_blocks();
        let mut block = mine(&chain, vec![vote("dave", "c1", 4)]);
        block.index = 7;
        assert!(matches!(
            chain.append(block),
            Err(LedgerError::IndexMismatch { expected: 3, actual: 7 })
        ));
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn append_rejects_stale_parent() {
        let mut chain = Chain::new(DIFFICULTY, Timestamp::from_millis(1)).unwrap();
        let stale = mine(&chain, vec![vote("alice", "c1", 1)]);
        let fresh = mine(&chain, vec![vote("bob", "c1", 2)]);
        chain.append(fresh).unwrap();

        let mut stale = stale;
        stale.index = 2;
        assert!(chain.append(stale).is_err());
    }

    #[test]
    fn append_rejects_empty_block() {
        let mut chain = Chain::new(0, Timestamp::from_millis(1)).unwrap();
        let block = mine(&chain, vec![]);
        assert!(matches!(chain.append(block), Err(LedgerError::EmptyBlock { index: 1 })));
    }

    #[test]
    fn append_rejects_unmined_block() {
        let mut chain = Chain::new(6, Timestamp::from_millis(1)).unwrap();
        let mut block = Block {
            index: 1,
            timestamp: Timestamp::from_millis(2),
            votes: vec![vote("alice", "c1", 1)],
            previous_hash: chain.latest().hash.clone(),
            nonce: 0,
            hash: BlockHash::new(""),
        };
        block.hash = block.compute_hash().unwrap();
        if block.meets_difficulty(6) {
            return;
        }
        assert!(matches!(
            chain.append(block),
            Err(LedgerError::InsufficientWork { index: 1, difficulty: 6 })
        ));
    }

    #[test]
    fn tampering_is_detected() {
        let chain = chain_with_two_blocks();
        let mut blocks = chain.into_blocks();
        blocks[1].votes[0].candidate_id = CandidateId::from("c2");
        let tampered = Chain::from_blocks(blocks, DIFFICULTY).unwrap();
        assert!(!tampered.is_valid());
        assert!(matches!(
            tampered.first_invalid(),
            Some(LedgerError::HashMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn rehashed_tamper_breaks_link() {
        let chain = chain_with_two_blocks();
        let mut blocks = chain.into_blocks();
        blocks[1].votes.pop();
        // Re-mine block 1 so its own hash is consistent again.
        let template = BlockTemplate::new(
            1,
            blocks[1].timestamp,
            blocks[1].votes.clone(),
            blocks[0].hash.clone(),
        );
        let work = WorkGenerator::new(DIFFICULTY)
            .unwrap()
            .generate(&template.preimage().unwrap(), &AtomicBool::new(false))
            .unwrap();
        blocks[1] = template.seal(work);
        let tampered = Chain::from_blocks(blocks, DIFFICULTY).unwrap();
        assert!(matches!(
            tampered.first_invalid(),
            Some(LedgerError::PreviousHashMismatch { index: 2, .. })
        ));
    }

    #[test]
    fn tally_excludes_revoked() {
        let chain = chain_with_two_blocks();
        let revoked: HashSet<_> = [ReceiptId::new(format!("VOTE-{:016X}", 1))].into();
        let tally = chain.tally_excluding(&revoked);
        assert_eq!(tally.get(&CandidateId::from("c1")), Some(&1));
        assert_eq!(tally.get(&CandidateId::from("c2")), Some(&1));
    }

    #[test]
    fn stats_summarise_chain() {
        let chain = chain_with_two_blocks();
        let stats = chain.stats(4);
        assert_eq!(stats.block_count, 3);
        assert_eq!(stats.total_votes, 3);
        assert_eq!(stats.pending_count, 4);
        assert!(stats.chain_valid);
        assert_eq!(stats.latest_index, 2);
        assert_eq!(stats.latest_hash_prefix, chain.latest().hash.prefix(16));
    }

    #[test]
    fn from_blocks_requires_genesis() {
        assert!(Chain::from_blocks(vec![], 1).is_err());
    }
}
