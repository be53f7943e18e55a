use std::sync::atomic::AtomicBool;

use proptest::prelude::*;

use evote_ledger::{BlockTemplate, Chain, PendingVote};
use evote_types::{CandidateId, Constituency, ReceiptId, Timestamp, VoterId};
use evote_work::WorkGenerator;

fn build_chain(batches: &[Vec<u8>]) -> Chain {
    let mut chain = Chain::new(1, Timestamp::from_millis(1)).unwrap();
    let mut serial = 0u64;
    for batch in batches {
        let votes = batch
            .iter()
            .map(|candidate| {
                serial += 1;
                PendingVote {
                    voter_id: VoterId::new(format!("voter-{serial}")),
                    candidate_id: CandidateId::new(format!("c{candidate}")),
                    constituency: Constituency::from("Chennai"),
                    submitted_at: Timestamp::from_millis(serial),
                    verification_hash: format!("{serial:064x}"),
                    receipt_id: ReceiptId::new(format!("VOTE-{serial:016X}")),
                }
            })
            .collect();
        let template = BlockTemplate::new(
            chain.next_index(),
            Timestamp::from_millis(1_000 + chain.next_index()),
            votes,
            chain.latest().hash.clone(),
        );
        let work = WorkGenerator::new(1)
            .unwrap()
            .generate(&template.preimage().unwrap(), &AtomicBool::new(false))
            .unwrap();
        chain.append(template.seal(work)).unwrap();
    }
    chain
}

fn batches() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(0u8..4, 1..5), 1..5)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn tally_matches_vote_count(batches in batches()) {
        let chain = build_chain(&batches);
        let expected: usize = batches.iter().map(Vec::len).sum();
        prop_assert_eq!(chain.total_votes(), expected);
        prop_assert_eq!(chain.tally().values().sum::<u64>() as usize, expected);
        prop_assert!(chain.is_valid());
    }

    #[test]
    fn any_candidate_tamper_is_detected(
        batches in batches(),
        pick in any::<prop::sample::Index>(),
    ) {
        let chain = build_chain(&batches);
        let mut blocks = chain.into_blocks();
        let sealed: Vec<(usize, usize)> = blocks
            .iter()
            .enumerate()
            .skip(1)
            .flat_map(|(b, block)| (0..block.votes.len()).map(move |v| (b, v)))
            .collect();
        let (b, v) = sealed[pick.index(sealed.len())];
        blocks[b].votes[v].candidate_id = CandidateId::from("forged");

        let tampered = Chain::from_blocks(blocks, 1).unwrap();
        prop_assert!(!tampered.is_valid());
    }

    #[test]
    fn every_receipt_is_locatable(batches in batches()) {
        let chain = build_chain(&batches);
        for confirmed in chain.confirmed_votes() {
            let found = chain.locate(&confirmed.vote.receipt_id).unwrap();
            prop_assert_eq!(found.location, confirmed.location);
        }
    }
}
