use std::sync::atomic::AtomicBool;

use proptest::prelude::*;

use evote_work::{meets_difficulty, validate_work, work_hash, WorkGenerator};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Generated PoW always passes its own validation.
    #[test]
    fn generated_pow_always_valid(
        preimage in prop::collection::vec(any::<u8>(), 0..128),
        difficulty in 0u32..=2,
    ) {
        let generator = WorkGenerator::new(difficulty).unwrap();
        let work = generator.generate(&preimage, &AtomicBool::new(false)).unwrap();
        prop_assert!(
            validate_work(&preimage, work.nonce, difficulty),
            "generated nonce must pass validation"
        );
        prop_assert_eq!(work.hash, work_hash(&preimage, work.nonce));
    }

    /// Zero difficulty always passes regardless of nonce.
    #[test]
    fn zero_difficulty_always_passes(
        preimage in prop::collection::vec(any::<u8>(), 0..64),
        nonce in any::<u64>(),
    ) {
        prop_assert!(validate_work(&preimage, nonce, 0));
    }

    /// Validation is deterministic: same inputs produce same result.
    #[test]
    fn validation_is_deterministic(
        preimage in prop::collection::vec(any::<u8>(), 0..64),
        nonce in any::<u64>(),
        difficulty in 0u32..8,
    ) {
        let r1 = validate_work(&preimage, nonce, difficulty);
        let r2 = validate_work(&preimage, nonce, difficulty);
        prop_assert_eq!(r1, r2);
    }

    /// Lower difficulty is easier to meet: if valid at D, then valid at D-1.
    #[test]
    fn lower_difficulty_is_easier(hash in "[0-9a-f]{64}", difficulty in 1u32..=64) {
        if meets_difficulty(&hash, difficulty) {
            prop_assert!(meets_difficulty(&hash, difficulty - 1));
        }
    }
}
