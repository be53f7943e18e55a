use proptest::prelude::*;

use evote_types::{BlockHash, ReceiptId};

proptest! {
    /// A hash's leading-zero count never exceeds its length and matches a
    /// zero-only prefix of that length.
    #[test]
    fn leading_zero_count_is_consistent(hex in "[0-9a-f]{0,64}") {
        let h = BlockHash::new(hex.clone());
        let zeros = h.leading_zero_digits();
        prop_assert!(zeros <= hex.len());
        prop_assert!(h.prefix(zeros).bytes().all(|b| b == b'0'));
        if zeros < hex.len() {
            prop_assert_ne!(hex.as_bytes()[zeros], b'0');
        }
    }

    /// Any 16 hex digits after the prefix form a well-formed receipt.
    #[test]
    fn receipt_with_sixteen_hex_digits_is_well_formed(digits in "[0-9A-F]{16}") {
        let receipt = ReceiptId::new(format!("{}{}", ReceiptId::PREFIX, digits));
        prop_assert!(receipt.is_well_formed());
    }
}
