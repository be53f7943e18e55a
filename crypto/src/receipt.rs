//! Provisional receipt material.

use rand::RngCore;

use evote_types::{CandidateId, ReceiptId, VoterId};

use crate::hash::sha256_hex_multi;

/// Tamper-evident hash binding a vote to its voter, candidate and session.
///
/// `SHA256(voterId ++ candidateId ++ sessionNonce)`. A replayed submission from a
/// different session yields a different hash.
pub fn verification_hash(voter: &VoterId, candidate: &CandidateId, session_nonce: &str) -> String {
    sha256_hex_multi(&[
        voter.as_str().as_bytes(),
        candidate.as_str().as_bytes(),
        session_nonce.as_bytes(),
    ])
}

/// Draw a fresh receipt id: `VOTE-` followed by 16 upper-case hex digits.
pub fn generate_receipt_id() -> ReceiptId {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    ReceiptId::new(format!(
        "{}{}",
        ReceiptId::PREFIX,
        hex::encode_upper(bytes)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn verification_hash_depends_on_session() {
        let voter = VoterId::from("v1");
        let candidate = CandidateId::from("c1");
        let a = verification_hash(&voter, &candidate, "session-a");
        let b = verification_hash(&voter, &candidate, "session-b");
        assert_ne!(a, b);
        assert_eq!(a, verification_hash(&voter, &candidate, "session-a"));
    }

    #[test]
    fn verification_hash_matches_concatenation() {
        let h = verification_hash(&VoterId::from("v1"), &CandidateId::from("c9"), "s");
        assert_eq!(h, crate::sha256_hex(b"v1c9s"));
    }

    #[test]
    fn receipt_ids_are_well_formed_and_distinct() {
        let ids: HashSet<_> = (0..256).map(|_| generate_receipt_id()).collect();
        assert_eq!(ids.len(), 256);
        assert!(ids.iter().all(ReceiptId::is_well_formed));
    }
}
