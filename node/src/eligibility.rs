//! The eligibility gate: may this voter cast a vote right now?
//!
//! Pure decisions over the current voter record. Callers must re-read the
//! record at submission time and never cache a verdict.

use evote_types::VoterRecord;

/// Why a voter may not vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ineligibility {
    AlreadyVoted,
    OtpNotVerified,
    FaceNotVerified,
}

impl Ineligibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyVoted => "already voted",
            Self::OtpNotVerified => "OTP verification incomplete",
            Self::FaceNotVerified => "face verification incomplete",
        }
    }
}

/// `otpVerified && faceVerified && !hasVoted`.
pub fn can_vote(voter: &VoterRecord) -> bool {
    check(voter).is_ok()
}

/// Like [`can_vote`] but names the first failing condition.
///
/// A voter who has already voted is reported as such even if their
/// verification flags were later withdrawn.
pub fn check(voter: &VoterRecord) -> Result<(), Ineligibility> {
    if voter.has_voted() {
        return Err(Ineligibility::AlreadyVoted);
    }
    if !voter.otp_verified {
        return Err(Ineligibility::OtpNotVerified);
    }
    if !voter.face_verified {
        return Err(Ineligibility::FaceNotVerified);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use evote_types::{CandidateId, ReceiptId, Timestamp, VotingStatus};

    fn voter() -> VoterRecord {
        VoterRecord::new("v1", "Hyderabad")
    }

    #[test]
    fn verified_voter_can_vote() {
        assert!(can_vote(&voter().verified()));
    }

    #[test]
    fn unverified_voter_cannot_vote() {
        assert_eq!(check(&voter()), Err(Ineligibility::OtpNotVerified));

        let mut v = voter();
        v.otp_verified = true;
        assert_eq!(check(&v), Err(Ineligibility::FaceNotVerified));
        assert!(!can_vote(&v));
    }

    #[test]
    fn voted_voter_cannot_vote_again() {
        let mut v = voter().verified();
        v.voting_status = VotingStatus::voted(
            Timestamp::from_millis(1),
            CandidateId::from("c1"),
            ReceiptId::from("VOTE-0000000000000001"),
        );
        assert_eq!(check(&v), Err(Ineligibility::AlreadyVoted));
    }

    #[test]
    fn already_voted_takes_precedence() {
        let mut v = voter();
        v.voting_status.has_voted = true;
        assert_eq!(check(&v), Err(Ineligibility::AlreadyVoted));
    }

    #[test]
    fn all_flag_combinations() {
        for otp in [false, true] {
            for face in [false, true] {
                for voted in [false, true] {
                    let mut v = voter();
                    v.otp_verified = otp;
                    v.face_verified = face;
                    v.voting_status.has_voted = voted;
                    assert_eq!(can_vote(&v), otp && face && !voted);
                }
            }
        }
    }
}
