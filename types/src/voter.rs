//! Voter records as seen by the ledger subsystem.
//!
//! The record is owned by the external registry. The ledger reads the two
//! verification flags and writes the voting status, nothing else.

use serde::{Deserialize, Serialize};

use crate::{CandidateId, Constituency, ReceiptId, Timestamp, VoterId};

/// Whether, when and for whom a voter has voted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingStatus {
    pub has_voted: bool,
    pub voted_at: Option<Timestamp>,
    /// Candidate chosen; kept for administrative reset and audit.
    pub candidate_id: Option<CandidateId>,
    /// Provisional receipt issued for the vote.
    pub vote_reference: Option<ReceiptId>,
}

impl VotingStatus {
    /// Status recorded at the moment a vote is accepted.
    pub fn voted(at: Timestamp, candidate_id: CandidateId, receipt: ReceiptId) -> Self {
        Self {
            has_voted: true,
            voted_at: Some(at),
            candidate_id: Some(candidate_id),
            vote_reference: Some(receipt),
        }
    }
}

/// A registered voter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    pub id: VoterId,
    /// Registered constituency; candidates must stand in the same one.
    pub constituency: Constituency,
    /// Set by the OTP verification flow.
    #[serde(default)]
    pub otp_verified: bool,
    /// Set by the identity/face verification flow.
    #[serde(default)]
    pub face_verified: bool,
    #[serde(default)]
    pub voting_status: VotingStatus,
}

impl VoterRecord {
    /// A registered voter who has completed neither verification step.
    pub fn new(id: impl Into<VoterId>, constituency: impl Into<Constituency>) -> Self {
        Self {
            id: id.into(),
            constituency: constituency.into(),
            otp_verified: false,
            face_verified: false,
            voting_status: VotingStatus::default(),
        }
    }

    /// Builder-style helper marking both verification steps complete.
    pub fn verified(mut self) -> Self {
        self.otp_verified = true;
        self.face_verified = true;
        self
    }

    pub fn has_voted(&self) -> bool {
        self.voting_status.has_voted
    }
}
