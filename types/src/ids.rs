//! String identifiers for voters, candidates, constituencies and receipts.
//!
//! All identifiers are opaque strings issued by the external registry (or, for
//! receipts, by the submission path). The newtypes exist so a voter id can never
//! be passed where a candidate id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identity of a registered voter.
    VoterId
);

string_id!(
    /// Identity of a candidate standing in a constituency.
    CandidateId
);

string_id!(
    /// Electoral district name, e.g. `"Delhi Central"`.
    Constituency
);

string_id!(
    /// Provisional receipt identifier handed back at submission time.
    ///
    /// Issued as `VOTE-` followed by 16 upper-case hex digits.
    ReceiptId
);

impl ReceiptId {
    /// Prefix carried by every receipt issued by the submission path.
    pub const PREFIX: &'static str = "VOTE-";

    /// Whether this identifier has the shape of an issued receipt.
    pub fn is_well_formed(&self) -> bool {
        self.0
            .strip_prefix(Self::PREFIX)
            .map(|rest| rest.len() == 16 && rest.chars().all(|c| c.is_ascii_hexdigit()))
            .unwrap_or(false)
    }
}
