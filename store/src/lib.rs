//! Abstract registry traits for the evote ledger.
//!
//! Voter and candidate records live in an external document store. The ledger
//! depends only on these traits; [`MemoryRegistry`] backs the demo daemon and
//! the tests.

pub mod candidate;
pub mod error;
pub mod memory;
pub mod roll;
pub mod voter;

pub use candidate::CandidateStore;
pub use error::StoreError;
pub use memory::MemoryRegistry;
pub use roll::ElectoralRoll;
pub use voter::VoterStore;
