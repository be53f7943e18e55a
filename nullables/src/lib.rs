//! Nullable infrastructure for deterministic testing.
//!
//! External dependencies (clock, voter store) sit behind traits. This crate
//! provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Fail on demand
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod fixtures;
pub mod store;

pub use clock::NullClock;
pub use fixtures::ElectionFixture;
pub use store::FlakyVoterStore;
