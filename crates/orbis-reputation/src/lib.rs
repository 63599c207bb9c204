// crates/orbis-reputation/src/lib.rs
//
// orbis-reputation: validator reputation for the Orbis engine.
//
// The ledger owns the raw facts: stake balances, vote casts, reward and
// penalty transfers. This crate owns the derived view: per-validator
// counters, the rating formula, and the verified badge. It is the only
// writer of those fields.

pub mod ledger;
pub mod rating;

pub use ledger::{ReputationLedger, ValidatorPage};
pub use rating::{calculate_rating, is_verified, refresh_derived};
