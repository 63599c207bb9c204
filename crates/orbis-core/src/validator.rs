// crates/orbis-core/src/validator.rs
//
// Validator reputation records.
//
// The ledger owns the authoritative numeric facts (stake balances, vote
// casts, reward/penalty transfers). This record holds the derived view:
// counters, accumulators, and the rating/verified fields that only the
// Reputation Ledger component may write.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::token::TokenAmount;

/// Reputation record for one validator, keyed by normalized address.
///
/// Created lazily on the first observed interaction and never deleted.
/// `total_votes` is incremented exactly once per (validator, article) vote:
/// either when the cast is observed, or (for a vote the engine never saw
/// cast) when the outcome is recorded. The
/// `voted_articles` set and `open_votes` queue are the single vote ledger
/// that makes this idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    /// Lower-cased address. Unique key.
    pub address: String,
    /// Votes counted (cast or resolved, never both for the same article).
    pub total_votes: u32,
    /// Votes whose outcome matched the final article status.
    pub correct_votes: u32,
    /// Votes whose outcome did not.
    pub wrong_votes: u32,
    /// Articles whose outcome this validator has been scored against.
    pub articles_validated: u32,
    /// Authoritative staked balance, overwritten from ledger re-reads.
    pub total_stake: TokenAmount,
    /// Derived rating, clamped to [0, 5].
    pub rating: f64,
    /// First observation time. Set once.
    pub joined_at: DateTime<Utc>,
    /// Most recent vote cast.
    pub last_vote_at: Option<DateTime<Utc>>,
    /// Lifetime rewards, monotonically non-decreasing.
    pub total_rewards_earned: TokenAmount,
    /// Lifetime penalties, monotonically non-decreasing.
    pub total_penalties_paid: TokenAmount,
    /// Derived verified badge. Re-evaluated on every mutation, not sticky.
    pub verified: bool,
    /// Correct-vote streak. Resets to zero on any wrong vote.
    pub consecutive_correct_votes: u32,
    /// Every article id this validator has ever voted on.
    pub voted_articles: BTreeSet<String>,
    /// Article ids cast but not yet resolved, oldest first.
    pub open_votes: Vec<String>,
}

impl ValidatorRecord {
    /// A fresh record for a first-seen validator.
    pub fn new(address: &str, now: DateTime<Utc>) -> Self {
        Self {
            address: normalize_address(address),
            total_votes: 0,
            correct_votes: 0,
            wrong_votes: 0,
            articles_validated: 0,
            total_stake: TokenAmount::zero(),
            rating: 0.0,
            joined_at: now,
            last_vote_at: None,
            total_rewards_earned: TokenAmount::zero(),
            total_penalties_paid: TokenAmount::zero(),
            verified: false,
            consecutive_correct_votes: 0,
            voted_articles: BTreeSet::new(),
            open_votes: Vec::new(),
        }
    }

    /// Vote accuracy in [0, 1]. Zero when no votes have been counted.
    pub fn accuracy(&self) -> f64 {
        if self.total_votes == 0 {
            return 0.0;
        }
        self.correct_votes as f64 / self.total_votes as f64
    }

    /// Whole days since the validator was first observed.
    pub fn tenure_days(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = now.signed_duration_since(self.joined_at);
        (elapsed.num_seconds() as f64 / 86_400.0).max(0.0)
    }
}

/// Canonical form of a validator address: lower-cased, trimmed.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_normalizes_address() {
        let record = ValidatorRecord::new("0xABCdef01", Utc::now());
        assert_eq!(record.address, "0xabcdef01");
    }

    #[test]
    fn accuracy_is_zero_without_votes() {
        let record = ValidatorRecord::new("0xa", Utc::now());
        assert_eq!(record.accuracy(), 0.0);
    }

    #[test]
    fn accuracy_is_correct_fraction() {
        let mut record = ValidatorRecord::new("0xa", Utc::now());
        record.total_votes = 10;
        record.correct_votes = 9;
        record.wrong_votes = 1;
        assert!((record.accuracy() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn tenure_counts_days() {
        let joined = Utc::now();
        let record = ValidatorRecord::new("0xa", joined);
        let later = joined + chrono::Duration::days(120);
        assert!((record.tenure_days(later) - 120.0).abs() < 1e-9);
    }
}
