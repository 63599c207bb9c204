// crates/orbis-core/src/consensus.rs
//
// Thresholds gating the article lifecycle. These mirror the ledger's rules;
// the engine interprets them when deciding what a score or vote tally means,
// it does not enforce them on the ledger's behalf.

/// Minimum trust score for auto-publish without validator review.
pub const AUTO_PUBLISH_THRESHOLD: u8 = 80;

/// Minimum number of distinct validator votes before consensus is evaluated.
pub const MIN_VALIDATOR_VOTES: u32 = 3;

/// Minimum yes-vote fraction for validator approval.
pub const CONSENSUS_THRESHOLD: f64 = 0.75;

/// Whether a trust score qualifies an article for auto-publish.
pub fn auto_publishes(trust_score: u8) -> bool {
    trust_score >= AUTO_PUBLISH_THRESHOLD
}

/// The yes-vote fraction of a tally. Zero when no votes have been cast.
pub fn yes_fraction(yes_votes: u32, no_votes: u32) -> f64 {
    let total = yes_votes + no_votes;
    if total == 0 {
        return 0.0;
    }
    yes_votes as f64 / total as f64
}

/// Consensus verdict for a complete tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusVerdict {
    /// Quorum not yet reached; keep collecting votes.
    Undecided,
    /// Quorum reached with the yes-fraction at or above threshold.
    Approved,
    /// Quorum reached with the yes-fraction below threshold.
    Rejected,
}

/// Evaluate a vote tally against quorum and threshold.
pub fn evaluate_votes(yes_votes: u32, no_votes: u32) -> ConsensusVerdict {
    if yes_votes + no_votes < MIN_VALIDATOR_VOTES {
        return ConsensusVerdict::Undecided;
    }
    if yes_fraction(yes_votes, no_votes) >= CONSENSUS_THRESHOLD {
        ConsensusVerdict::Approved
    } else {
        ConsensusVerdict::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_80_auto_publishes() {
        assert!(auto_publishes(80));
        assert!(auto_publishes(100));
        assert!(!auto_publishes(79));
    }

    #[test]
    fn below_quorum_is_undecided() {
        assert_eq!(evaluate_votes(2, 0), ConsensusVerdict::Undecided);
        assert_eq!(evaluate_votes(0, 0), ConsensusVerdict::Undecided);
    }

    #[test]
    fn two_thirds_yes_is_rejected() {
        // 2 yes, 1 no: 66.7% < 75%.
        assert_eq!(evaluate_votes(2, 1), ConsensusVerdict::Rejected);
    }

    #[test]
    fn three_quarters_yes_is_approved() {
        assert_eq!(evaluate_votes(3, 1), ConsensusVerdict::Approved);
        assert_eq!(evaluate_votes(3, 0), ConsensusVerdict::Approved);
    }

    #[test]
    fn yes_fraction_of_empty_tally_is_zero() {
        assert_eq!(yes_fraction(0, 0), 0.0);
    }
}
