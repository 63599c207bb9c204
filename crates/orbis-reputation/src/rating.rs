// crates/orbis-reputation/src/rating.rs
//
// The rating formula and verification thresholds.
//
//   rating = 5 × (0.50·accuracy + 0.25·stake_weight
//                 + 0.15·participation + 0.10·tenure_bonus)
//
// where accuracy = correct/total votes (0 with no votes), stake_weight
// saturates at 500 whole tokens, participation = votes/articles validated
// (1 when nothing has been validated yet), and tenure saturates at 90 days.
// The result is clamped to [0, 5].

use chrono::{DateTime, Utc};

use orbis_core::{TokenAmount, ValidatorRecord, ONE_TOKEN};

/// Stake at which the stake-weight term saturates, and the verification
/// stake floor: 500 whole tokens.
pub const STAKE_CEILING: TokenAmount = TokenAmount(500 * ONE_TOKEN);

/// Minimum rating for the verified badge.
pub const VERIFIED_MIN_RATING: f64 = 4.0;

/// Minimum counted votes for the verified badge.
pub const VERIFIED_MIN_VOTES: u32 = 50;

/// Minimum vote accuracy for the verified badge.
pub const VERIFIED_MIN_ACCURACY: f64 = 0.85;

/// Minimum tenure in days for the verified badge.
pub const VERIFIED_MIN_TENURE_DAYS: f64 = 90.0;

/// Days at which the tenure bonus saturates.
pub const TENURE_CEILING_DAYS: f64 = 90.0;

/// Participation rate in [0, 1]: votes cast relative to articles whose
/// outcome the validator has been scored against. A validator with no
/// scored outcomes yet has nothing to have missed, so the rate is 1.
pub fn participation_rate(record: &ValidatorRecord) -> f64 {
    if record.articles_validated == 0 {
        return 1.0;
    }
    (record.total_votes as f64 / record.articles_validated as f64).min(1.0)
}

/// Stake weight in [0, 1], saturating at `STAKE_CEILING`.
pub fn stake_weight(record: &ValidatorRecord) -> f64 {
    record.total_stake.fraction_of(STAKE_CEILING)
}

/// Tenure bonus in [0, 1], saturating at `TENURE_CEILING_DAYS`.
pub fn tenure_bonus(record: &ValidatorRecord, now: DateTime<Utc>) -> f64 {
    (record.tenure_days(now) / TENURE_CEILING_DAYS).min(1.0)
}

/// Compute the weighted rating, clamped to [0, 5].
pub fn calculate_rating(record: &ValidatorRecord, now: DateTime<Utc>) -> f64 {
    let rating = 5.0
        * (0.50 * record.accuracy()
            + 0.25 * stake_weight(record)
            + 0.15 * participation_rate(record)
            + 0.10 * tenure_bonus(record, now));
    rating.clamp(0.0, 5.0)
}

/// Whether the record meets all five verification thresholds right now.
///
/// The five conditions are re-evaluated together on every call; the badge
/// is not sticky. Evaluates against `record.rating`, so the rating must be
/// current (use `refresh_derived`).
pub fn is_verified(record: &ValidatorRecord, now: DateTime<Utc>) -> bool {
    record.total_stake >= STAKE_CEILING
        && record.rating >= VERIFIED_MIN_RATING
        && record.total_votes >= VERIFIED_MIN_VOTES
        && record.accuracy() >= VERIFIED_MIN_ACCURACY
        && record.tenure_days(now) >= VERIFIED_MIN_TENURE_DAYS
}

/// Recompute the derived fields in place. Called before every persist.
pub fn refresh_derived(record: &mut ValidatorRecord, now: DateTime<Utc>) {
    record.rating = calculate_rating(record, now);
    record.verified = is_verified(record, now);
}
