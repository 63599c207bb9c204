// crates/orbis-core/src/token.rs
//
// Token amounts for stake, rewards, and penalties.
//
// Stake amounts carry 18 fractional decimal digits, so one whole token is
// 10^18 base units. All accounting is integer arithmetic on u128, never
// floating point, and the wire/storage representation is a decimal string
// of base units, matching what the ledger reports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::OrbisError;

/// Base units in one whole token (18 fractional decimals).
pub const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

/// A token amount in base units.
///
/// Serialized as a decimal string to survive JSON consumers that cannot
/// represent 128-bit integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenAmount(pub u128);

impl TokenAmount {
    /// Zero tokens.
    pub fn zero() -> Self {
        TokenAmount(0)
    }

    /// An amount of whole tokens.
    pub fn from_whole(tokens: u64) -> Self {
        TokenAmount(tokens as u128 * ONE_TOKEN)
    }

    /// Parse a decimal base-unit string as reported by the ledger.
    pub fn parse(s: &str) -> Result<Self, OrbisError> {
        let value = u128::from_str(s.trim()).map_err(|_| {
            OrbisError::Validation(format!("invalid token amount: {:?}", s))
        })?;
        Ok(TokenAmount(value))
    }

    /// Saturating addition. Reward and penalty accumulators are
    /// monotonically non-decreasing, so saturation is the safe ceiling.
    pub fn saturating_add(self, rhs: TokenAmount) -> TokenAmount {
        TokenAmount(self.0.saturating_add(rhs.0))
    }

    /// This amount as a fraction of another, clamped to [0, 1].
    ///
    /// Used for the stake-weight term of the rating formula.
    pub fn fraction_of(self, denominator: TokenAmount) -> f64 {
        if denominator.0 == 0 {
            return 0.0;
        }
        let ratio = self.0 as f64 / denominator.0 as f64;
        ratio.min(1.0)
    }

    /// The base-unit decimal string form.
    pub fn to_decimal_string(self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / ONE_TOKEN;
        let frac = self.0 % ONE_TOKEN;
        if frac == 0 {
            write!(f, "{}", whole)
        } else {
            let frac_str = format!("{:018}", frac);
            let trimmed = frac_str.trim_end_matches('0');
            write!(f, "{}.{}", whole, trimmed)
        }
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TokenAmount::parse(&s).map_err(serde::de::Error::custom)
    }
}
