use thiserror::Error;

/// Engine-wide error types for the Orbis system.
#[derive(Debug, Error)]
pub enum OrbisError {
    /// Ledger call failed or was reverted. Carries the machine-checkable
    /// rejection reason reported by the ledger (e.g. "already voted").
    #[error("Ledger error: {reason}")]
    Ledger { reason: String },

    /// Content gateway unreachable or returned a non-JSON response.
    #[error("Content fetch error: {0}")]
    ContentFetch(String),

    /// Primary or fallback scoring call failed.
    #[error("Scoring service error: {0}")]
    Scoring(String),

    /// Both the primary scorer and the sentiment fallback failed. The
    /// article keeps its current status; scoring must be retried manually.
    #[error("Scoring exhausted: {0}")]
    ScoringExhausted(String),

    /// Cache store error. Writes are logged and swallowed by callers;
    /// reads fall back to direct ledger queries. Never fatal to a ledger
    /// operation that already succeeded.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Malformed caller input, rejected before any I/O is attempted.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl OrbisError {
    /// Build a ledger error from any rejection reason.
    pub fn ledger(reason: impl Into<String>) -> Self {
        OrbisError::Ledger {
            reason: reason.into(),
        }
    }

    /// The user-facing category this error maps to.
    ///
    /// Only ledger rejections are classified further; everything else is a
    /// generic failure from the caller's point of view.
    pub fn category(&self) -> RejectionCategory {
        match self {
            OrbisError::Ledger { reason } => RejectionCategory::classify(reason),
            _ => RejectionCategory::Failed,
        }
    }
}

impl From<serde_json::Error> for OrbisError {
    fn from(e: serde_json::Error) -> Self {
        OrbisError::Serialization(e.to_string())
    }
}

/// User-facing category for a rejected operation.
///
/// The ledger is the source of truth, so its rejections are surfaced to the
/// caller with a stable category instead of a raw revert string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionCategory {
    /// The operation conflicts with prior state (e.g. a duplicate vote).
    Conflict,
    /// The caller lacks a precondition (e.g. has not staked).
    Forbidden,
    /// Any other failure.
    Failed,
}

impl RejectionCategory {
    /// Classify a ledger rejection reason string.
    pub fn classify(reason: &str) -> Self {
        let lower = reason.to_lowercase();
        if lower.contains("already voted") {
            RejectionCategory::Conflict
        } else if lower.contains("must stake") {
            RejectionCategory::Forbidden
        } else {
            RejectionCategory::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_voted_maps_to_conflict() {
        let err = OrbisError::ledger("Already voted on this article");
        assert_eq!(err.category(), RejectionCategory::Conflict);
    }

    #[test]
    fn must_stake_maps_to_forbidden() {
        let err = OrbisError::ledger("Must stake first");
        assert_eq!(err.category(), RejectionCategory::Forbidden);
    }

    #[test]
    fn other_reasons_map_to_failed() {
        let err = OrbisError::ledger("execution reverted");
        assert_eq!(err.category(), RejectionCategory::Failed);
        assert_eq!(
            OrbisError::Validation("bad".into()).category(),
            RejectionCategory::Failed
        );
    }
}
