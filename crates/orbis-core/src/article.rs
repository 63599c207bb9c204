// crates/orbis-core/src/article.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OrbisError;

/// Lifecycle states of an article, from submission through scoring and
/// validator consensus to publication.
///
///   Submitted --> AiApproved ---------> Published
///        |                                  ^
///        v                                  |
///   UnderReview --> ValidatorApproved ------+
///        |
///        v
///     Rejected
///
/// `Published` and `Rejected` are terminal for the base lifecycle. A
/// published article may still spawn update proposals, which run their own
/// sub-lifecycle without changing the article's top-level status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArticleStatus {
    /// Submitted to the ledger, awaiting automated scoring.
    Submitted,
    /// Trust score reached the auto-publish threshold.
    AiApproved,
    /// Trust score below threshold; validators are voting.
    UnderReview,
    /// Validator consensus reached in favor.
    ValidatorApproved,
    /// Validator consensus against, or explicit rejection.
    Rejected,
    /// Live and readable. Terminal.
    Published,
}

impl ArticleStatus {
    /// The canonical numeric code used by the ledger.
    ///
    /// This is the single mapping table; no other module re-implements it.
    pub fn code(&self) -> u8 {
        match self {
            ArticleStatus::Submitted => 0,
            ArticleStatus::AiApproved => 1,
            ArticleStatus::UnderReview => 2,
            ArticleStatus::ValidatorApproved => 3,
            ArticleStatus::Rejected => 4,
            ArticleStatus::Published => 5,
        }
    }

    /// Decode a ledger status code.
    pub fn from_code(code: u8) -> Result<Self, OrbisError> {
        match code {
            0 => Ok(ArticleStatus::Submitted),
            1 => Ok(ArticleStatus::AiApproved),
            2 => Ok(ArticleStatus::UnderReview),
            3 => Ok(ArticleStatus::ValidatorApproved),
            4 => Ok(ArticleStatus::Rejected),
            5 => Ok(ArticleStatus::Published),
            other => Err(OrbisError::Validation(format!(
                "unknown article status code {}",
                other
            ))),
        }
    }

    /// Whether this status ends the base lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ArticleStatus::Published | ArticleStatus::Rejected)
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    ///
    /// Staying in place is always permitted (idempotent re-reads).
    pub fn can_transition_to(&self, next: ArticleStatus) -> bool {
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (ArticleStatus::Submitted, ArticleStatus::AiApproved)
                | (ArticleStatus::Submitted, ArticleStatus::UnderReview)
                | (ArticleStatus::AiApproved, ArticleStatus::Published)
                | (ArticleStatus::UnderReview, ArticleStatus::ValidatorApproved)
                | (ArticleStatus::UnderReview, ArticleStatus::Rejected)
                | (ArticleStatus::ValidatorApproved, ArticleStatus::Published)
        )
    }
}

/// One immutable snapshot in an article's version history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleVersion {
    /// Zero-based version index.
    pub index: u32,
    /// Content address of this version's document.
    pub content_address: String,
    /// Hash of this version's body.
    pub content_hash: String,
    /// Title at this version.
    pub title: String,
    /// Body at this version.
    pub body: String,
    /// When this version was recorded on the ledger.
    pub timestamp: DateTime<Utc>,
}

/// The denormalized article document held in the read cache.
///
/// The ledger owns the authoritative facts; this document is rebuilt from
/// ledger re-reads plus fetched content and must never be incremented in
/// place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Ledger-assigned id (string-encoded integer, immutable).
    pub id: String,
    /// Author address.
    pub author: String,
    /// Current title.
    pub title: String,
    /// Current body.
    pub body: String,
    /// Current content address.
    pub content_address: String,
    /// Current content hash.
    pub content_hash: String,
    /// Automated trust score, 0–100.
    pub trust_score: u8,
    /// Current lifecycle status.
    pub status: ArticleStatus,
    /// Submission timestamp.
    pub submitted_at: DateTime<Utc>,
    /// Yes-vote tally.
    pub yes_votes: u32,
    /// No-vote tally.
    pub no_votes: u32,
    /// Number of versions. Invariant: equals `versions.len()`.
    pub version_count: u32,
    /// Ordered version snapshots, oldest first.
    pub versions: Vec<ArticleVersion>,
    /// When this document was last rebuilt from the ledger.
    pub last_synced_at: DateTime<Utc>,
}

impl Article {
    /// Whether two documents carry the same content, ignoring the sync
    /// timestamp. Used to skip rewrites that would change nothing.
    pub fn content_equivalent(&self, other: &Article) -> bool {
        let mut a = self.clone();
        let mut b = other.clone();
        a.last_synced_at = b.last_synced_at;
        a == b
    }
}

/// Reconcile a freshly rebuilt document against the cached one.
///
/// Returns the document to write, or `None` when the cached row is already
/// equivalent and no write is needed. A terminal cached status is never
/// overwritten with a different status, so stale re-reads cannot regress
/// `Published` or `Rejected`.
pub fn reconcile_article(existing: Option<&Article>, mut fresh: Article) -> Option<Article> {
    match existing {
        None => Some(fresh),
        Some(current) => {
            if current.status.is_terminal() && fresh.status != current.status {
                fresh.status = current.status;
            }
            if current.content_equivalent(&fresh) {
                None
            } else {
                Some(fresh)
            }
        }
    }
}

/// Status of an update proposal's own sub-lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Awaiting scoring or validator votes.
    Pending,
    /// Accepted; becomes the article's new current version.
    Approved,
    /// Discarded. Past versions are never mutated.
    Rejected,
}

impl ProposalStatus {
    /// The canonical numeric code used by the ledger.
    pub fn code(&self) -> u8 {
        match self {
            ProposalStatus::Pending => 0,
            ProposalStatus::Approved => 1,
            ProposalStatus::Rejected => 2,
        }
    }

    /// Decode a ledger proposal status code.
    pub fn from_code(code: u8) -> Result<Self, OrbisError> {
        match code {
            0 => Ok(ProposalStatus::Pending),
            1 => Ok(ProposalStatus::Approved),
            2 => Ok(ProposalStatus::Rejected),
            other => Err(OrbisError::Validation(format!(
                "unknown proposal status code {}",
                other
            ))),
        }
    }
}

/// An update proposal as read from the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateProposal {
    /// Proposal id, scoped to its article.
    pub proposal_id: String,
    /// Content address of the proposed replacement document.
    pub new_content_address: String,
    /// Hash of the proposed body.
    pub new_content_hash: String,
    /// Proposer address.
    pub proposer: String,
    /// Yes-vote tally.
    pub yes_votes: u32,
    /// No-vote tally.
    pub no_votes: u32,
    /// Sub-lifecycle status.
    pub status: ProposalStatus,
    /// When the proposal was created on the ledger.
    pub created_at: DateTime<Utc>,
}

/// An article as read from the ledger (authoritative facts only; no
/// content, which lives in the content store).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerArticle {
    pub id: String,
    pub author: String,
    pub content_address: String,
    pub content_hash: String,
    pub trust_score: u8,
    pub status: ArticleStatus,
    pub submitted_at: DateTime<Utc>,
    pub yes_votes: u32,
    pub no_votes: u32,
    pub version_count: u32,
}

/// A version entry as read from the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerVersion {
    pub content_address: String,
    pub content_hash: String,
    pub timestamp: DateTime<Utc>,
}
