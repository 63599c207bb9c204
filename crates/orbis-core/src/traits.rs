// crates/orbis-core/src/traits.rs

use async_trait::async_trait;

use crate::analysis::{AnalysisOutcome, AnalysisRecord};
use crate::article::{Article, ArticleStatus, LedgerArticle, LedgerVersion, UpdateProposal};
use crate::content::ContentDocument;
use crate::error::OrbisError;
use crate::token::TokenAmount;
use crate::validator::ValidatorRecord;

/// Typed read/invoke surface of the authoritative ledger contract set
/// (article registry, reputation token, stake registry).
///
/// Implemented by orbis-ledger (JSON-RPC backend) and by in-memory fakes
/// in tests. The ledger enforces its own rules (duplicate votes, stake
/// requirements, status transitions); callers surface its rejections, they
/// never pre-empt them.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Read an article's authoritative record.
    async fn get_article(&self, id: &str) -> Result<LedgerArticle, OrbisError>;

    /// Read one entry of an article's version history.
    async fn get_article_version(&self, id: &str, index: u32)
        -> Result<LedgerVersion, OrbisError>;

    /// Read an update proposal.
    async fn get_update_proposal(
        &self,
        id: &str,
        proposal_id: &str,
    ) -> Result<UpdateProposal, OrbisError>;

    /// The id of the article's most recent proposal, if any exist.
    async fn get_current_proposal_id(&self, id: &str) -> Result<Option<String>, OrbisError>;

    /// Total number of articles ever registered. Ids run 1..=total.
    async fn total_articles(&self) -> Result<u64, OrbisError>;

    /// Register a new article. Returns the ledger-assigned id.
    async fn submit_article(
        &self,
        content_address: &str,
        content_hash: &str,
    ) -> Result<String, OrbisError>;

    /// Open an update proposal for an article. Returns the proposal id.
    async fn propose_article_update(
        &self,
        id: &str,
        content_address: &str,
        content_hash: &str,
    ) -> Result<String, OrbisError>;

    /// Record an automated trust score for an article.
    async fn set_ai_score(&self, id: &str, score: u8) -> Result<(), OrbisError>;

    /// Record an automated trust score for an update proposal.
    async fn set_update_proposal_ai_score(
        &self,
        id: &str,
        proposal_id: &str,
        score: u8,
    ) -> Result<(), OrbisError>;

    /// Cast a validator vote on an article.
    async fn vote(&self, id: &str, decision: bool, validator: &str) -> Result<(), OrbisError>;

    /// Cast a validator vote on an update proposal.
    async fn vote_on_update_proposal(
        &self,
        id: &str,
        proposal_id: &str,
        decision: bool,
        validator: &str,
    ) -> Result<(), OrbisError>;

    /// Read a validator's authoritative staked balance.
    async fn staked_balance(&self, address: &str) -> Result<TokenAmount, OrbisError>;
}

/// Content-addressed document storage.
///
/// Implemented by orbis-store (HTTP gateway backend).
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch a document by content address. Returns the placeholder
    /// document on any failure rather than an error: readers degrade,
    /// the lifecycle never blocks on content.
    async fn fetch(&self, address: &str) -> ContentDocument;

    /// Upload a document, returning its content address.
    async fn upload(&self, document: &ContentDocument) -> Result<String, OrbisError>;
}

/// Automated trust scoring.
///
/// Implemented by orbis-scoring as the strict primary→fallback chain.
/// A `ScoringExhausted` error means both scorers failed.
#[async_trait]
pub trait ArticleScorer: Send + Sync {
    /// Score a body of content, returning the full analysis.
    async fn score(&self, content: &str) -> Result<AnalysisOutcome, OrbisError>;
}

/// The denormalized read cache for articles and analysis records.
///
/// Implemented by orbis-store (RocksDB and in-memory backends). All writes
/// are single-document upserts; implementations reconcile against the
/// stored row so that repeated identical writes are no-ops and terminal
/// statuses never regress.
#[async_trait]
pub trait ArticleCache: Send + Sync {
    /// Insert or update an article document.
    async fn upsert_article(&self, article: &Article) -> Result<(), OrbisError>;

    /// Read a cached article.
    async fn get_article(&self, id: &str) -> Result<Option<Article>, OrbisError>;

    /// Whether a cached row exists for this id (cheap existence check,
    /// used to skip redundant content fetches).
    async fn contains_article(&self, id: &str) -> Result<bool, OrbisError>;

    /// All cached articles, newest submission first.
    async fn list_articles(&self) -> Result<Vec<Article>, OrbisError>;

    /// Cached articles in a given lifecycle status.
    async fn list_articles_by_status(
        &self,
        status: ArticleStatus,
    ) -> Result<Vec<Article>, OrbisError>;

    /// Replace the analysis record for an article.
    async fn upsert_analysis(&self, record: &AnalysisRecord) -> Result<(), OrbisError>;

    /// Read the analysis record for an article.
    async fn get_analysis(&self, article_id: &str) -> Result<Option<AnalysisRecord>, OrbisError>;
}

/// Persistence for validator reputation records.
///
/// Implemented by orbis-store alongside the article cache. The Reputation
/// Ledger is the only writer of the derived fields.
#[async_trait]
pub trait ValidatorStore: Send + Sync {
    /// Read a record by normalized address.
    async fn get_validator(&self, address: &str) -> Result<Option<ValidatorRecord>, OrbisError>;

    /// Insert or replace a record.
    async fn put_validator(&self, record: &ValidatorRecord) -> Result<(), OrbisError>;

    /// All records, in unspecified order.
    async fn list_validators(&self) -> Result<Vec<ValidatorRecord>, OrbisError>;
}
