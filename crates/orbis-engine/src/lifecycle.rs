// crates/orbis-engine/src/lifecycle.rs
//
// Lifecycle Controller: drives articles and update proposals through
// submission, automated scoring, and validator voting.
//
// The ledger owns the state machine; this controller invokes the steps,
// writes results back, and mirrors the outcome into the cache through the
// synchronizer. Cache failures are logged and swallowed; a ledger
// operation that succeeded is never reported as failed because the read
// store was down.

use std::sync::Arc;

use chrono::Utc;

use orbis_core::hash::content_hash;
use orbis_core::{
    AnalysisOutcome, AnalysisRecord, ArticleCache, ArticleScorer, ContentDocument, ContentStore,
    LedgerGateway, OrbisError, ProposalStatus, UpdateProposal,
};
use orbis_reputation::ReputationLedger;

use crate::sync::CacheSynchronizer;

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SubmissionReceipt {
    /// Ledger-assigned article id.
    pub article_id: String,
    /// Content address of the uploaded document.
    pub content_address: String,
}

/// Result of a successful update proposal.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ProposalReceipt {
    /// Ledger-assigned proposal id, scoped to the article.
    pub proposal_id: String,
    /// Content address of the proposed document.
    pub content_address: String,
}

/// Orchestrates the article/proposal lifecycle.
pub struct LifecycleController {
    ledger: Arc<dyn LedgerGateway>,
    content: Arc<dyn ContentStore>,
    scorer: Arc<dyn ArticleScorer>,
    cache: Arc<dyn ArticleCache>,
    reputation: Arc<ReputationLedger>,
    synchronizer: Arc<CacheSynchronizer>,
}

impl LifecycleController {
    pub fn new(
        ledger: Arc<dyn LedgerGateway>,
        content: Arc<dyn ContentStore>,
        scorer: Arc<dyn ArticleScorer>,
        cache: Arc<dyn ArticleCache>,
        reputation: Arc<ReputationLedger>,
        synchronizer: Arc<CacheSynchronizer>,
    ) -> Self {
        Self {
            ledger,
            content,
            scorer,
            cache,
            reputation,
            synchronizer,
        }
    }

    /// Submit a new article: upload content, register on the ledger, and
    /// eagerly cache so readers never wait for event propagation.
    ///
    /// Scoring is not triggered here. Call `spawn_scoring` with the
    /// receipt, so the submission response never blocks on model latency.
    pub async fn submit_article(
        &self,
        title: &str,
        body: &str,
    ) -> Result<SubmissionReceipt, OrbisError> {
        if title.trim().is_empty() {
            return Err(OrbisError::Validation("article title must not be empty".into()));
        }
        if body.trim().is_empty() {
            return Err(OrbisError::Validation("article body must not be empty".into()));
        }

        let document = ContentDocument::new(title, body);
        let content_address = self.content.upload(&document).await?;
        let hash = content_hash(body);

        let article_id = self.ledger.submit_article(&content_address, &hash).await?;
        tracing::info!("article {} submitted at {}", article_id, content_address);

        // Synchronous hint path: the freshly uploaded content rides along,
        // so the cache write needs no gateway fetch.
        if let Err(e) = self
            .synchronizer
            .refresh_article(&article_id, Some(document))
            .await
        {
            tracing::warn!("eager cache write for article {} failed: {}", article_id, e);
        }

        Ok(SubmissionReceipt {
            article_id,
            content_address,
        })
    }

    /// Run scoring in the background. Exhaustion is logged for manual
    /// remediation; the article stays in its current status.
    pub fn spawn_scoring(self: &Arc<Self>, article_id: String, body: String) {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = controller.score_article(&article_id, &body).await {
                tracing::error!("scoring for article {} failed: {}", article_id, e);
            }
        });
    }

    /// Score an article and submit the result to the ledger.
    ///
    /// The scorer chain is strict: primary, then sentiment fallback, and
    /// `ScoringExhausted` if both fail, in which case nothing was
    /// submitted and the ledger state is unchanged.
    pub async fn score_article(
        &self,
        article_id: &str,
        body: &str,
    ) -> Result<AnalysisOutcome, OrbisError> {
        let outcome = self.scorer.score(body).await?;

        // The analysis record is descriptive; storing it must not gate the
        // score submission.
        let record = AnalysisRecord::from_outcome(article_id, outcome.clone(), Utc::now());
        if let Err(e) = self.cache.upsert_analysis(&record).await {
            tracing::warn!("failed to store analysis for article {}: {}", article_id, e);
        }

        self.ledger
            .set_ai_score(article_id, outcome.trust_score)
            .await?;
        tracing::info!(
            "article {} scored {} ({})",
            article_id,
            outcome.trust_score,
            if outcome.auto_publish {
                "auto-published"
            } else {
                "sent to validators"
            }
        );

        if let Err(e) = self.synchronizer.refresh_article(article_id, None).await {
            tracing::warn!("cache refresh after scoring article {} failed: {}", article_id, e);
        }

        Ok(outcome)
    }

    /// Cast a validator vote on an article under review.
    ///
    /// The ledger enforces staking and duplicate-vote rules; its rejection
    /// reasons surface to the caller with their category intact.
    pub async fn cast_vote(
        &self,
        article_id: &str,
        decision: bool,
        validator: &str,
    ) -> Result<(), OrbisError> {
        if validator.trim().is_empty() {
            return Err(OrbisError::Validation(
                "validator address must not be empty".into(),
            ));
        }

        self.ledger.vote(article_id, decision, validator).await?;

        if let Err(e) = self
            .reputation
            .record_vote_cast(validator, article_id, Utc::now())
            .await
        {
            tracing::warn!("failed to record vote cast for {}: {}", validator, e);
        }
        if let Err(e) = self.synchronizer.refresh_article(article_id, None).await {
            tracing::warn!("cache refresh after vote on article {} failed: {}", article_id, e);
        }

        Ok(())
    }

    /// Propose an update to a published article.
    ///
    /// Like submission, scoring is spawned separately via
    /// `spawn_proposal_scoring`.
    pub async fn propose_update(
        &self,
        article_id: &str,
        title: &str,
        body: &str,
    ) -> Result<ProposalReceipt, OrbisError> {
        if title.trim().is_empty() {
            return Err(OrbisError::Validation("article title must not be empty".into()));
        }
        if body.trim().is_empty() {
            return Err(OrbisError::Validation("article body must not be empty".into()));
        }

        let document = ContentDocument::new(title, body);
        let content_address = self.content.upload(&document).await?;
        let hash = content_hash(body);

        let proposal_id = self
            .ledger
            .propose_article_update(article_id, &content_address, &hash)
            .await?;
        tracing::info!(
            "article {} update proposal {} created at {}",
            article_id,
            proposal_id,
            content_address
        );

        Ok(ProposalReceipt {
            proposal_id,
            content_address,
        })
    }

    /// Run proposal scoring in the background.
    pub fn spawn_proposal_scoring(
        self: &Arc<Self>,
        article_id: String,
        proposal_id: String,
        body: String,
    ) {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = controller
                .score_proposal(&article_id, &proposal_id, &body)
                .await
            {
                tracing::error!(
                    "scoring for article {} proposal {} failed: {}",
                    article_id,
                    proposal_id,
                    e
                );
            }
        });
    }

    /// Score an update proposal: the identical two-path rule set, scoped
    /// to the proposal object.
    pub async fn score_proposal(
        &self,
        article_id: &str,
        proposal_id: &str,
        body: &str,
    ) -> Result<AnalysisOutcome, OrbisError> {
        let outcome = self.scorer.score(body).await?;

        self.ledger
            .set_update_proposal_ai_score(article_id, proposal_id, outcome.trust_score)
            .await?;
        tracing::info!(
            "article {} proposal {} scored {}",
            article_id,
            proposal_id,
            outcome.trust_score
        );

        // An auto-approved proposal becomes the article's current version;
        // mirror whatever the ledger decided.
        if let Err(e) = self.synchronizer.refresh_article(article_id, None).await {
            tracing::warn!(
                "cache refresh after scoring proposal {} failed: {}",
                proposal_id,
                e
            );
        }

        Ok(outcome)
    }

    /// Cast a validator vote on an update proposal.
    ///
    /// Returns the proposal as re-read after the vote; on approval the
    /// article refresh appends the new version.
    pub async fn vote_on_proposal(
        &self,
        article_id: &str,
        proposal_id: &str,
        decision: bool,
        validator: &str,
    ) -> Result<UpdateProposal, OrbisError> {
        if validator.trim().is_empty() {
            return Err(OrbisError::Validation(
                "validator address must not be empty".into(),
            ));
        }

        self.ledger
            .vote_on_update_proposal(article_id, proposal_id, decision, validator)
            .await?;

        let proposal = self
            .ledger
            .get_update_proposal(article_id, proposal_id)
            .await?;

        if proposal.status == ProposalStatus::Approved {
            tracing::info!(
                "article {} proposal {} approved, appending version",
                article_id,
                proposal_id
            );
        }
        if let Err(e) = self.synchronizer.refresh_article(article_id, None).await {
            tracing::warn!(
                "cache refresh after proposal vote on article {} failed: {}",
                article_id,
                e
            );
        }

        Ok(proposal)
    }
}
