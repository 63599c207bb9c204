// crates/orbis-engine/src/sync.rs
//
// Cache Synchronizer: keeps the denormalized read store consistent with
// the authoritative ledger.
//
// Both entry points, the synchronous write hint and the asynchronous
// event notification, converge on `refresh_article`: re-read the current
// ledger record, rebuild the cached document, and upsert. Applying the
// same re-read twice is a no-op; a stale re-read overtaken by a newer one
// is corrected by the next event. No locking is needed because nothing is
// incremented in place.

use std::sync::Arc;

use chrono::Utc;

use orbis_core::{
    Article, ArticleCache, ArticleVersion, ContentDocument, ContentStore, LedgerGateway,
    OrbisError,
};
use orbis_ledger::LedgerEvent;
use orbis_reputation::ReputationLedger;

/// Outcome of a full resync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ResyncReport {
    /// Articles the ledger reports.
    pub total: u64,
    /// Articles refreshed successfully.
    pub synced: u64,
    /// Articles that failed to refresh (logged individually).
    pub failed: u64,
}

/// Reconciles the read cache with ledger truth.
pub struct CacheSynchronizer {
    ledger: Arc<dyn LedgerGateway>,
    content: Arc<dyn ContentStore>,
    cache: Arc<dyn ArticleCache>,
    reputation: Arc<ReputationLedger>,
}

impl CacheSynchronizer {
    pub fn new(
        ledger: Arc<dyn LedgerGateway>,
        content: Arc<dyn ContentStore>,
        cache: Arc<dyn ArticleCache>,
        reputation: Arc<ReputationLedger>,
    ) -> Self {
        Self {
            ledger,
            content,
            cache,
            reputation,
        }
    }

    /// Rebuild one article's cache document from authoritative state.
    ///
    /// `content_hint` carries freshly uploaded content on the synchronous
    /// write path, saving the gateway round-trip. Without a hint, content
    /// is re-fetched only when the cached row is missing, holds a
    /// different content address, or holds the fetch-failure placeholder;
    /// the event path skips the expensive fetch when the synchronous path
    /// already populated it.
    pub async fn refresh_article(
        &self,
        id: &str,
        content_hint: Option<ContentDocument>,
    ) -> Result<(), OrbisError> {
        let ledger_article = self.ledger.get_article(id).await?;
        let existing = self.cache.get_article(id).await?;

        let current_doc = match content_hint {
            Some(doc) => doc,
            None => match existing.as_ref() {
                Some(cached)
                    if cached.content_address == ledger_article.content_address
                        && !cached_doc(cached).is_placeholder() =>
                {
                    cached_doc(cached)
                }
                _ => self.content.fetch(&ledger_article.content_address).await,
            },
        };

        // Rebuild the version list. Content for historical versions is
        // reused from the cached row when the address matches; anything
        // unknown is fetched.
        let mut versions = Vec::with_capacity(ledger_article.version_count as usize);
        for index in 0..ledger_article.version_count {
            let entry = self.ledger.get_article_version(id, index).await?;
            let doc = if entry.content_address == ledger_article.content_address {
                current_doc.clone()
            } else if let Some(prev) = existing.as_ref().and_then(|cached| {
                cached
                    .versions
                    .iter()
                    .find(|v| v.index == index && v.content_address == entry.content_address)
            }) {
                let prev_doc = ContentDocument::new(prev.title.clone(), prev.body.clone());
                if prev_doc.is_placeholder() {
                    self.content.fetch(&entry.content_address).await
                } else {
                    prev_doc
                }
            } else {
                self.content.fetch(&entry.content_address).await
            };

            versions.push(ArticleVersion {
                index,
                content_address: entry.content_address,
                content_hash: entry.content_hash,
                title: doc.title,
                body: doc.body,
                timestamp: entry.timestamp,
            });
        }

        let article = Article {
            id: ledger_article.id,
            author: ledger_article.author,
            title: current_doc.title,
            body: current_doc.body,
            content_address: ledger_article.content_address,
            content_hash: ledger_article.content_hash,
            trust_score: ledger_article.trust_score,
            status: ledger_article.status,
            submitted_at: ledger_article.submitted_at,
            yes_votes: ledger_article.yes_votes,
            no_votes: ledger_article.no_votes,
            version_count: ledger_article.version_count,
            versions,
            last_synced_at: Utc::now(),
        };

        self.cache.upsert_article(&article).await
    }

    /// React to one ledger event.
    ///
    /// The payload identifies what changed; every handler re-reads current
    /// state instead of trusting event fields, which makes duplicated and
    /// out-of-order delivery safe.
    pub async fn handle_event(&self, event: &LedgerEvent) -> Result<(), OrbisError> {
        let now = Utc::now();
        match event {
            LedgerEvent::ArticleSubmitted { article_id, .. } => {
                if self.cache.contains_article(article_id).await.unwrap_or(false) {
                    tracing::debug!(
                        "article {} already cached by the write path, refreshing cheaply",
                        article_id
                    );
                }
                self.refresh_article(article_id, None).await
            }
            LedgerEvent::ArticleFinalized { article_id, status } => {
                tracing::info!("article {} finalized with status code {}", article_id, status);
                self.refresh_article(article_id, None).await
            }
            LedgerEvent::AiScored {
                article_id,
                trust_score,
                ..
            } => {
                tracing::info!("article {} scored {}", article_id, trust_score);
                self.refresh_article(article_id, None).await
            }
            LedgerEvent::Voted {
                article_id,
                validator,
                decision,
            } => {
                tracing::info!(
                    "validator {} voted {} on article {}",
                    validator,
                    if *decision { "yes" } else { "no" },
                    article_id
                );
                self.reputation
                    .record_vote_cast(validator, article_id, now)
                    .await?;
                self.refresh_article(article_id, None).await
            }
            LedgerEvent::Staked { validator, .. } | LedgerEvent::Unstaked { validator, .. } => {
                // The event amount is a delta; only the re-read balance is
                // trusted.
                let balance = self.ledger.staked_balance(validator).await?;
                self.reputation.update_stake(validator, balance, now).await?;
                Ok(())
            }
            LedgerEvent::Rewarded { validator, amount } => {
                self.reputation
                    .record_vote_outcome(
                        validator,
                        true,
                        *amount,
                        orbis_core::TokenAmount::zero(),
                        now,
                    )
                    .await?;
                Ok(())
            }
            LedgerEvent::Slashed { validator, amount } => {
                self.reputation
                    .record_vote_outcome(
                        validator,
                        false,
                        orbis_core::TokenAmount::zero(),
                        *amount,
                        now,
                    )
                    .await?;
                Ok(())
            }
            LedgerEvent::ArticleUpdateProposed {
                article_id,
                proposal_id,
                ..
            } => {
                let proposal = self
                    .ledger
                    .get_update_proposal(article_id, proposal_id)
                    .await?;
                tracing::info!(
                    "article {} proposal {} observed in status {:?}",
                    article_id,
                    proposal_id,
                    proposal.status
                );
                self.refresh_article(article_id, None).await
            }
        }
    }

    /// Disaster recovery: rebuild every article row from the ledger.
    ///
    /// Walks ids 1..=total through the same upsert as the steady-state
    /// path, so it is safe to interrupt and re-run, and a second run over
    /// unchanged state writes nothing.
    pub async fn full_resync(&self) -> Result<ResyncReport, OrbisError> {
        let total = self.ledger.total_articles().await?;
        tracing::info!("starting full resync of {} articles", total);

        let mut synced = 0u64;
        let mut failed = 0u64;
        for numeric_id in 1..=total {
            let id = numeric_id.to_string();
            match self.refresh_article(&id, None).await {
                Ok(()) => {
                    tracing::debug!("resynced article {}/{}", numeric_id, total);
                    synced += 1;
                }
                Err(e) => {
                    tracing::warn!("resync of article {} failed: {}", id, e);
                    failed += 1;
                }
            }
        }

        tracing::info!("resync complete: {} synced, {} failed", synced, failed);
        Ok(ResyncReport {
            total,
            synced,
            failed,
        })
    }

    /// Read one article, falling back to direct ledger reconstruction when
    /// the cache is unavailable. Consumers observe degraded latency and
    /// placeholder content, not errors.
    pub async fn get_article_view(&self, id: &str) -> Result<Article, OrbisError> {
        match self.cache.get_article(id).await {
            Ok(Some(article)) => return Ok(article),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("cache read for article {} failed, using ledger: {}", id, e);
            }
        }
        self.ledger_view(id).await
    }

    /// List articles, falling back to a full ledger walk when the cache is
    /// unavailable.
    pub async fn list_articles_view(&self) -> Result<Vec<Article>, OrbisError> {
        match self.cache.list_articles().await {
            Ok(articles) => Ok(articles),
            Err(e) => {
                tracing::warn!("cache list failed, walking the ledger: {}", e);
                let total = self.ledger.total_articles().await?;
                let mut articles = Vec::with_capacity(total as usize);
                for numeric_id in 1..=total {
                    let id = numeric_id.to_string();
                    match self.ledger_view(&id).await {
                        Ok(article) => articles.push(article),
                        Err(e) => {
                            tracing::warn!("ledger view of article {} failed: {}", id, e)
                        }
                    }
                }
                articles.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
                Ok(articles)
            }
        }
    }

    /// Reconstruct a cache-shaped document from ledger state alone.
    /// Content is not fetched on this path; placeholder titles keep the
    /// shape intact.
    async fn ledger_view(&self, id: &str) -> Result<Article, OrbisError> {
        let ledger_article = self.ledger.get_article(id).await?;

        let mut versions = Vec::with_capacity(ledger_article.version_count as usize);
        for index in 0..ledger_article.version_count {
            let entry = self.ledger.get_article_version(id, index).await?;
            versions.push(ArticleVersion {
                index,
                content_address: entry.content_address,
                content_hash: entry.content_hash,
                title: format!("Article #{}", id),
                body: String::new(),
                timestamp: entry.timestamp,
            });
        }

        Ok(Article {
            id: ledger_article.id,
            author: ledger_article.author,
            title: format!("Article #{}", id),
            body: String::new(),
            content_address: ledger_article.content_address,
            content_hash: ledger_article.content_hash,
            trust_score: ledger_article.trust_score,
            status: ledger_article.status,
            submitted_at: ledger_article.submitted_at,
            yes_votes: ledger_article.yes_votes,
            no_votes: ledger_article.no_votes,
            version_count: ledger_article.version_count,
            versions,
            last_synced_at: Utc::now(),
        })
    }
}

/// View a cached row's current content as a document.
fn cached_doc(article: &Article) -> ContentDocument {
    ContentDocument::new(article.title.clone(), article.body.clone())
}
