// crates/orbis-store/src/memory.rs
//
// In-memory cache implementing the same traits as the RocksDB backend.
// Used in tests and as a last-resort store when no data directory is
// available; semantics (reconciliation, terminal-status guard, replace-on-
// rescore) are identical to the persistent backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use orbis_core::{
    reconcile_article, AnalysisRecord, Article, ArticleCache, ArticleStatus, OrbisError,
    ValidatorRecord, ValidatorStore,
};

/// In-memory article/analysis/validator store.
///
/// BTreeMaps keyed the same way as the RocksDB column keys, so iteration
/// order matches the persistent backend.
#[derive(Debug, Default)]
pub struct MemoryCache {
    articles: RwLock<BTreeMap<String, Article>>,
    analyses: RwLock<BTreeMap<String, AnalysisRecord>>,
    validators: RwLock<BTreeMap<String, ValidatorRecord>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn padded(id: &str) -> String {
        format!("{:0>12}", id)
    }

    /// Serialized snapshot of every article row, in key order. Lets tests
    /// compare cache content byte-for-byte across resync runs.
    pub async fn article_snapshot(&self) -> Result<Vec<u8>, OrbisError> {
        let articles = self.articles.read().await;
        let rows: Vec<&Article> = articles.values().collect();
        Ok(serde_json::to_vec(&rows)?)
    }
}

#[async_trait]
impl ArticleCache for MemoryCache {
    async fn upsert_article(&self, article: &Article) -> Result<(), OrbisError> {
        let mut articles = self.articles.write().await;
        let key = Self::padded(&article.id);
        let existing = articles.get(&key);
        if let Some(merged) = reconcile_article(existing, article.clone()) {
            articles.insert(key, merged);
        }
        Ok(())
    }

    async fn get_article(&self, id: &str) -> Result<Option<Article>, OrbisError> {
        Ok(self.articles.read().await.get(&Self::padded(id)).cloned())
    }

    async fn contains_article(&self, id: &str) -> Result<bool, OrbisError> {
        Ok(self.articles.read().await.contains_key(&Self::padded(id)))
    }

    async fn list_articles(&self) -> Result<Vec<Article>, OrbisError> {
        let mut articles: Vec<Article> = self.articles.read().await.values().cloned().collect();
        articles.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(articles)
    }

    async fn list_articles_by_status(
        &self,
        status: ArticleStatus,
    ) -> Result<Vec<Article>, OrbisError> {
        let mut articles: Vec<Article> = self
            .articles
            .read()
            .await
            .values()
            .filter(|a| a.status == status)
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(articles)
    }

    async fn upsert_analysis(&self, record: &AnalysisRecord) -> Result<(), OrbisError> {
        self.analyses
            .write()
            .await
            .insert(Self::padded(&record.article_id), record.clone());
        Ok(())
    }

    async fn get_analysis(&self, article_id: &str) -> Result<Option<AnalysisRecord>, OrbisError> {
        Ok(self
            .analyses
            .read()
            .await
            .get(&Self::padded(article_id))
            .cloned())
    }
}

#[async_trait]
impl ValidatorStore for MemoryCache {
    async fn get_validator(&self, address: &str) -> Result<Option<ValidatorRecord>, OrbisError> {
        Ok(self
            .validators
            .read()
            .await
            .get(&address.to_lowercase())
            .cloned())
    }

    async fn put_validator(&self, record: &ValidatorRecord) -> Result<(), OrbisError> {
        self.validators
            .write()
            .await
            .insert(record.address.clone(), record.clone());
        Ok(())
    }

    async fn list_validators(&self) -> Result<Vec<ValidatorRecord>, OrbisError> {
        Ok(self.validators.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use orbis_core::ArticleVersion;

    fn make_article(id: &str, status: ArticleStatus) -> Article {
        let now = Utc::now();
        Article {
            id: id.to_string(),
            author: "0xauthor".to_string(),
            title: "Title".to_string(),
            body: "Body".to_string(),
            content_address: format!("addr{}", id),
            content_hash: format!("hash{}", id),
            trust_score: 0,
            status,
            submitted_at: now,
            yes_votes: 0,
            no_votes: 0,
            version_count: 1,
            versions: vec![ArticleVersion {
                index: 0,
                content_address: format!("addr{}", id),
                content_hash: format!("hash{}", id),
                title: "Title".to_string(),
                body: "Body".to_string(),
                timestamp: now,
            }],
            last_synced_at: now,
        }
    }

    #[tokio::test]
    async fn upsert_and_get_round_trip() {
        let cache = MemoryCache::new();
        let article = make_article("1", ArticleStatus::Submitted);
        cache.upsert_article(&article).await.unwrap();

        let fetched = cache.get_article("1").await.unwrap().unwrap();
        assert_eq!(fetched, article);
        assert!(cache.contains_article("1").await.unwrap());
        assert!(!cache.contains_article("2").await.unwrap());
    }

    #[tokio::test]
    async fn repeated_identical_upsert_is_noop() {
        let cache = MemoryCache::new();
        let article = make_article("1", ArticleStatus::UnderReview);
        cache.upsert_article(&article).await.unwrap();
        let before = cache.article_snapshot().await.unwrap();

        // Same document with a newer sync timestamp: must not change bytes.
        let mut again = article.clone();
        again.last_synced_at = Utc::now() + chrono::Duration::seconds(30);
        cache.upsert_article(&again).await.unwrap();
        let after = cache.article_snapshot().await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn terminal_status_never_regresses() {
        let cache = MemoryCache::new();
        cache
            .upsert_article(&make_article("1", ArticleStatus::Published))
            .await
            .unwrap();

        // A stale re-read claims the article is still under review.
        let stale = make_article("1", ArticleStatus::UnderReview);
        cache.upsert_article(&stale).await.unwrap();

        let stored = cache.get_article("1").await.unwrap().unwrap();
        assert_eq!(stored.status, ArticleStatus::Published);
    }

    #[tokio::test]
    async fn list_by_status_filters() {
        let cache = MemoryCache::new();
        cache
            .upsert_article(&make_article("1", ArticleStatus::Published))
            .await
            .unwrap();
        cache
            .upsert_article(&make_article("2", ArticleStatus::UnderReview))
            .await
            .unwrap();

        let published = cache
            .list_articles_by_status(ArticleStatus::Published)
            .await
            .unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].id, "1");
        assert_eq!(cache.list_articles().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rescore_replaces_analysis() {
        use orbis_core::{AnalysisOutcome, ConsensusLabel};

        let cache = MemoryCache::new();
        let first = AnalysisRecord::from_outcome(
            "1",
            AnalysisOutcome {
                trust_score: 40,
                consensus: ConsensusLabel::Fake,
                auto_publish: false,
                total_models: 1,
                models: vec![],
            },
            Utc::now(),
        );
        cache.upsert_analysis(&first).await.unwrap();

        let second = AnalysisRecord {
            trust_score: 85,
            consensus: ConsensusLabel::Real,
            auto_publish: true,
            ..first.clone()
        };
        cache.upsert_analysis(&second).await.unwrap();

        let stored = cache.get_analysis("1").await.unwrap().unwrap();
        assert_eq!(stored.trust_score, 85);
    }
}
