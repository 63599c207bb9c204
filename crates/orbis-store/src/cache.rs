// crates/orbis-store/src/cache.rs
//
// RocksDB-backed cache for articles, analysis records, and validators.
//
// Key format:
//   - Articles:   `article:{id padded to 12}` -> JSON Article
//   - Status idx: `status:{tag}:{id}`         -> empty value (index only)
//   - Analysis:   `analysis:{id}`             -> JSON AnalysisRecord
//   - Validators: `validator:{address}`       -> JSON ValidatorRecord
//
// Article ids are zero-padded so prefix iteration walks them in numeric
// order. The status secondary index allows listing by lifecycle state
// without scanning the whole keyspace.

use async_trait::async_trait;
use rocksdb::{DBWithThreadMode, MultiThreaded, Options};

use orbis_core::{
    reconcile_article, AnalysisRecord, Article, ArticleCache, ArticleStatus, OrbisError,
    ValidatorRecord, ValidatorStore,
};

/// RocksDB wrapper implementing `ArticleCache` and `ValidatorStore`.
#[derive(Debug)]
pub struct RocksCache {
    db: DBWithThreadMode<MultiThreaded>,
}

impl RocksCache {
    /// Open the cache database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist.
    pub fn open(path: &str) -> Result<Self, OrbisError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path).map_err(|e| {
            OrbisError::Cache(format!("failed to open cache at {}: {}", path, e))
        })?;

        Ok(Self { db })
    }

    /// Primary key for an article: `article:{id}` with the numeric id
    /// zero-padded for ordered iteration.
    fn article_key(id: &str) -> Vec<u8> {
        format!("article:{:0>12}", id).into_bytes()
    }

    /// Secondary index key: `status:{tag}:{id}`.
    fn status_key(status: ArticleStatus, id: &str) -> Vec<u8> {
        format!("status:{}:{:0>12}", status_tag(status), id).into_bytes()
    }

    fn analysis_key(article_id: &str) -> Vec<u8> {
        format!("analysis:{:0>12}", article_id).into_bytes()
    }

    fn validator_key(address: &str) -> Vec<u8> {
        format!("validator:{}", address.to_lowercase()).into_bytes()
    }

    fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<(), OrbisError> {
        self.db
            .put(key, value)
            .map_err(|e| OrbisError::Cache(format!("cache put failed: {}", e)))
    }

    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, OrbisError> {
        self.db
            .get(key)
            .map_err(|e| OrbisError::Cache(format!("cache get failed: {}", e)))
    }

    fn delete_raw(&self, key: &[u8]) -> Result<(), OrbisError> {
        self.db
            .delete(key)
            .map_err(|e| OrbisError::Cache(format!("cache delete failed: {}", e)))
    }

    fn get_article_sync(&self, id: &str) -> Result<Option<Article>, OrbisError> {
        match self.get_raw(&Self::article_key(id))? {
            Some(bytes) => {
                let article: Article = serde_json::from_slice(&bytes)?;
                Ok(Some(article))
            }
            None => Ok(None),
        }
    }

    /// Collect all documents under a key prefix.
    fn scan_prefix<T: serde::de::DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> Result<Vec<T>, OrbisError> {
        let prefix_bytes = prefix.as_bytes();
        let mut out = Vec::new();

        let iter = self.db.prefix_iterator(prefix_bytes);
        for item in iter {
            let (key, value) =
                item.map_err(|e| OrbisError::Cache(format!("cache iteration error: {}", e)))?;
            if !key.starts_with(prefix_bytes) {
                break;
            }
            out.push(serde_json::from_slice(&value)?);
        }

        Ok(out)
    }
}

#[async_trait]
impl ArticleCache for RocksCache {
    async fn upsert_article(&self, article: &Article) -> Result<(), OrbisError> {
        let existing = self.get_article_sync(&article.id)?;

        let merged = match reconcile_article(existing.as_ref(), article.clone()) {
            Some(doc) => doc,
            // Equivalent document already stored; repeated identical
            // re-reads leave the cache byte-identical.
            None => return Ok(()),
        };

        // The status may have changed; move the secondary index entry.
        if let Some(old) = &existing {
            if old.status != merged.status {
                self.delete_raw(&Self::status_key(old.status, &merged.id))?;
            }
        }

        let json = serde_json::to_vec(&merged)?;
        self.put_raw(&Self::article_key(&merged.id), &json)?;
        self.put_raw(&Self::status_key(merged.status, &merged.id), &[])?;
        Ok(())
    }

    async fn get_article(&self, id: &str) -> Result<Option<Article>, OrbisError> {
        self.get_article_sync(id)
    }

    async fn contains_article(&self, id: &str) -> Result<bool, OrbisError> {
        Ok(self.get_raw(&Self::article_key(id))?.is_some())
    }

    async fn list_articles(&self) -> Result<Vec<Article>, OrbisError> {
        let mut articles: Vec<Article> = self.scan_prefix("article:")?;
        articles.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(articles)
    }

    async fn list_articles_by_status(
        &self,
        status: ArticleStatus,
    ) -> Result<Vec<Article>, OrbisError> {
        let prefix = format!("status:{}:", status_tag(status));
        let prefix_bytes = prefix.as_bytes();
        let mut articles = Vec::new();

        let iter = self.db.prefix_iterator(prefix_bytes);
        for item in iter {
            let (key, _value) =
                item.map_err(|e| OrbisError::Cache(format!("cache iteration error: {}", e)))?;
            if !key.starts_with(prefix_bytes) {
                break;
            }
            // Key suffix is the padded article id.
            let id_bytes = &key[prefix_bytes.len()..];
            let padded = std::str::from_utf8(id_bytes).unwrap_or("");
            let id = padded.trim_start_matches('0');
            let id = if id.is_empty() { "0" } else { id };
            if let Some(article) = self.get_article_sync(id)? {
                articles.push(article);
            }
        }

        articles.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(articles)
    }

    async fn upsert_analysis(&self, record: &AnalysisRecord) -> Result<(), OrbisError> {
        let json = serde_json::to_vec(record)?;
        self.put_raw(&Self::analysis_key(&record.article_id), &json)
    }

    async fn get_analysis(&self, article_id: &str) -> Result<Option<AnalysisRecord>, OrbisError> {
        match self.get_raw(&Self::analysis_key(article_id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ValidatorStore for RocksCache {
    async fn get_validator(&self, address: &str) -> Result<Option<ValidatorRecord>, OrbisError> {
        match self.get_raw(&Self::validator_key(address))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn put_validator(&self, record: &ValidatorRecord) -> Result<(), OrbisError> {
        let json = serde_json::to_vec(record)?;
        self.put_raw(&Self::validator_key(&record.address), &json)
    }

    async fn list_validators(&self) -> Result<Vec<ValidatorRecord>, OrbisError> {
        self.scan_prefix("validator:")
    }
}

/// Convert an `ArticleStatus` to a short tag for secondary index keys.
fn status_tag(status: ArticleStatus) -> &'static str {
    match status {
        ArticleStatus::Submitted => "submitted",
        ArticleStatus::AiApproved => "ai_approved",
        ArticleStatus::UnderReview => "under_review",
        ArticleStatus::ValidatorApproved => "validator_approved",
        ArticleStatus::Rejected => "rejected",
        ArticleStatus::Published => "published",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tag_values() {
        assert_eq!(status_tag(ArticleStatus::Submitted), "submitted");
        assert_eq!(status_tag(ArticleStatus::AiApproved), "ai_approved");
        assert_eq!(status_tag(ArticleStatus::UnderReview), "under_review");
        assert_eq!(
            status_tag(ArticleStatus::ValidatorApproved),
            "validator_approved"
        );
        assert_eq!(status_tag(ArticleStatus::Rejected), "rejected");
        assert_eq!(status_tag(ArticleStatus::Published), "published");
    }

    #[test]
    fn article_keys_pad_for_ordering() {
        assert_eq!(
            RocksCache::article_key("7"),
            b"article:000000000007".to_vec()
        );
        assert!(RocksCache::article_key("9") < RocksCache::article_key("10"));
    }

    #[test]
    fn validator_keys_normalize_address() {
        assert_eq!(
            RocksCache::validator_key("0xABCdef"),
            b"validator:0xabcdef".to_vec()
        );
    }
}
