// crates/orbis-scoring/src/chain.rs
//
// The strict primary→fallback scoring chain.
//
// The fallback runs only after the primary fails, never concurrently, so
// the ledger sees a single score submission per article. When both fail the
// chain returns `ScoringExhausted`; the article keeps its current status
// and the failure is left for manual remediation.

use async_trait::async_trait;

use orbis_core::{AnalysisOutcome, ArticleScorer, OrbisError};

use crate::analyzer::AnalyzerClient;
use crate::sentiment::SentimentClient;

/// Primary analysis service with sentiment fallback.
pub struct ScoringChain {
    primary: AnalyzerClient,
    fallback: SentimentClient,
}

impl ScoringChain {
    pub fn new(primary: AnalyzerClient, fallback: SentimentClient) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl ArticleScorer for ScoringChain {
    async fn score(&self, content: &str) -> Result<AnalysisOutcome, OrbisError> {
        let primary_err = match self.primary.analyze(content).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) => {
                tracing::warn!("primary scorer failed, trying sentiment fallback: {}", e);
                e
            }
        };

        match self.fallback.analyze(content).await {
            Ok(outcome) => Ok(outcome),
            Err(fallback_err) => Err(OrbisError::ScoringExhausted(format!(
                "primary: {}; fallback: {}",
                primary_err, fallback_err
            ))),
        }
    }
}
