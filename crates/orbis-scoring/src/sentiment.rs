// crates/orbis-scoring/src/sentiment.rs
//
// Sentiment fallback scorer.
//
// When the analysis service is down, a plain sentiment score in [-1, 1] is
// converted to a trust score: `round(((score + 1) / 2) * 100)`, clamped to
// [0, 100]. The result is recorded as a single-model analysis so consumers
// can tell which scorer produced it.

use std::time::Duration;

use serde::Deserialize;

use orbis_core::consensus::auto_publishes;
use orbis_core::{AnalysisOutcome, ConsensusLabel, ModelPrediction, OrbisError};

/// Model name recorded for fallback-produced analyses.
pub const SENTIMENT_MODEL_NAME: &str = "Sentiment";

/// Connection settings for the sentiment service.
#[derive(Debug, Clone)]
pub struct SentimentConfig {
    /// Base URL of the sentiment service.
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl SentimentConfig {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Wire shape of the sentiment response.
#[derive(Debug, Clone, Deserialize)]
struct WireSentiment {
    /// Document sentiment in [-1, 1].
    score: f64,
    /// Emotional magnitude. Logged, not used in the conversion.
    #[allow(dead_code)]
    #[serde(default)]
    magnitude: f64,
}

/// Convert a sentiment score in [-1, 1] to a trust score in [0, 100].
pub fn sentiment_to_trust_score(sentiment: f64) -> u8 {
    let scaled = ((sentiment + 1.0) / 2.0) * 100.0;
    scaled.round().clamp(0.0, 100.0) as u8
}

/// HTTP client for the sentiment fallback.
#[derive(Debug, Clone)]
pub struct SentimentClient {
    config: SentimentConfig,
    client: reqwest::Client,
}

impl SentimentClient {
    pub fn new(config: SentimentConfig) -> Result<Self, OrbisError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OrbisError::Scoring(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    /// Score content via sentiment analysis, returning a single-model
    /// analysis outcome.
    pub async fn analyze(&self, content: &str) -> Result<AnalysisOutcome, OrbisError> {
        let url = format!("{}/sentiment", self.config.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(|e| OrbisError::Scoring(format!("sentiment request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OrbisError::Scoring(format!(
                "sentiment failed ({}): {}",
                status, body
            )));
        }

        let wire: WireSentiment = response
            .json()
            .await
            .map_err(|e| OrbisError::Scoring(format!("sentiment response parse failed: {}", e)))?;

        let trust_score = sentiment_to_trust_score(wire.score);
        let publish = auto_publishes(trust_score);
        let label = if publish { "REAL" } else { "FAKE" };

        Ok(AnalysisOutcome {
            trust_score,
            consensus: if publish {
                ConsensusLabel::Real
            } else {
                ConsensusLabel::Fake
            },
            auto_publish: publish,
            total_models: 1,
            models: vec![ModelPrediction {
                name: SENTIMENT_MODEL_NAME.to_string(),
                label: label.to_string(),
                confidence: trust_score as f64,
            }],
        })
    }
}
