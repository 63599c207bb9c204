// crates/orbis-scoring/src/analyzer.rs
//
// Client for the multi-model analysis service.
//
// Request:  POST /analyze  {"content": "..."}
// Response: {"trustScore": 85, "consensus": "REAL", "autoPublish": true,
//            "totalModels": 4,
//            "results": {"BERT": {"label": "REAL", "confidence": 92.5}, ...}}

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use orbis_core::{AnalysisOutcome, ConsensusLabel, ModelPrediction, OrbisError};

/// Connection settings for the analysis service.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Base URL of the analysis service.
    pub endpoint: String,
    /// Per-request timeout. Model inference is slow; scoring runs off the
    /// event loop, so this can be generous without blocking anything.
    pub timeout: Duration,
}

impl AnalyzerConfig {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Wire shape of one model's result.
#[derive(Debug, Clone, Deserialize)]
struct WireModelResult {
    label: String,
    confidence: f64,
}

/// Wire shape of the analysis response. `results` is a map keyed by model
/// name; a BTreeMap keeps the derived prediction list deterministic.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAnalysis {
    trust_score: u8,
    consensus: ConsensusLabel,
    auto_publish: bool,
    total_models: u32,
    results: BTreeMap<String, WireModelResult>,
}

/// HTTP client for the primary scorer.
#[derive(Debug, Clone)]
pub struct AnalyzerClient {
    config: AnalyzerConfig,
    client: reqwest::Client,
}

impl AnalyzerClient {
    pub fn new(config: AnalyzerConfig) -> Result<Self, OrbisError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OrbisError::Scoring(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    /// Run the multi-model analysis on a body of content.
    pub async fn analyze(&self, content: &str) -> Result<AnalysisOutcome, OrbisError> {
        let url = format!("{}/analyze", self.config.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(|e| OrbisError::Scoring(format!("analysis request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OrbisError::Scoring(format!(
                "analysis failed ({}): {}",
                status, body
            )));
        }

        let wire: WireAnalysis = response
            .json()
            .await
            .map_err(|e| OrbisError::Scoring(format!("analysis response parse failed: {}", e)))?;

        if wire.trust_score > 100 {
            return Err(OrbisError::Scoring(format!(
                "analysis returned out-of-range trust score {}",
                wire.trust_score
            )));
        }

        let models = wire
            .results
            .into_iter()
            .map(|(name, result)| ModelPrediction {
                name,
                label: result.label,
                confidence: result.confidence,
            })
            .collect();

        Ok(AnalysisOutcome {
            trust_score: wire.trust_score,
            consensus: wire.consensus,
            auto_publish: wire.auto_publish,
            total_models: wire.total_models,
            models,
        })
    }
}
