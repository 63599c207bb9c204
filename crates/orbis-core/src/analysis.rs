// crates/orbis-core/src/analysis.rs
//
// Automated analysis records: the descriptive output of the scoring chain.
// At most one live record exists per article; re-scoring replaces it.
// The record never drives state transitions; the Lifecycle Controller
// reads the trust score itself, not this record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Consensus label produced by the scoring service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusLabel {
    #[serde(rename = "HIGH_TRUST")]
    HighTrust,
    #[serde(rename = "MEDIUM_TRUST")]
    MediumTrust,
    #[serde(rename = "LOW_TRUST")]
    LowTrust,
    #[serde(rename = "REAL")]
    Real,
    #[serde(rename = "FAKE")]
    Fake,
}

/// One model's prediction within an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPrediction {
    /// Model name (e.g. "BERT", "XGBoost").
    pub name: String,
    /// Predicted label for this model.
    pub label: String,
    /// Confidence percentage, 0–100.
    pub confidence: f64,
}

/// The outcome of one scoring attempt, as returned by the scorer chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// Trust score, 0–100.
    pub trust_score: u8,
    /// Majority label across models.
    pub consensus: ConsensusLabel,
    /// Whether the score reached the auto-publish threshold.
    pub auto_publish: bool,
    /// Number of models consulted.
    pub total_models: u32,
    /// Per-model predictions.
    pub models: Vec<ModelPrediction>,
}

/// The analysis record held in the cache, keyed by article id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Article (or proposal-owning article) id.
    pub article_id: String,
    pub trust_score: u8,
    pub consensus: ConsensusLabel,
    pub auto_publish: bool,
    pub total_models: u32,
    pub models: Vec<ModelPrediction>,
    /// When the analysis ran.
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisRecord {
    /// Build a record from a scoring outcome.
    pub fn from_outcome(article_id: &str, outcome: AnalysisOutcome, now: DateTime<Utc>) -> Self {
        Self {
            article_id: article_id.to_string(),
            trust_score: outcome.trust_score,
            consensus: outcome.consensus,
            auto_publish: outcome.auto_publish,
            total_models: outcome.total_models,
            models: outcome.models,
            analyzed_at: now,
        }
    }
}
