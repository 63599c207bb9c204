// crates/orbis-scoring/src/lib.rs
//
// orbis-scoring: automated trust scoring for submitted content.
//
// Two scorers, tried in a strict total order: the multi-model analysis
// service first, then the sentiment service as fallback. The second runs
// only when the first fails, never in parallel, so each article sees a
// single score submission. Exhausting both is a distinct, non-retried
// error left for manual remediation.

pub mod analyzer;
pub mod chain;
pub mod sentiment;

pub use analyzer::{AnalyzerClient, AnalyzerConfig};
pub use chain::ScoringChain;
pub use sentiment::{sentiment_to_trust_score, SentimentClient, SentimentConfig};
