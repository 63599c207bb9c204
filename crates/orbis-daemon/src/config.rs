// crates/orbis-daemon/src/config.rs
//
// Runtime configuration for the Orbis daemon.
// Loaded from a TOML file or populated with sensible defaults.

use serde::Deserialize;
use std::fs;

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// URL of the ledger RPC endpoint.
    #[serde(default = "default_ledger_endpoint")]
    pub ledger_endpoint: String,

    /// URL of the content gateway.
    #[serde(default = "default_content_gateway")]
    pub content_gateway: String,

    /// URL of the multi-model analysis service (primary scorer).
    #[serde(default = "default_analyzer_endpoint")]
    pub analyzer_endpoint: String,

    /// URL of the sentiment service (fallback scorer).
    #[serde(default = "default_sentiment_endpoint")]
    pub sentiment_endpoint: String,

    /// Directory for local data storage (the cache database).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Event cursor to resume the subscription from. 0 replays from the
    /// beginning, which is safe: handlers are idempotent.
    #[serde(default)]
    pub event_cursor: u64,

    /// Seconds between event polls when caught up.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// First reconnect delay after a failed poll, in seconds.
    #[serde(default = "default_backoff_initial_secs")]
    pub backoff_initial_secs: u64,

    /// Reconnect delay ceiling, in seconds.
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_ledger_endpoint() -> String {
    "http://127.0.0.1:9545".to_string()
}

fn default_content_gateway() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_analyzer_endpoint() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_sentiment_endpoint() -> String {
    "http://127.0.0.1:5001".to_string()
}

fn default_data_dir() -> String {
    "~/.orbis/data".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_backoff_initial_secs() -> u64 {
    1
}

fn default_backoff_max_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            ledger_endpoint: default_ledger_endpoint(),
            content_gateway: default_content_gateway(),
            analyzer_endpoint: default_analyzer_endpoint(),
            sentiment_endpoint: default_sentiment_endpoint(),
            data_dir: default_data_dir(),
            event_cursor: 0,
            poll_interval_secs: default_poll_interval_secs(),
            backoff_initial_secs: default_backoff_initial_secs(),
            backoff_max_secs: default_backoff_max_secs(),
            log_level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: DaemonConfig = toml::from_str(&contents)?;
        Ok(config)
    }
}
