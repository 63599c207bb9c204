// crates/orbis-daemon/src/main.rs
//
// Binary entrypoint for the Orbis synchronization daemon.
//
// Initializes tracing, parses CLI arguments, loads configuration,
// constructs the gateway/store/scorer clients, and either runs the
// long-lived event loop (default) or one of the maintenance commands:
// full resync, validator-stat repair, or manual re-scoring.

mod config;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;

use config::DaemonConfig;
use orbis_core::{ArticleCache, ArticleScorer, ContentStore, LedgerGateway, ValidatorStore};
use orbis_engine::{
    run_event_loop, CacheSynchronizer, EventLoopConfig, LifecycleController,
};
use orbis_ledger::{EventFeed, LedgerClient, LedgerConfig};
use orbis_reputation::ReputationLedger;
use orbis_scoring::{
    AnalyzerClient, AnalyzerConfig, ScoringChain, SentimentClient, SentimentConfig,
};
use orbis_store::{ContentClient, ContentConfig, MemoryCache, RocksCache};

/// Orbis synchronization daemon: mirrors ledger truth into the read cache
/// and maintains validator reputation.
#[derive(Parser, Debug)]
#[command(name = "orbis-daemon", version = "0.1.0", about = "Orbis validation & reputation sync daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.orbis/config.toml")]
    config: String,

    /// Run a full cache resync and exit.
    #[arg(long)]
    resync: bool,

    /// Repair drifted validator vote totals, recalculate ratings, and exit.
    #[arg(long)]
    repair_validators: bool,

    /// Re-run scoring for one article (e.g. after scoring was exhausted)
    /// and exit.
    #[arg(long, value_name = "ARTICLE_ID")]
    score_article: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber for structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration from TOML file, falling back to defaults if the
    // file is not found.
    let config_path = expand_tilde(&args.config);
    let config = match DaemonConfig::load(&config_path) {
        Ok(cfg) => {
            tracing::info!("Loaded configuration from {}", config_path);
            cfg
        }
        Err(e) => {
            tracing::warn!(
                "Could not load config from {}: {}. Using defaults.",
                config_path,
                e
            );
            DaemonConfig::default()
        }
    };

    tracing::info!("Orbis Daemon v0.1.0");
    tracing::info!("Ledger endpoint: {}", config.ledger_endpoint);
    tracing::info!("Content gateway: {}", config.content_gateway);
    tracing::info!("Analyzer endpoint: {}", config.analyzer_endpoint);
    tracing::info!("Data directory: {}", config.data_dir);

    // ---------------------------------------------------------------
    // Construct the external clients.
    // ---------------------------------------------------------------
    let ledger_client = LedgerClient::new(LedgerConfig::new(&config.ledger_endpoint))?;
    let ledger: Arc<dyn LedgerGateway> = Arc::new(ledger_client.clone());

    let content: Arc<dyn ContentStore> =
        Arc::new(ContentClient::new(ContentConfig::new(&config.content_gateway))?);

    let scorer: Arc<dyn ArticleScorer> = Arc::new(ScoringChain::new(
        AnalyzerClient::new(AnalyzerConfig::new(&config.analyzer_endpoint))?,
        SentimentClient::new(SentimentConfig::new(&config.sentiment_endpoint))?,
    ));

    // ---------------------------------------------------------------
    // Open the cache store. A broken data directory degrades to the
    // in-memory store: reads fall back to the ledger, nothing is lost.
    // ---------------------------------------------------------------
    let data_dir = expand_tilde(&config.data_dir);
    let cache_path = format!("{}/cache_rocksdb", data_dir);
    let (cache, validators): (Arc<dyn ArticleCache>, Arc<dyn ValidatorStore>) =
        match RocksCache::open(&cache_path) {
            Ok(rocks) => {
                tracing::info!("Cache store initialized at {}", cache_path);
                let rocks = Arc::new(rocks);
                (rocks.clone(), rocks)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to open cache at {}: {}. Running with in-memory store.",
                    cache_path,
                    e
                );
                let memory = Arc::new(MemoryCache::new());
                (memory.clone(), memory)
            }
        };

    // ---------------------------------------------------------------
    // Wire the engine.
    // ---------------------------------------------------------------
    let reputation = Arc::new(ReputationLedger::new(validators));
    let synchronizer = Arc::new(CacheSynchronizer::new(
        ledger.clone(),
        content.clone(),
        cache.clone(),
        reputation.clone(),
    ));
    let controller = Arc::new(LifecycleController::new(
        ledger.clone(),
        content.clone(),
        scorer,
        cache,
        reputation.clone(),
        synchronizer.clone(),
    ));

    // ---------------------------------------------------------------
    // Maintenance commands run to completion and exit.
    // ---------------------------------------------------------------
    if args.resync {
        let report = synchronizer.full_resync().await?;
        tracing::info!(
            "Resync finished: {} total, {} synced, {} failed",
            report.total,
            report.synced,
            report.failed
        );
        return Ok(());
    }

    if args.repair_validators {
        let repaired = reputation.repair_totals(Utc::now()).await?;
        let recalculated = reputation.recalculate_all(Utc::now()).await?;
        tracing::info!(
            "Validator repair finished: {} repaired, {} recalculated",
            repaired,
            recalculated
        );
        return Ok(());
    }

    if let Some(article_id) = args.score_article {
        let article = ledger.get_article(&article_id).await?;
        let document = content.fetch(&article.content_address).await;
        if document.is_placeholder() {
            return Err(format!(
                "content for article {} is unavailable; cannot score",
                article_id
            )
            .into());
        }
        let outcome = controller.score_article(&article_id, &document.body).await?;
        tracing::info!(
            "Article {} re-scored: {} ({})",
            article_id,
            outcome.trust_score,
            if outcome.auto_publish {
                "auto-published"
            } else {
                "sent to validators"
            }
        );
        return Ok(());
    }

    // ---------------------------------------------------------------
    // Default mode: the supervised event loop, in the foreground for the
    // life of the process.
    // ---------------------------------------------------------------
    let feed = EventFeed::new(ledger_client, config.event_cursor);
    let loop_config = EventLoopConfig {
        poll_interval: Duration::from_secs(config.poll_interval_secs),
        backoff_initial: Duration::from_secs(config.backoff_initial_secs),
        backoff_max: Duration::from_secs(config.backoff_max_secs),
    };

    tracing::info!(
        "Starting event loop from cursor {} (poll every {}s)",
        config.event_cursor,
        config.poll_interval_secs
    );
    run_event_loop(feed, synchronizer, loop_config).await;

    Ok(())
}

/// Expand `~` at the start of a path to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{}", home.display(), &path[1..]);
        }
    }
    path.to_string()
}
