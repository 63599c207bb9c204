// crates/orbis-engine/src/event_loop.rs
//
// Supervised event subscription loop.
//
// Polls the ledger event feed for the life of the process. A failed poll
// backs off exponentially (capped) and retries; the subscription is
// restartable, never fire-and-forget. A failed handler is logged and
// skipped; the next event for the same id re-reads current state, so a
// missed update heals itself.

use std::sync::Arc;
use std::time::Duration;

use orbis_ledger::EventSource;

use crate::sync::CacheSynchronizer;

/// Timing knobs for the event loop.
#[derive(Debug, Clone)]
pub struct EventLoopConfig {
    /// Sleep between polls when the feed is caught up.
    pub poll_interval: Duration,
    /// First reconnect delay after a failed poll.
    pub backoff_initial: Duration,
    /// Reconnect delay ceiling.
    pub backoff_max: Duration,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            backoff_initial: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
        }
    }
}

/// Run the event loop until the task is cancelled.
pub async fn run_event_loop<S: EventSource>(
    mut source: S,
    synchronizer: Arc<CacheSynchronizer>,
    config: EventLoopConfig,
) {
    let mut backoff = config.backoff_initial;

    loop {
        match source.poll().await {
            Ok(events) => {
                backoff = config.backoff_initial;

                if events.is_empty() {
                    tokio::time::sleep(config.poll_interval).await;
                    continue;
                }

                tracing::debug!("processing {} ledger events", events.len());
                for event in &events {
                    if let Err(e) = synchronizer.handle_event(event).await {
                        tracing::warn!("event handler failed for {:?}: {}", event, e);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "event poll failed, reconnecting in {:?}: {}",
                    backoff,
                    e
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(config.backoff_max);
            }
        }
    }
}
