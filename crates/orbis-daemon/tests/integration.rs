// crates/orbis-daemon/tests/integration.rs
//
// End-to-end tests for the Orbis engine: submission through scoring and
// validator consensus, event-driven reputation updates, and resync
// idempotence.
//
// These tests use the public APIs of the underlying library crates
// directly (orbis-engine, orbis-reputation, orbis-store, orbis-core)
// since the daemon is a binary crate with no lib.rs. The ledger and
// content gateway are the in-memory fakes from orbis_engine::testing,
// which enforce the same rules the real contracts do.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use orbis_core::{ArticleCache, ArticleStatus, ContentDocument, OrbisError, TokenAmount};
use orbis_engine::testing::{FakeContentStore, FakeLedger, ScriptedEvents, ScriptedScorer};
use orbis_engine::{run_event_loop, CacheSynchronizer, EventLoopConfig, LifecycleController};
use orbis_ledger::LedgerEvent;
use orbis_reputation::ReputationLedger;
use orbis_store::{MemoryCache, RocksCache};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a temporary directory path unique to this test run.
fn temp_db_path(label: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before unix epoch")
        .as_nanos();
    std::env::temp_dir()
        .join(format!("orbis_test_{}_{}_{}", label, std::process::id(), nanos))
        .to_string_lossy()
        .to_string()
}

struct Harness {
    ledger: Arc<FakeLedger>,
    cache: Arc<MemoryCache>,
    reputation: Arc<ReputationLedger>,
    synchronizer: Arc<CacheSynchronizer>,
    controller: Arc<LifecycleController>,
}

/// Wire the full engine over in-memory stores, with a scorer that always
/// returns the given trust score.
fn harness(trust_score: u8) -> Harness {
    let ledger = Arc::new(FakeLedger::new());
    let content = Arc::new(FakeContentStore::new());
    let cache = Arc::new(MemoryCache::new());
    let reputation = Arc::new(ReputationLedger::new(cache.clone()));
    let synchronizer = Arc::new(CacheSynchronizer::new(
        ledger.clone(),
        content.clone(),
        cache.clone(),
        reputation.clone(),
    ));
    let controller = Arc::new(LifecycleController::new(
        ledger.clone(),
        content.clone(),
        Arc::new(ScriptedScorer::scoring(trust_score)),
        cache.clone(),
        reputation.clone(),
        synchronizer.clone(),
    ));
    Harness {
        ledger,
        cache,
        reputation,
        synchronizer,
        controller,
    }
}

/// Deliver every event the fake ledger has recorded through the
/// synchronizer, the way the live event loop would.
async fn drain_through_synchronizer(harness: &Harness) {
    for event in harness.ledger.drain_events().await {
        harness
            .synchronizer
            .handle_event(&event)
            .await
            .expect("event handling should succeed");
    }
}

// ---------------------------------------------------------------------------
// Scenario A: score 90 publishes without validator votes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_a_high_score_publishes_without_votes() {
    let fx = harness(90);

    let receipt = fx
        .controller
        .submit_article("Verified report", "Well-sourced body")
        .await
        .unwrap();
    fx.controller
        .score_article(&receipt.article_id, "Well-sourced body")
        .await
        .unwrap();
    drain_through_synchronizer(&fx).await;

    let article = fx
        .cache
        .get_article(&receipt.article_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(article.status, ArticleStatus::Published);
    assert_eq!(article.trust_score, 90);
    assert_eq!(article.yes_votes, 0);
    assert_eq!(article.no_votes, 0);
}

// ---------------------------------------------------------------------------
// Scenario B: score 50, votes {yes, yes, no} rejects at 66.7% < 75%
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_b_below_threshold_consensus_rejects() {
    let fx = harness(50);

    let receipt = fx
        .controller
        .submit_article("Contested claim", "Needs review")
        .await
        .unwrap();
    fx.controller
        .score_article(&receipt.article_id, "Needs review")
        .await
        .unwrap();

    for validator in ["0xv1", "0xv2", "0xv3"] {
        fx.ledger
            .stake(validator, TokenAmount::from_whole(100))
            .await;
    }
    fx.controller
        .cast_vote(&receipt.article_id, true, "0xv1")
        .await
        .unwrap();
    fx.controller
        .cast_vote(&receipt.article_id, true, "0xv2")
        .await
        .unwrap();
    fx.controller
        .cast_vote(&receipt.article_id, false, "0xv3")
        .await
        .unwrap();
    drain_through_synchronizer(&fx).await;

    let article = fx
        .cache
        .get_article(&receipt.article_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(article.status, ArticleStatus::Rejected);
    assert_eq!(article.yes_votes, 2);
    assert_eq!(article.no_votes, 1);

    // The finalization paid out: the no-voter was right, the yes-voters
    // were slashed. Each validator's vote is counted exactly once.
    let right = fx.reputation.get("0xv3").await.unwrap().unwrap();
    assert_eq!(right.total_votes, 1);
    assert_eq!(right.correct_votes, 1);
    assert_eq!(right.wrong_votes, 0);
    assert_eq!(right.total_rewards_earned, TokenAmount::from_whole(10));

    for wrong_voter in ["0xv1", "0xv2"] {
        let record = fx.reputation.get(wrong_voter).await.unwrap().unwrap();
        assert_eq!(record.total_votes, 1);
        assert_eq!(record.correct_votes, 0);
        assert_eq!(record.wrong_votes, 1);
        assert_eq!(
            record.total_votes,
            record.correct_votes + record.wrong_votes
        );
        assert_eq!(record.total_penalties_paid, TokenAmount::from_whole(5));
        assert_eq!(record.consecutive_correct_votes, 0);
    }
}

// ---------------------------------------------------------------------------
// Scenario C: reward amounts accumulate by exact integer arithmetic
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_c_rewards_accumulate_exactly() {
    let fx = harness(50);

    for (amount, expected_total) in [("100", "100"), ("50", "150")] {
        fx.synchronizer
            .handle_event(&LedgerEvent::Rewarded {
                validator: "0xEarner".to_string(),
                amount: TokenAmount::parse(amount).unwrap(),
            })
            .await
            .unwrap();

        let record = fx.reputation.get("0xearner").await.unwrap().unwrap();
        assert_eq!(record.total_rewards_earned.to_decimal_string(), expected_total);
    }
}

// ---------------------------------------------------------------------------
// Scenario D: verification fails on stake alone
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_d_verification_fails_only_on_stake() {
    let fx = harness(50);
    let joined = Utc::now() - chrono::Duration::days(120);

    // Build up a 120-day-old validator with 60 votes at 90% accuracy.
    let store: Arc<MemoryCache> = fx.cache.clone();
    let mut record = orbis_core::ValidatorRecord::new("0xalmost", joined);
    record.total_votes = 60;
    record.correct_votes = 54;
    record.wrong_votes = 6;
    record.articles_validated = 60;
    record.total_stake = TokenAmount::from_whole(499);
    orbis_core::ValidatorStore::put_validator(store.as_ref(), &record)
        .await
        .unwrap();
    fx.reputation.recalculate_all(Utc::now()).await.unwrap();

    let record = fx.reputation.get("0xalmost").await.unwrap().unwrap();
    assert!(record.rating >= 4.0, "rating was {}", record.rating);
    assert!(record.total_votes >= 50);
    assert!(record.accuracy() >= 0.85);
    assert!(record.tenure_days(Utc::now()) >= 90.0);
    // Stake is the single failing condition.
    assert!(record.total_stake < TokenAmount::from_whole(500));
    assert!(!record.verified);

    // Topping up the stake flips the badge.
    fx.reputation
        .update_stake("0xalmost", TokenAmount::from_whole(500), Utc::now())
        .await
        .unwrap();
    let record = fx.reputation.get("0xalmost").await.unwrap().unwrap();
    assert!(record.verified);
}

// ---------------------------------------------------------------------------
// Scenario E: full resync is idempotent, byte for byte
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_e_resync_twice_is_byte_identical() {
    let ledger = Arc::new(FakeLedger::new());
    let content = Arc::new(FakeContentStore::new());

    for i in 0..4 {
        let address = content
            .store_document(&ContentDocument::new(
                format!("Article {}", i),
                format!("Body {}", i),
            ))
            .await;
        ledger.seed_article("0xauthor", &address, "0xhash").await;
    }
    ledger.set_score("1", 90).await; // published
    ledger.set_score("2", 40).await; // under review

    let path = temp_db_path("resync");
    let cache = Arc::new(RocksCache::open(&path).unwrap());
    let reputation = Arc::new(ReputationLedger::new(cache.clone()));
    let synchronizer = Arc::new(CacheSynchronizer::new(
        ledger.clone(),
        content.clone(),
        cache.clone(),
        reputation,
    ));

    let report = synchronizer.full_resync().await.unwrap();
    assert_eq!(report.total, 4);
    assert_eq!(report.synced, 4);
    assert_eq!(report.failed, 0);
    let first = serde_json::to_vec(&cache.list_articles().await.unwrap()).unwrap();

    let report = synchronizer.full_resync().await.unwrap();
    assert_eq!(report.synced, 4);
    let second = serde_json::to_vec(&cache.list_articles().await.unwrap()).unwrap();

    assert_eq!(first, second);

    // Re-fetch count stays flat on the second pass: content was reused.
    let fetches_before = content.fetch_count();
    synchronizer.full_resync().await.unwrap();
    assert_eq!(content.fetch_count(), fetches_before);
}

// ---------------------------------------------------------------------------
// Duplicated and out-of-order delivery converges
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shuffled_and_duplicated_events_converge() {
    let fx = harness(50);

    let receipt = fx.controller.submit_article("T", "B").await.unwrap();
    fx.controller
        .score_article(&receipt.article_id, "B")
        .await
        .unwrap();
    fx.ledger.stake("0xv1", TokenAmount::from_whole(100)).await;
    fx.controller
        .cast_vote(&receipt.article_id, true, "0xv1")
        .await
        .unwrap();

    let mut events = fx.ledger.drain_events().await;
    // Deliver newest first, then replay the whole batch again.
    events.reverse();
    let replayed: Vec<LedgerEvent> = events.iter().cloned().chain(events.clone()).collect();
    for event in &replayed {
        fx.synchronizer.handle_event(event).await.unwrap();
    }

    let article = fx
        .cache
        .get_article(&receipt.article_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(article.status, ArticleStatus::UnderReview);
    assert_eq!(article.yes_votes, 1);
    assert_eq!(article.trust_score, 50);

    // The duplicated Voted event did not double-count.
    let record = fx.reputation.get("0xv1").await.unwrap().unwrap();
    assert_eq!(record.total_votes, 1);
}

// ---------------------------------------------------------------------------
// The unified vote record: cast + outcome counts once
// ---------------------------------------------------------------------------

#[tokio::test]
async fn vote_cast_and_outcome_count_once_end_to_end() {
    let fx = harness(50);

    let receipt = fx.controller.submit_article("T", "B").await.unwrap();
    fx.controller
        .score_article(&receipt.article_id, "B")
        .await
        .unwrap();

    for validator in ["0xv1", "0xv2", "0xv3"] {
        fx.ledger
            .stake(validator, TokenAmount::from_whole(100))
            .await;
    }
    // All three approve; consensus publishes and rewards all of them.
    for validator in ["0xv1", "0xv2", "0xv3"] {
        fx.controller
            .cast_vote(&receipt.article_id, true, validator)
            .await
            .unwrap();
    }
    drain_through_synchronizer(&fx).await;

    for validator in ["0xv1", "0xv2", "0xv3"] {
        let record = fx.reputation.get(validator).await.unwrap().unwrap();
        // One cast notification (controller) + one Voted event (ledger) +
        // one Rewarded event resolved against it: exactly one counted vote.
        assert_eq!(record.total_votes, 1);
        assert_eq!(record.correct_votes, 1);
        assert_eq!(
            record.total_votes,
            record.correct_votes + record.wrong_votes
        );
        assert!(record.open_votes.is_empty());
        assert!((0.0..=5.0).contains(&record.rating));
    }

    let article = fx
        .cache
        .get_article(&receipt.article_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(article.status, ArticleStatus::Published);
}

// ---------------------------------------------------------------------------
// Event loop: full story through the supervised loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn event_loop_processes_a_full_story() {
    let fx = harness(50);

    let receipt = fx.controller.submit_article("T", "B").await.unwrap();
    fx.controller
        .score_article(&receipt.article_id, "B")
        .await
        .unwrap();
    fx.ledger.stake("0xv1", TokenAmount::from_whole(750)).await;

    // A transport failure sits in front of the real batch; the loop must
    // back off and recover.
    let source = ScriptedEvents::new(vec![
        Err(OrbisError::ledger("connection reset")),
        Ok(fx.ledger.drain_events().await),
    ]);

    let task = tokio::spawn(run_event_loop(
        source,
        fx.synchronizer.clone(),
        EventLoopConfig {
            poll_interval: Duration::from_millis(10),
            backoff_initial: Duration::from_millis(5),
            backoff_max: Duration::from_millis(20),
        },
    ));

    let mut stake_synced = false;
    for _ in 0..100 {
        if let Some(record) = fx.reputation.get("0xv1").await.unwrap() {
            if record.total_stake == TokenAmount::from_whole(750) {
                stake_synced = true;
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    task.abort();

    assert!(stake_synced, "stake should have been re-read and recorded");
    let article = fx
        .cache
        .get_article(&receipt.article_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(article.status, ArticleStatus::UnderReview);
}
