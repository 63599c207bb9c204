// crates/orbis-reputation/src/ledger.rs
//
// The Reputation Ledger: the single writer of derived validator state.
//
// Counters here are true increments, not re-reads, so every mutation runs
// as a read-modify-write under a per-address async lock. Concurrent
// outcome notifications for the same validator serialize; different
// validators never contend.
//
// A vote is counted exactly once per (validator, article): the cast
// handler counts it and enqueues an unresolved entry; the outcome handler
// resolves the oldest unresolved entry without re-counting, and only
// counts when it sees an outcome for a vote that was never observed cast
// (a vote placed outside the engine).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use orbis_core::{OrbisError, TokenAmount, ValidatorRecord, ValidatorStore};
use orbis_core::validator::normalize_address;

use crate::rating::refresh_derived;

/// One page of validator records.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidatorPage {
    /// Records for this page, rating descending.
    pub validators: Vec<ValidatorRecord>,
    /// Total record count across all pages.
    pub total: usize,
    /// 1-based page number.
    pub page: usize,
    /// Total number of pages.
    pub pages: usize,
}

/// Validator reputation operations over a `ValidatorStore`.
pub struct ReputationLedger {
    store: Arc<dyn ValidatorStore>,
    /// Per-address mutation locks, created lazily.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ReputationLedger {
    pub fn new(store: Arc<dyn ValidatorStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The mutation lock for one address, created on first use.
    async fn lock_for(&self, address: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(address.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Load a record or create a fresh one. Caller holds the address lock.
    async fn load_or_create(
        &self,
        address: &str,
        now: DateTime<Utc>,
    ) -> Result<ValidatorRecord, OrbisError> {
        match self.store.get_validator(address).await? {
            Some(record) => Ok(record),
            None => Ok(ValidatorRecord::new(address, now)),
        }
    }

    /// Read a validator's record without creating one.
    pub async fn get(&self, address: &str) -> Result<Option<ValidatorRecord>, OrbisError> {
        self.store.get_validator(&normalize_address(address)).await
    }

    /// Record that a validator cast a vote on an article.
    ///
    /// Idempotent per (validator, article): a duplicate notification is a
    /// no-op. Counts the vote and enqueues it as unresolved.
    pub async fn record_vote_cast(
        &self,
        validator: &str,
        article_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ValidatorRecord, OrbisError> {
        let address = normalize_address(validator);
        let lock = self.lock_for(&address).await;
        let _guard = lock.lock().await;

        let mut record = self.load_or_create(&address, now).await?;
        if record.voted_articles.contains(article_id) {
            tracing::debug!(
                "duplicate vote-cast notification for {} on article {}, ignoring",
                address,
                article_id
            );
            return Ok(record);
        }

        record.voted_articles.insert(article_id.to_string());
        record.open_votes.push(article_id.to_string());
        record.total_votes += 1;
        record.last_vote_at = Some(now);

        refresh_derived(&mut record, now);
        self.store.put_validator(&record).await?;
        Ok(record)
    }

    /// Record the resolution of a vote: correct (rewarded) or wrong
    /// (penalized).
    ///
    /// Resolves the oldest unresolved cast for this validator. The vote was
    /// already counted at cast time; only when no cast was observed is it
    /// counted here, so `total_votes == correct_votes + wrong_votes` holds
    /// once every cast has been paired with its outcome.
    pub async fn record_vote_outcome(
        &self,
        validator: &str,
        is_correct: bool,
        reward: TokenAmount,
        penalty: TokenAmount,
        now: DateTime<Utc>,
    ) -> Result<ValidatorRecord, OrbisError> {
        let address = normalize_address(validator);
        let lock = self.lock_for(&address).await;
        let _guard = lock.lock().await;

        let mut record = self.load_or_create(&address, now).await?;

        if record.open_votes.is_empty() {
            // Outcome for a vote this engine never saw cast.
            record.total_votes += 1;
        } else {
            record.open_votes.remove(0);
        }

        record.articles_validated += 1;
        if is_correct {
            record.correct_votes += 1;
            record.consecutive_correct_votes += 1;
            record.total_rewards_earned = record.total_rewards_earned.saturating_add(reward);
        } else {
            record.wrong_votes += 1;
            record.consecutive_correct_votes = 0;
            record.total_penalties_paid = record.total_penalties_paid.saturating_add(penalty);
        }

        refresh_derived(&mut record, now);
        self.store.put_validator(&record).await?;
        Ok(record)
    }

    /// Overwrite a validator's stake with the authoritative ledger balance.
    ///
    /// Always a full overwrite from a re-read; deltas from events are
    /// never trusted.
    pub async fn update_stake(
        &self,
        validator: &str,
        balance: TokenAmount,
        now: DateTime<Utc>,
    ) -> Result<ValidatorRecord, OrbisError> {
        let address = normalize_address(validator);
        let lock = self.lock_for(&address).await;
        let _guard = lock.lock().await;

        let mut record = self.load_or_create(&address, now).await?;
        record.total_stake = balance;

        refresh_derived(&mut record, now);
        self.store.put_validator(&record).await?;
        Ok(record)
    }

    /// The leaderboard: top records by rating, ties broken by vote count.
    pub async fn list_top(&self, limit: usize) -> Result<Vec<ValidatorRecord>, OrbisError> {
        let mut records = self.store.list_validators().await?;
        records.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.total_votes.cmp(&a.total_votes))
        });
        records.truncate(limit);
        Ok(records)
    }

    /// Offset-paginated listing, rating descending. Pages are 1-based.
    pub async fn list_all(&self, page: usize, limit: usize) -> Result<ValidatorPage, OrbisError> {
        if limit == 0 {
            return Err(OrbisError::Validation("page limit must be positive".into()));
        }
        let page = page.max(1);

        let mut records = self.store.list_validators().await?;
        records.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let total = records.len();
        let pages = total.div_ceil(limit);
        let validators: Vec<ValidatorRecord> = records
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .collect();

        Ok(ValidatorPage {
            validators,
            total,
            page,
            pages,
        })
    }

    /// Recompute rating and verified status for every record.
    ///
    /// Idempotent and safe to run concurrently with individual updates:
    /// each record is reloaded and rewritten under its own lock, so the
    /// last write per record wins. Returns the number of records touched.
    pub async fn recalculate_all(&self, now: DateTime<Utc>) -> Result<usize, OrbisError> {
        let records = self.store.list_validators().await?;
        let mut count = 0;

        for record in records {
            let lock = self.lock_for(&record.address).await;
            let _guard = lock.lock().await;

            // Reload inside the lock; the listed copy may be stale.
            if let Some(mut current) = self.store.get_validator(&record.address).await? {
                refresh_derived(&mut current, now);
                self.store.put_validator(&current).await?;
                count += 1;
            }
        }

        Ok(count)
    }

    /// Repair records whose vote counters drifted.
    ///
    /// Historical deployments double-counted `total_votes` by incrementing
    /// in both the cast and the outcome handler. The correct total is
    /// resolved votes plus still-open casts; any record off that total is
    /// reset and its derived fields recomputed. Returns the number of
    /// repaired records.
    pub async fn repair_totals(&self, now: DateTime<Utc>) -> Result<usize, OrbisError> {
        let records = self.store.list_validators().await?;
        let mut repaired = 0;

        for record in records {
            let lock = self.lock_for(&record.address).await;
            let _guard = lock.lock().await;

            let Some(mut current) = self.store.get_validator(&record.address).await? else {
                continue;
            };
            let expected =
                current.correct_votes + current.wrong_votes + current.open_votes.len() as u32;
            if current.total_votes != expected {
                tracing::warn!(
                    "repairing vote totals for {}: {} -> {}",
                    current.address,
                    current.total_votes,
                    expected
                );
                current.total_votes = expected;
                refresh_derived(&mut current, now);
                self.store.put_validator(&current).await?;
                repaired += 1;
            }
        }

        Ok(repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use tokio::sync::RwLock;

    /// Minimal in-memory validator store for exercising the ledger.
    #[derive(Default)]
    struct MemStore {
        records: RwLock<BTreeMap<String, ValidatorRecord>>,
    }

    #[async_trait]
    impl ValidatorStore for MemStore {
        async fn get_validator(
            &self,
            address: &str,
        ) -> Result<Option<ValidatorRecord>, OrbisError> {
            Ok(self.records.read().await.get(address).cloned())
        }

        async fn put_validator(&self, record: &ValidatorRecord) -> Result<(), OrbisError> {
            self.records
                .write()
                .await
                .insert(record.address.clone(), record.clone());
            Ok(())
        }

        async fn list_validators(&self) -> Result<Vec<ValidatorRecord>, OrbisError> {
            Ok(self.records.read().await.values().cloned().collect())
        }
    }

    fn ledger() -> ReputationLedger {
        ReputationLedger::new(Arc::new(MemStore::default()))
    }

    #[tokio::test]
    async fn cast_then_outcome_counts_vote_once() {
        let ledger = ledger();
        let now = Utc::now();

        ledger.record_vote_cast("0xV1", "7", now).await.unwrap();
        let record = ledger
            .record_vote_outcome("0xV1", true, TokenAmount(100), TokenAmount::zero(), now)
            .await
            .unwrap();

        assert_eq!(record.total_votes, 1);
        assert_eq!(record.correct_votes, 1);
        assert_eq!(record.wrong_votes, 0);
        assert_eq!(record.total_votes, record.correct_votes + record.wrong_votes);
        assert!(record.open_votes.is_empty());
    }

    #[tokio::test]
    async fn duplicate_cast_notification_is_noop() {
        let ledger = ledger();
        let now = Utc::now();

        ledger.record_vote_cast("0xv1", "7", now).await.unwrap();
        let record = ledger.record_vote_cast("0xV1", "7", now).await.unwrap();

        assert_eq!(record.total_votes, 1);
        assert_eq!(record.open_votes.len(), 1);
    }

    #[tokio::test]
    async fn outcome_without_cast_counts_the_vote() {
        let ledger = ledger();
        let now = Utc::now();

        // Vote placed outside the engine: only the outcome is observed.
        let record = ledger
            .record_vote_outcome("0xv1", false, TokenAmount::zero(), TokenAmount(25), now)
            .await
            .unwrap();

        assert_eq!(record.total_votes, 1);
        assert_eq!(record.wrong_votes, 1);
        assert_eq!(record.total_votes, record.correct_votes + record.wrong_votes);
        assert_eq!(record.total_penalties_paid.to_decimal_string(), "25");
    }

    #[tokio::test]
    async fn invariant_holds_across_mixed_sequence() {
        let ledger = ledger();
        let now = Utc::now();

        for article in ["1", "2", "3"] {
            ledger.record_vote_cast("0xv1", article, now).await.unwrap();
        }
        ledger
            .record_vote_outcome("0xv1", true, TokenAmount(10), TokenAmount::zero(), now)
            .await
            .unwrap();
        ledger
            .record_vote_outcome("0xv1", false, TokenAmount::zero(), TokenAmount(5), now)
            .await
            .unwrap();
        let record = ledger
            .record_vote_outcome("0xv1", true, TokenAmount(10), TokenAmount::zero(), now)
            .await
            .unwrap();

        assert_eq!(record.total_votes, 3);
        assert_eq!(record.correct_votes, 2);
        assert_eq!(record.wrong_votes, 1);
        assert_eq!(record.total_votes, record.correct_votes + record.wrong_votes);
        assert_eq!(record.articles_validated, 3);
    }

    #[tokio::test]
    async fn rewards_accumulate_exactly() {
        let ledger = ledger();
        let now = Utc::now();

        ledger
            .record_vote_outcome(
                "0xv1",
                true,
                TokenAmount::parse("100").unwrap(),
                TokenAmount::zero(),
                now,
            )
            .await
            .unwrap();
        let record = ledger
            .record_vote_outcome(
                "0xv1",
                true,
                TokenAmount::parse("50").unwrap(),
                TokenAmount::zero(),
                now,
            )
            .await
            .unwrap();

        assert_eq!(record.total_rewards_earned.to_decimal_string(), "150");
        assert_eq!(record.consecutive_correct_votes, 2);
    }

    #[tokio::test]
    async fn wrong_vote_resets_streak() {
        let ledger = ledger();
        let now = Utc::now();

        ledger
            .record_vote_outcome("0xv1", true, TokenAmount(10), TokenAmount::zero(), now)
            .await
            .unwrap();
        ledger
            .record_vote_outcome("0xv1", true, TokenAmount(10), TokenAmount::zero(), now)
            .await
            .unwrap();
        let record = ledger
            .record_vote_outcome("0xv1", false, TokenAmount::zero(), TokenAmount(5), now)
            .await
            .unwrap();

        assert_eq!(record.consecutive_correct_votes, 0);
        assert_eq!(record.correct_votes, 2);
        assert_eq!(record.wrong_votes, 1);
    }

    #[tokio::test]
    async fn update_stake_overwrites_and_refreshes() {
        let ledger = ledger();
        let now = Utc::now();

        ledger
            .update_stake("0xV1", TokenAmount::from_whole(250), now)
            .await
            .unwrap();
        // The authoritative balance shrank; the record follows it down.
        let record = ledger
            .update_stake("0xv1", TokenAmount::from_whole(100), now)
            .await
            .unwrap();

        assert_eq!(record.total_stake, TokenAmount::from_whole(100));
        assert!(record.rating > 0.0);
        assert!((0.0..=5.0).contains(&record.rating));
    }

    #[tokio::test]
    async fn leaderboard_orders_by_rating_then_votes() {
        let ledger = ledger();
        let now = Utc::now();

        // Same accuracy profile, different stake => different rating.
        ledger
            .record_vote_outcome("0xlow", true, TokenAmount(1), TokenAmount::zero(), now)
            .await
            .unwrap();
        ledger
            .record_vote_outcome("0xhigh", true, TokenAmount(1), TokenAmount::zero(), now)
            .await
            .unwrap();
        ledger
            .update_stake("0xhigh", TokenAmount::from_whole(500), now)
            .await
            .unwrap();

        let top = ledger.list_top(10).await.unwrap();
        assert_eq!(top[0].address, "0xhigh");
        assert_eq!(top[1].address, "0xlow");

        let only_one = ledger.list_top(1).await.unwrap();
        assert_eq!(only_one.len(), 1);
    }

    #[tokio::test]
    async fn pagination_reports_totals() {
        let ledger = ledger();
        let now = Utc::now();

        for i in 0..5 {
            ledger
                .update_stake(&format!("0xv{}", i), TokenAmount::from_whole(i), now)
                .await
                .unwrap();
        }

        let page1 = ledger.list_all(1, 2).await.unwrap();
        assert_eq!(page1.validators.len(), 2);
        assert_eq!(page1.total, 5);
        assert_eq!(page1.pages, 3);

        let page3 = ledger.list_all(3, 2).await.unwrap();
        assert_eq!(page3.validators.len(), 1);

        assert!(ledger.list_all(1, 0).await.is_err());
    }

    #[tokio::test]
    async fn recalculate_all_is_idempotent() {
        let ledger = ledger();
        let now = Utc::now();

        ledger
            .record_vote_outcome("0xv1", true, TokenAmount(10), TokenAmount::zero(), now)
            .await
            .unwrap();
        ledger
            .update_stake("0xv2", TokenAmount::from_whole(500), now)
            .await
            .unwrap();

        let first = ledger.recalculate_all(now).await.unwrap();
        assert_eq!(first, 2);

        let before = ledger.get("0xv1").await.unwrap().unwrap();
        let second = ledger.recalculate_all(now).await.unwrap();
        assert_eq!(second, 2);
        let after = ledger.get("0xv1").await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn repair_fixes_double_counted_totals() {
        let store = Arc::new(MemStore::default());
        let now = Utc::now();

        // Simulate the historical corruption: totals counted twice.
        let mut corrupted = ValidatorRecord::new("0xbad", now);
        corrupted.total_votes = 20;
        corrupted.correct_votes = 8;
        corrupted.wrong_votes = 2;
        store.put_validator(&corrupted).await.unwrap();

        let mut healthy = ValidatorRecord::new("0xok", now);
        healthy.total_votes = 5;
        healthy.correct_votes = 4;
        healthy.wrong_votes = 1;
        store.put_validator(&healthy).await.unwrap();

        let ledger = ReputationLedger::new(store);
        let repaired = ledger.repair_totals(now).await.unwrap();
        assert_eq!(repaired, 1);

        let fixed = ledger.get("0xbad").await.unwrap().unwrap();
        assert_eq!(fixed.total_votes, 10);
        assert_eq!(fixed.total_votes, fixed.correct_votes + fixed.wrong_votes);

        // Running it again finds nothing to do.
        assert_eq!(ledger.repair_totals(now).await.unwrap(), 0);
    }
}
