// crates/orbis-engine/src/testing.rs
//
// In-memory fakes backing the engine unit tests and the workspace
// integration tests.
//
// `FakeLedger` simulates the contract rules the real ledger enforces
// (auto-publish at score >= 80, a three-vote quorum with a 75% consensus
// threshold, duplicate-vote and must-stake rejections) and records the
// events a real node would emit, so tests can drive the synchronizer
// exactly the way production traffic does.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use orbis_core::consensus::{auto_publishes, evaluate_votes, ConsensusVerdict};
use orbis_core::{
    AnalysisOutcome, AnalysisRecord, Article, ArticleCache, ArticleScorer, ArticleStatus,
    ConsensusLabel, ContentDocument, ContentStore, LedgerArticle, LedgerGateway, LedgerVersion,
    ModelPrediction, OrbisError, ProposalStatus, TokenAmount, UpdateProposal, ValidatorStore,
};
use orbis_ledger::{EventSource, LedgerEvent};

/// Reward paid per correct vote, in base units.
const VOTE_REWARD: TokenAmount = TokenAmount(10 * orbis_core::ONE_TOKEN);

/// Penalty charged per wrong vote, in base units.
const VOTE_PENALTY: TokenAmount = TokenAmount(5 * orbis_core::ONE_TOKEN);

#[derive(Debug, Clone)]
struct StoredProposal {
    content_address: String,
    content_hash: String,
    proposer: String,
    votes: HashMap<String, bool>,
    status: ProposalStatus,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredArticle {
    author: String,
    content_address: String,
    content_hash: String,
    trust_score: u8,
    status: ArticleStatus,
    submitted_at: DateTime<Utc>,
    votes: HashMap<String, bool>,
    versions: Vec<LedgerVersion>,
    proposals: Vec<StoredProposal>,
}

impl StoredArticle {
    fn yes_votes(&self) -> u32 {
        self.votes.values().filter(|d| **d).count() as u32
    }

    fn no_votes(&self) -> u32 {
        self.votes.values().filter(|d| !**d).count() as u32
    }
}

#[derive(Default)]
struct LedgerState {
    articles: Vec<StoredArticle>,
    balances: HashMap<String, TokenAmount>,
    events: Vec<LedgerEvent>,
}

/// In-memory ledger implementing the gateway trait with contract rules.
#[derive(Default)]
pub struct FakeLedger {
    state: RwLock<LedgerState>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an article under an explicit author. Returns the id.
    pub async fn seed_article(
        &self,
        author: &str,
        content_address: &str,
        content_hash: &str,
    ) -> String {
        let mut state = self.state.write().await;
        let now = Utc::now();
        state.articles.push(StoredArticle {
            author: author.to_string(),
            content_address: content_address.to_string(),
            content_hash: content_hash.to_string(),
            trust_score: 0,
            status: ArticleStatus::Submitted,
            submitted_at: now,
            votes: HashMap::new(),
            versions: vec![LedgerVersion {
                content_address: content_address.to_string(),
                content_hash: content_hash.to_string(),
                timestamp: now,
            }],
            proposals: Vec::new(),
        });
        let id = state.articles.len().to_string();
        state.events.push(LedgerEvent::ArticleSubmitted {
            article_id: id.clone(),
            author: author.to_string(),
            content_address: content_address.to_string(),
        });
        id
    }

    /// Record a trust score, applying the auto-publish rule.
    pub async fn set_score(&self, id: &str, score: u8) {
        let mut state = self.state.write().await;
        let index = index_of(id);
        let article = &mut state.articles[index];
        article.trust_score = score;
        article.status = if auto_publishes(score) {
            ArticleStatus::Published
        } else {
            ArticleStatus::UnderReview
        };
        let status = article.status;
        state.events.push(LedgerEvent::AiScored {
            article_id: id.to_string(),
            trust_score: score,
            status: status.code(),
        });
        if status == ArticleStatus::Published {
            state.events.push(LedgerEvent::ArticleFinalized {
                article_id: id.to_string(),
                status: status.code(),
            });
        }
    }

    /// Set a validator's staked balance and emit the Staked event.
    pub async fn stake(&self, validator: &str, balance: TokenAmount) {
        let mut state = self.state.write().await;
        state
            .balances
            .insert(validator.to_lowercase(), balance);
        state.events.push(LedgerEvent::Staked {
            validator: validator.to_string(),
            amount: balance,
        });
    }

    /// Cast a vote under the contract rules, finalizing at quorum.
    pub async fn cast_vote(
        &self,
        id: &str,
        decision: bool,
        validator: &str,
    ) -> Result<(), OrbisError> {
        let mut state = self.state.write().await;
        let voter = validator.to_lowercase();

        if state
            .balances
            .get(&voter)
            .copied()
            .unwrap_or_default()
            == TokenAmount::zero()
        {
            return Err(OrbisError::ledger("Must stake first"));
        }

        let index = index_of(id);
        let article = &mut state.articles[index];
        if article.status != ArticleStatus::UnderReview {
            return Err(OrbisError::ledger("Article is not under review"));
        }
        if article.votes.contains_key(&voter) {
            return Err(OrbisError::ledger("Already voted"));
        }

        article.votes.insert(voter, decision);
        let yes = article.yes_votes();
        let no = article.no_votes();
        state.events.push(LedgerEvent::Voted {
            article_id: id.to_string(),
            validator: validator.to_string(),
            decision,
        });

        match evaluate_votes(yes, no) {
            ConsensusVerdict::Undecided => {}
            verdict => {
                let published = verdict == ConsensusVerdict::Approved;
                let article = &mut state.articles[index];
                article.status = if published {
                    ArticleStatus::Published
                } else {
                    ArticleStatus::Rejected
                };
                let status = article.status;
                let votes = article.votes.clone();
                state.events.push(LedgerEvent::ArticleFinalized {
                    article_id: id.to_string(),
                    status: status.code(),
                });
                // Voters who matched the outcome are rewarded, the rest
                // slashed.
                for (voter, voted_yes) in votes {
                    if voted_yes == published {
                        state.events.push(LedgerEvent::Rewarded {
                            validator: voter,
                            amount: VOTE_REWARD,
                        });
                    } else {
                        state.events.push(LedgerEvent::Slashed {
                            validator: voter,
                            amount: VOTE_PENALTY,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Apply an approved proposal as the article's new current version.
    fn apply_proposal(article: &mut StoredArticle, proposal_index: usize) {
        let proposal = &mut article.proposals[proposal_index];
        proposal.status = ProposalStatus::Approved;
        let now = Utc::now();
        article.versions.push(LedgerVersion {
            content_address: proposal.content_address.clone(),
            content_hash: proposal.content_hash.clone(),
            timestamp: now,
        });
        article.content_address = proposal.content_address.clone();
        article.content_hash = proposal.content_hash.clone();
    }

    /// Drain every event recorded so far, in emission order.
    pub async fn drain_events(&self) -> Vec<LedgerEvent> {
        let mut state = self.state.write().await;
        std::mem::take(&mut state.events)
    }
}

/// Article ids are 1-based decimal strings over a dense vector.
fn index_of(id: &str) -> usize {
    id.parse::<usize>().expect("fake ledger ids are numeric") - 1
}

#[async_trait]
impl LedgerGateway for FakeLedger {
    async fn get_article(&self, id: &str) -> Result<LedgerArticle, OrbisError> {
        let state = self.state.read().await;
        let article = state
            .articles
            .get(index_of(id))
            .ok_or_else(|| OrbisError::ledger(format!("article {} not found", id)))?;
        Ok(LedgerArticle {
            id: id.to_string(),
            author: article.author.clone(),
            content_address: article.content_address.clone(),
            content_hash: article.content_hash.clone(),
            trust_score: article.trust_score,
            status: article.status,
            submitted_at: article.submitted_at,
            yes_votes: article.yes_votes(),
            no_votes: article.no_votes(),
            version_count: article.versions.len() as u32,
        })
    }

    async fn get_article_version(
        &self,
        id: &str,
        index: u32,
    ) -> Result<LedgerVersion, OrbisError> {
        let state = self.state.read().await;
        let article = state
            .articles
            .get(index_of(id))
            .ok_or_else(|| OrbisError::ledger(format!("article {} not found", id)))?;
        article
            .versions
            .get(index as usize)
            .cloned()
            .ok_or_else(|| OrbisError::ledger(format!("version {} not found", index)))
    }

    async fn get_update_proposal(
        &self,
        id: &str,
        proposal_id: &str,
    ) -> Result<UpdateProposal, OrbisError> {
        let state = self.state.read().await;
        let article = state
            .articles
            .get(index_of(id))
            .ok_or_else(|| OrbisError::ledger(format!("article {} not found", id)))?;
        let proposal = article
            .proposals
            .get(index_of(proposal_id))
            .ok_or_else(|| OrbisError::ledger(format!("proposal {} not found", proposal_id)))?;
        Ok(UpdateProposal {
            proposal_id: proposal_id.to_string(),
            new_content_address: proposal.content_address.clone(),
            new_content_hash: proposal.content_hash.clone(),
            proposer: proposal.proposer.clone(),
            yes_votes: proposal.votes.values().filter(|d| **d).count() as u32,
            no_votes: proposal.votes.values().filter(|d| !**d).count() as u32,
            status: proposal.status,
            created_at: proposal.created_at,
        })
    }

    async fn get_current_proposal_id(&self, id: &str) -> Result<Option<String>, OrbisError> {
        let state = self.state.read().await;
        let article = state
            .articles
            .get(index_of(id))
            .ok_or_else(|| OrbisError::ledger(format!("article {} not found", id)))?;
        if article.proposals.is_empty() {
            Ok(None)
        } else {
            Ok(Some(article.proposals.len().to_string()))
        }
    }

    async fn total_articles(&self) -> Result<u64, OrbisError> {
        Ok(self.state.read().await.articles.len() as u64)
    }

    async fn submit_article(
        &self,
        content_address: &str,
        content_hash: &str,
    ) -> Result<String, OrbisError> {
        Ok(self
            .seed_article("0xengine", content_address, content_hash)
            .await)
    }

    async fn propose_article_update(
        &self,
        id: &str,
        content_address: &str,
        content_hash: &str,
    ) -> Result<String, OrbisError> {
        let mut state = self.state.write().await;
        let index = index_of(id);
        let article = state
            .articles
            .get_mut(index)
            .ok_or_else(|| OrbisError::ledger(format!("article {} not found", id)))?;
        if article.status != ArticleStatus::Published {
            return Err(OrbisError::ledger("Can only update published articles"));
        }
        article.proposals.push(StoredProposal {
            content_address: content_address.to_string(),
            content_hash: content_hash.to_string(),
            proposer: article.author.clone(),
            votes: HashMap::new(),
            status: ProposalStatus::Pending,
            created_at: Utc::now(),
        });
        let proposal_id = article.proposals.len().to_string();
        let proposer = article.author.clone();
        state.events.push(LedgerEvent::ArticleUpdateProposed {
            article_id: id.to_string(),
            proposal_id: proposal_id.clone(),
            proposer,
        });
        Ok(proposal_id)
    }

    async fn set_ai_score(&self, id: &str, score: u8) -> Result<(), OrbisError> {
        self.set_score(id, score).await;
        Ok(())
    }

    async fn set_update_proposal_ai_score(
        &self,
        id: &str,
        proposal_id: &str,
        score: u8,
    ) -> Result<(), OrbisError> {
        let mut state = self.state.write().await;
        let index = index_of(id);
        let proposal_index = index_of(proposal_id);
        let article = state
            .articles
            .get_mut(index)
            .ok_or_else(|| OrbisError::ledger(format!("article {} not found", id)))?;
        if proposal_index >= article.proposals.len() {
            return Err(OrbisError::ledger(format!(
                "proposal {} not found",
                proposal_id
            )));
        }
        if auto_publishes(score) {
            FakeLedger::apply_proposal(article, proposal_index);
        }
        Ok(())
    }

    async fn vote(&self, id: &str, decision: bool, validator: &str) -> Result<(), OrbisError> {
        self.cast_vote(id, decision, validator).await
    }

    async fn vote_on_update_proposal(
        &self,
        id: &str,
        proposal_id: &str,
        decision: bool,
        validator: &str,
    ) -> Result<(), OrbisError> {
        let mut state = self.state.write().await;
        let voter = validator.to_lowercase();
        if state
            .balances
            .get(&voter)
            .copied()
            .unwrap_or_default()
            == TokenAmount::zero()
        {
            return Err(OrbisError::ledger("Must stake first"));
        }

        let index = index_of(id);
        let proposal_index = index_of(proposal_id);
        let article = state
            .articles
            .get_mut(index)
            .ok_or_else(|| OrbisError::ledger(format!("article {} not found", id)))?;
        let proposal = article
            .proposals
            .get_mut(proposal_index)
            .ok_or_else(|| OrbisError::ledger(format!("proposal {} not found", proposal_id)))?;
        if proposal.status != ProposalStatus::Pending {
            return Err(OrbisError::ledger("Proposal already resolved"));
        }
        if proposal.votes.contains_key(&voter) {
            return Err(OrbisError::ledger("Already voted"));
        }
        proposal.votes.insert(voter, decision);

        let yes = proposal.votes.values().filter(|d| **d).count() as u32;
        let no = proposal.votes.values().filter(|d| !**d).count() as u32;
        match evaluate_votes(yes, no) {
            ConsensusVerdict::Undecided => {}
            ConsensusVerdict::Approved => FakeLedger::apply_proposal(article, proposal_index),
            ConsensusVerdict::Rejected => {
                article.proposals[proposal_index].status = ProposalStatus::Rejected;
            }
        }
        Ok(())
    }

    async fn staked_balance(&self, address: &str) -> Result<TokenAmount, OrbisError> {
        Ok(self
            .state
            .read()
            .await
            .balances
            .get(&address.to_lowercase())
            .copied()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Content store fake
// ---------------------------------------------------------------------------

/// In-memory content store that counts fetches, so tests can assert the
/// dedup rule actually skipped the gateway.
#[derive(Default)]
pub struct FakeContentStore {
    documents: RwLock<HashMap<String, ContentDocument>>,
    next_address: AtomicUsize,
    fetches: AtomicUsize,
}

impl FakeContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document under a generated address.
    pub async fn store_document(&self, document: &ContentDocument) -> String {
        let address = format!("addr-{}", self.next_address.fetch_add(1, Ordering::SeqCst) + 1);
        self.store_document_at(&address, document).await;
        address
    }

    /// Store a document under a caller-chosen address.
    pub async fn store_document_at(&self, address: &str, document: &ContentDocument) {
        self.documents
            .write()
            .await
            .insert(address.to_string(), document.clone());
    }

    /// How many fetches have hit this store.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for FakeContentStore {
    async fn fetch(&self, address: &str) -> ContentDocument {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.documents
            .read()
            .await
            .get(address)
            .cloned()
            .unwrap_or_else(ContentDocument::placeholder)
    }

    async fn upload(&self, document: &ContentDocument) -> Result<String, OrbisError> {
        Ok(self.store_document(document).await)
    }
}

// ---------------------------------------------------------------------------
// Cache fakes
// ---------------------------------------------------------------------------

/// A cache whose every operation fails, for exercising read fallbacks and
/// the cache-errors-are-never-fatal policy.
pub struct FailingCache;

#[async_trait]
impl ArticleCache for FailingCache {
    async fn upsert_article(&self, _article: &Article) -> Result<(), OrbisError> {
        Err(OrbisError::Cache("cache store unavailable".into()))
    }

    async fn get_article(&self, _id: &str) -> Result<Option<Article>, OrbisError> {
        Err(OrbisError::Cache("cache store unavailable".into()))
    }

    async fn contains_article(&self, _id: &str) -> Result<bool, OrbisError> {
        Err(OrbisError::Cache("cache store unavailable".into()))
    }

    async fn list_articles(&self) -> Result<Vec<Article>, OrbisError> {
        Err(OrbisError::Cache("cache store unavailable".into()))
    }

    async fn list_articles_by_status(
        &self,
        _status: ArticleStatus,
    ) -> Result<Vec<Article>, OrbisError> {
        Err(OrbisError::Cache("cache store unavailable".into()))
    }

    async fn upsert_analysis(&self, _record: &AnalysisRecord) -> Result<(), OrbisError> {
        Err(OrbisError::Cache("cache store unavailable".into()))
    }

    async fn get_analysis(&self, _article_id: &str) -> Result<Option<AnalysisRecord>, OrbisError> {
        Err(OrbisError::Cache("cache store unavailable".into()))
    }
}

#[async_trait]
impl ValidatorStore for FailingCache {
    async fn get_validator(
        &self,
        _address: &str,
    ) -> Result<Option<orbis_core::ValidatorRecord>, OrbisError> {
        Err(OrbisError::Cache("cache store unavailable".into()))
    }

    async fn put_validator(
        &self,
        _record: &orbis_core::ValidatorRecord,
    ) -> Result<(), OrbisError> {
        Err(OrbisError::Cache("cache store unavailable".into()))
    }

    async fn list_validators(&self) -> Result<Vec<orbis_core::ValidatorRecord>, OrbisError> {
        Err(OrbisError::Cache("cache store unavailable".into()))
    }
}

// ---------------------------------------------------------------------------
// Scorer fakes
// ---------------------------------------------------------------------------

/// Build a single-model analysis outcome for a given trust score.
pub fn outcome_with_score(trust_score: u8) -> AnalysisOutcome {
    let publish = auto_publishes(trust_score);
    AnalysisOutcome {
        trust_score,
        consensus: if publish {
            ConsensusLabel::Real
        } else {
            ConsensusLabel::Fake
        },
        auto_publish: publish,
        total_models: 1,
        models: vec![ModelPrediction {
            name: "TestModel".to_string(),
            label: if publish { "REAL" } else { "FAKE" }.to_string(),
            confidence: trust_score as f64,
        }],
    }
}

/// A scorer that always returns the same result.
pub struct ScriptedScorer {
    result: Result<AnalysisOutcome, ()>,
}

impl ScriptedScorer {
    /// Always succeed with the given trust score.
    pub fn scoring(trust_score: u8) -> Self {
        Self {
            result: Ok(outcome_with_score(trust_score)),
        }
    }

    /// Always fail with `ScoringExhausted`, as if both scorers were down.
    pub fn exhausted() -> Self {
        Self { result: Err(()) }
    }
}

#[async_trait]
impl ArticleScorer for ScriptedScorer {
    async fn score(&self, _content: &str) -> Result<AnalysisOutcome, OrbisError> {
        match &self.result {
            Ok(outcome) => Ok(outcome.clone()),
            Err(()) => Err(OrbisError::ScoringExhausted(
                "primary: down; fallback: down".to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Event source fake
// ---------------------------------------------------------------------------

/// Scripted event source: serves queued batches (or errors), then reports
/// an empty batch forever.
pub struct ScriptedEvents {
    batches: Mutex<Vec<Result<Vec<LedgerEvent>, OrbisError>>>,
}

impl ScriptedEvents {
    pub fn new(batches: Vec<Result<Vec<LedgerEvent>, OrbisError>>) -> Self {
        Self {
            batches: Mutex::new(batches),
        }
    }
}

#[async_trait]
impl EventSource for ScriptedEvents {
    async fn poll(&mut self) -> Result<Vec<LedgerEvent>, OrbisError> {
        let mut batches = self.batches.lock().await;
        if batches.is_empty() {
            Ok(Vec::new())
        } else {
            batches.remove(0)
        }
    }
}
