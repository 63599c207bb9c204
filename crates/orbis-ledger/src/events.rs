// crates/orbis-ledger/src/events.rs
//
// Typed ledger events, consumed through a cursor-based poll.
//
// Events are wake-up signals, not data: handlers use them only to learn
// which ids changed, then re-read authoritative state through the gateway.
// The feed tolerates duplicated and out-of-order delivery for exactly that
// reason.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use orbis_core::{OrbisError, TokenAmount};

use crate::client::LedgerClient;

/// An event emitted by the ledger contract set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    /// A new article was registered.
    #[serde(rename_all = "camelCase")]
    ArticleSubmitted {
        article_id: String,
        author: String,
        content_address: String,
    },
    /// An article reached a terminal status.
    #[serde(rename_all = "camelCase")]
    ArticleFinalized { article_id: String, status: u8 },
    /// An automated trust score was recorded.
    #[serde(rename_all = "camelCase")]
    AiScored {
        article_id: String,
        trust_score: u8,
        status: u8,
    },
    /// A validator voted on an article.
    #[serde(rename_all = "camelCase")]
    Voted {
        article_id: String,
        validator: String,
        decision: bool,
    },
    /// A validator staked tokens.
    #[serde(rename_all = "camelCase")]
    Staked { validator: String, amount: TokenAmount },
    /// A validator withdrew stake.
    #[serde(rename_all = "camelCase")]
    Unstaked { validator: String, amount: TokenAmount },
    /// A validator was rewarded for a correct vote.
    #[serde(rename_all = "camelCase")]
    Rewarded { validator: String, amount: TokenAmount },
    /// A validator was slashed for a wrong vote.
    #[serde(rename_all = "camelCase")]
    Slashed { validator: String, amount: TokenAmount },
    /// An update proposal was opened for an article.
    #[serde(rename_all = "camelCase")]
    ArticleUpdateProposed {
        article_id: String,
        proposal_id: String,
        proposer: String,
    },
}

/// A source of ledger events.
///
/// Implemented by `EventFeed` (live polling) and by scripted fakes in
/// tests. A poll may return duplicates or previously seen events after a
/// reconnect; consumers must tolerate both.
#[async_trait]
pub trait EventSource: Send {
    /// The next batch of events. Empty when caught up.
    async fn poll(&mut self) -> Result<Vec<LedgerEvent>, OrbisError>;
}

/// Cursor-based event feed over the ledger's `events/poll` method.
///
/// The cursor advances only after a successful poll, so a failed or
/// interrupted poll re-delivers; duplicates are expected and harmless
/// downstream.
pub struct EventFeed {
    client: LedgerClient,
    cursor: u64,
    batch_limit: u32,
}

impl EventFeed {
    /// Create a feed starting at the given cursor (0 = from the beginning).
    pub fn new(client: LedgerClient, cursor: u64) -> Self {
        Self {
            client,
            cursor,
            batch_limit: 100,
        }
    }

    /// The next cursor position.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Poll for the next batch of events. Empty when caught up.
    async fn poll_next(&mut self) -> Result<Vec<LedgerEvent>, OrbisError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct PollResult {
            events: Vec<LedgerEvent>,
            next_cursor: u64,
        }

        let result = self
            .client
            .call(
                "events/poll",
                serde_json::json!({ "cursor": self.cursor, "limit": self.batch_limit }),
            )
            .await?;

        let poll: PollResult = serde_json::from_value(result)
            .map_err(|e| OrbisError::ledger(format!("events/poll decode failed: {}", e)))?;

        if !poll.events.is_empty() {
            tracing::trace!(
                "polled {} events, cursor {} -> {}",
                poll.events.len(),
                self.cursor,
                poll.next_cursor
            );
        }
        self.cursor = poll.next_cursor;
        Ok(poll.events)
    }
}

#[async_trait]
impl EventSource for EventFeed {
    async fn poll(&mut self) -> Result<Vec<LedgerEvent>, OrbisError> {
        self.poll_next().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_decode_from_tagged_json() {
        let json = r#"[
            {"type":"ArticleSubmitted","articleId":"1","author":"0xa","contentAddress":"addr1"},
            {"type":"AiScored","articleId":"1","trustScore":90,"status":5},
            {"type":"Voted","articleId":"2","validator":"0xV","decision":true},
            {"type":"Rewarded","validator":"0xv","amount":"100"},
            {"type":"ArticleUpdateProposed","articleId":"2","proposalId":"1","proposer":"0xa"}
        ]"#;
        let events: Vec<LedgerEvent> = serde_json::from_str(json).unwrap();
        assert_eq!(events.len(), 5);
        assert_eq!(
            events[1],
            LedgerEvent::AiScored {
                article_id: "1".to_string(),
                trust_score: 90,
                status: 5,
            }
        );
        match &events[3] {
            LedgerEvent::Rewarded { validator, amount } => {
                assert_eq!(validator, "0xv");
                assert_eq!(*amount, TokenAmount(100));
            }
            other => panic!("expected Rewarded, got {:?}", other),
        }
    }

    #[test]
    fn events_round_trip_through_serde() {
        let event = LedgerEvent::Staked {
            validator: "0xv".to_string(),
            amount: TokenAmount::from_whole(100),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: LedgerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
