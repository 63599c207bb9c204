// crates/orbis-ledger/src/client.rs
//
// JSON-RPC client for the ledger node.
//
// Wire envelope:
//   request:  `{"method": "...", "params": {...}}`
//   response: `{"success": bool, "result": ..., "error": "..."}`
//
// A failed response carries the ledger's rejection reason verbatim; it is
// surfaced as `OrbisError::Ledger` so callers can classify it.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orbis_core::{
    ArticleStatus, LedgerArticle, LedgerGateway, LedgerVersion, OrbisError, ProposalStatus,
    TokenAmount, UpdateProposal,
};

/// Connection settings for the ledger node.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Base URL of the ledger RPC endpoint.
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl LedgerConfig {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// JSON-RPC request envelope.
#[derive(Debug, Clone, Serialize)]
struct RpcRequest {
    method: String,
    params: serde_json::Value,
}

/// JSON-RPC response envelope.
#[derive(Debug, Clone, Deserialize)]
struct RpcResponse {
    success: bool,
    result: Option<serde_json::Value>,
    error: Option<String>,
}

/// Typed ledger gateway over HTTP JSON-RPC.
#[derive(Debug, Clone)]
pub struct LedgerClient {
    config: LedgerConfig,
    client: reqwest::Client,
}

impl LedgerClient {
    /// Create a client for the given ledger endpoint.
    pub fn new(config: LedgerConfig) -> Result<Self, OrbisError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OrbisError::ledger(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    /// Issue one call and return the raw result value.
    pub(crate) async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, OrbisError> {
        let request = RpcRequest {
            method: method.to_string(),
            params,
        };

        let resp = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| OrbisError::ledger(format!("{} request failed: {}", method, e)))?;

        let rpc: RpcResponse = resp
            .json()
            .await
            .map_err(|e| OrbisError::ledger(format!("{} response parse failed: {}", method, e)))?;

        if !rpc.success {
            let reason = rpc
                .error
                .unwrap_or_else(|| format!("{} rejected with no reason", method));
            return Err(OrbisError::Ledger { reason });
        }

        rpc.result
            .ok_or_else(|| OrbisError::ledger(format!("{} returned no result", method)))
    }

    /// Issue one call and deserialize the result into `T`.
    async fn call_typed<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, OrbisError> {
        let result = self.call(method, params).await?;
        serde_json::from_value(result)
            .map_err(|e| OrbisError::ledger(format!("{} result decode failed: {}", method, e)))
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// Article record as the ledger reports it: numeric status code, unix
/// timestamp. Converted to the typed core shape before leaving this crate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireArticle {
    id: String,
    author: String,
    content_address: String,
    content_hash: String,
    trust_score: u8,
    timestamp: u64,
    status: u8,
    yes_votes: u32,
    no_votes: u32,
    version_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireVersion {
    content_address: String,
    content_hash: String,
    timestamp: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProposal {
    proposal_id: String,
    new_content_address: String,
    new_content_hash: String,
    proposer: String,
    yes_votes: u32,
    no_votes: u32,
    status: u8,
    created_at: u64,
}

/// Decode a unix-seconds timestamp from the ledger.
fn decode_timestamp(secs: u64) -> Result<DateTime<Utc>, OrbisError> {
    DateTime::<Utc>::from_timestamp(secs as i64, 0)
        .ok_or_else(|| OrbisError::Validation(format!("invalid ledger timestamp {}", secs)))
}

impl WireArticle {
    fn into_ledger_article(self) -> Result<LedgerArticle, OrbisError> {
        Ok(LedgerArticle {
            id: self.id,
            author: self.author,
            content_address: self.content_address,
            content_hash: self.content_hash,
            trust_score: self.trust_score,
            status: ArticleStatus::from_code(self.status)?,
            submitted_at: decode_timestamp(self.timestamp)?,
            yes_votes: self.yes_votes,
            no_votes: self.no_votes,
            version_count: self.version_count,
        })
    }
}

// ---------------------------------------------------------------------------
// Gateway implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl LedgerGateway for LedgerClient {
    async fn get_article(&self, id: &str) -> Result<LedgerArticle, OrbisError> {
        let wire: WireArticle = self
            .call_typed("registry/get_article", serde_json::json!({ "id": id }))
            .await?;
        wire.into_ledger_article()
    }

    async fn get_article_version(
        &self,
        id: &str,
        index: u32,
    ) -> Result<LedgerVersion, OrbisError> {
        let wire: WireVersion = self
            .call_typed(
                "registry/get_article_version",
                serde_json::json!({ "id": id, "index": index }),
            )
            .await?;
        Ok(LedgerVersion {
            content_address: wire.content_address,
            content_hash: wire.content_hash,
            timestamp: decode_timestamp(wire.timestamp)?,
        })
    }

    async fn get_update_proposal(
        &self,
        id: &str,
        proposal_id: &str,
    ) -> Result<UpdateProposal, OrbisError> {
        let wire: WireProposal = self
            .call_typed(
                "registry/get_update_proposal",
                serde_json::json!({ "id": id, "proposalId": proposal_id }),
            )
            .await?;
        Ok(UpdateProposal {
            proposal_id: wire.proposal_id,
            new_content_address: wire.new_content_address,
            new_content_hash: wire.new_content_hash,
            proposer: wire.proposer,
            yes_votes: wire.yes_votes,
            no_votes: wire.no_votes,
            status: ProposalStatus::from_code(wire.status)?,
            created_at: decode_timestamp(wire.created_at)?,
        })
    }

    async fn get_current_proposal_id(&self, id: &str) -> Result<Option<String>, OrbisError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct CurrentProposal {
            proposal_id: String,
        }
        let result: CurrentProposal = self
            .call_typed(
                "registry/get_current_proposal_id",
                serde_json::json!({ "id": id }),
            )
            .await?;
        // Proposal id zero means "no proposals yet".
        if result.proposal_id == "0" {
            Ok(None)
        } else {
            Ok(Some(result.proposal_id))
        }
    }

    async fn total_articles(&self) -> Result<u64, OrbisError> {
        #[derive(Deserialize)]
        struct Total {
            total: u64,
        }
        let result: Total = self
            .call_typed("registry/total_articles", serde_json::json!({}))
            .await?;
        Ok(result.total)
    }

    async fn submit_article(
        &self,
        content_address: &str,
        content_hash: &str,
    ) -> Result<String, OrbisError> {
        #[derive(Deserialize)]
        struct Submitted {
            id: String,
        }
        let result: Submitted = self
            .call_typed(
                "registry/submit_article",
                serde_json::json!({
                    "contentAddress": content_address,
                    "contentHash": content_hash,
                }),
            )
            .await?;
        Ok(result.id)
    }

    async fn propose_article_update(
        &self,
        id: &str,
        content_address: &str,
        content_hash: &str,
    ) -> Result<String, OrbisError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Proposed {
            proposal_id: String,
        }
        let result: Proposed = self
            .call_typed(
                "registry/propose_article_update",
                serde_json::json!({
                    "id": id,
                    "contentAddress": content_address,
                    "contentHash": content_hash,
                }),
            )
            .await?;
        Ok(result.proposal_id)
    }

    async fn set_ai_score(&self, id: &str, score: u8) -> Result<(), OrbisError> {
        self.call(
            "registry/set_ai_score",
            serde_json::json!({ "id": id, "score": score }),
        )
        .await?;
        Ok(())
    }

    async fn set_update_proposal_ai_score(
        &self,
        id: &str,
        proposal_id: &str,
        score: u8,
    ) -> Result<(), OrbisError> {
        self.call(
            "registry/set_update_proposal_ai_score",
            serde_json::json!({ "id": id, "proposalId": proposal_id, "score": score }),
        )
        .await?;
        Ok(())
    }

    async fn vote(&self, id: &str, decision: bool, validator: &str) -> Result<(), OrbisError> {
        self.call(
            "registry/vote",
            serde_json::json!({ "id": id, "decision": decision, "validator": validator }),
        )
        .await?;
        Ok(())
    }

    async fn vote_on_update_proposal(
        &self,
        id: &str,
        proposal_id: &str,
        decision: bool,
        validator: &str,
    ) -> Result<(), OrbisError> {
        self.call(
            "registry/vote_on_update_proposal",
            serde_json::json!({
                "id": id,
                "proposalId": proposal_id,
                "decision": decision,
                "validator": validator,
            }),
        )
        .await?;
        Ok(())
    }

    async fn staked_balance(&self, address: &str) -> Result<TokenAmount, OrbisError> {
        #[derive(Deserialize)]
        struct Balance {
            balance: String,
        }
        let result: Balance = self
            .call_typed(
                "staking/staked_balance",
                serde_json::json!({ "address": address }),
            )
            .await?;
        TokenAmount::parse(&result.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Start a mock ledger node that answers one request with a fixed body.
    async fn mock_ledger(response_body: &str) -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            response_body.len(),
            response_body
        );

        let handle = tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let _ = stream.read(&mut buf).await;
                let _ = stream.write_all(response.as_bytes()).await;
            }
        });

        (base_url, handle)
    }

    fn client_for(base_url: &str) -> LedgerClient {
        LedgerClient::new(LedgerConfig::new(base_url)).unwrap()
    }

    #[tokio::test]
    async fn get_article_decodes_wire_shape() {
        let body = r#"{"success":true,"result":{
            "id":"3","author":"0xAbc","contentAddress":"addr3","contentHash":"0xh",
            "trustScore":90,"timestamp":1700000000,"status":5,
            "yesVotes":0,"noVotes":0,"versionCount":1},"error":null}"#;
        let (base_url, _handle) = mock_ledger(body).await;

        let article = client_for(&base_url).get_article("3").await.unwrap();
        assert_eq!(article.id, "3");
        assert_eq!(article.status, ArticleStatus::Published);
        assert_eq!(article.trust_score, 90);
        assert_eq!(article.submitted_at.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn rejection_surfaces_reason() {
        let body = r#"{"success":false,"result":null,"error":"Already voted"}"#;
        let (base_url, _handle) = mock_ledger(body).await;

        let err = client_for(&base_url)
            .vote("3", true, "0xv1")
            .await
            .unwrap_err();
        match err {
            OrbisError::Ledger { reason } => assert_eq!(reason, "Already voted"),
            other => panic!("expected Ledger error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn current_proposal_id_zero_means_none() {
        let body = r#"{"success":true,"result":{"proposalId":"0"},"error":null}"#;
        let (base_url, _handle) = mock_ledger(body).await;

        let id = client_for(&base_url)
            .get_current_proposal_id("1")
            .await
            .unwrap();
        assert!(id.is_none());
    }

    #[tokio::test]
    async fn staked_balance_parses_decimal_string() {
        let body = r#"{"success":true,"result":{"balance":"500000000000000000000"},"error":null}"#;
        let (base_url, _handle) = mock_ledger(body).await;

        let balance = client_for(&base_url).staked_balance("0xV").await.unwrap();
        assert_eq!(balance, TokenAmount::from_whole(500));
    }

    #[tokio::test]
    async fn connection_error_is_ledger_error() {
        let client = client_for("http://127.0.0.1:1"); // nothing listening
        let err = client.total_articles().await.unwrap_err();
        match err {
            OrbisError::Ledger { reason } => assert!(reason.contains("request failed")),
            other => panic!("expected Ledger error, got: {:?}", other),
        }
    }
}
