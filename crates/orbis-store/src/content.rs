// crates/orbis-store/src/content.rs
//
// Content gateway client for content-addressed document storage.
// Uses reqwest to talk to the gateway's HTTP API.

use std::time::Duration;

use async_trait::async_trait;

use orbis_core::{ContentDocument, ContentStore, OrbisError};

/// Connection settings for the content gateway.
#[derive(Debug, Clone)]
pub struct ContentConfig {
    /// Base URL of the gateway (e.g. "http://127.0.0.1:8080").
    pub gateway_url: String,
    /// Per-request timeout. Content fetches must never stall the event
    /// loop, so this is kept short.
    pub timeout: Duration,
}

impl ContentConfig {
    pub fn new(gateway_url: &str) -> Self {
        Self {
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP client for the content gateway.
///
/// Fetches degrade to a placeholder document on any failure; uploads
/// propagate errors since a submission cannot proceed without an address.
#[derive(Debug, Clone)]
pub struct ContentClient {
    config: ContentConfig,
    client: reqwest::Client,
}

impl ContentClient {
    pub fn new(config: ContentConfig) -> Result<Self, OrbisError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OrbisError::ContentFetch(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    /// Fetch a document, propagating failures. `ContentStore::fetch` wraps
    /// this with the placeholder fallback.
    async fn try_fetch(&self, address: &str) -> Result<ContentDocument, OrbisError> {
        let url = format!("{}/content/{}", self.config.gateway_url, address);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OrbisError::ContentFetch(format!("fetch {} failed: {}", address, e)))?;

        if !response.status().is_success() {
            return Err(OrbisError::ContentFetch(format!(
                "fetch {} failed with status {}",
                address,
                response.status()
            )));
        }

        // The gateway can serve an HTML error page with status 200; treat
        // anything that does not decode as a document as a fetch failure.
        response.json::<ContentDocument>().await.map_err(|e| {
            OrbisError::ContentFetch(format!("fetch {} returned non-document body: {}", address, e))
        })
    }
}

#[async_trait]
impl ContentStore for ContentClient {
    async fn fetch(&self, address: &str) -> ContentDocument {
        match self.try_fetch(address).await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("content fetch for {} degraded to placeholder: {}", address, e);
                ContentDocument::placeholder()
            }
        }
    }

    async fn upload(&self, document: &ContentDocument) -> Result<String, OrbisError> {
        #[derive(serde::Deserialize)]
        struct UploadResult {
            address: String,
        }

        let url = format!("{}/content", self.config.gateway_url);
        let response = self
            .client
            .post(&url)
            .json(document)
            .send()
            .await
            .map_err(|e| OrbisError::ContentFetch(format!("upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OrbisError::ContentFetch(format!(
                "upload failed ({}): {}",
                status, body
            )));
        }

        let result: UploadResult = response
            .json()
            .await
            .map_err(|e| OrbisError::ContentFetch(format!("upload response parse failed: {}", e)))?;

        Ok(result.address)
    }
}
