//! HTTP transport for the upstream generation API.

use async_trait::async_trait;
use keyring::Entry;
use std::env;
use std::time::Duration;

use crate::client::wire::ChatRequest;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transport error: {0}")]
    Other(String),
}

/// Raw upstream response, before status classification and body parsing.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    /// `Retry-After` header in milliseconds. Only the seconds form of the
    /// header is recognized.
    pub retry_after_ms: Option<u64>,
    pub body: String,
}

/// Dispatch seam between retry policy and the network.
///
/// The client's timeout, cancellation, and retry logic wrap this call, so
/// implementations stay a single round trip.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(
        &self,
        request: &ChatRequest,
        client_request_id: &str,
    ) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport with bearer auth.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, api_key: &str, timeout_ms: u64) -> Result<Self, TransportError> {
        // The socket-level timeout backs up the per-attempt deadline the
        // client enforces.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn dispatch(
        &self,
        request: &ChatRequest,
        client_request_id: &str,
    ) -> Result<TransportResponse, TransportError> {
        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            // Correlation id; providers may ignore it, but logs can use it
            // for linkage.
            .header("x-request-id", client_request_id)
            .json(request)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let retry_after_ms = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(|secs| secs.saturating_mul(1000));
        let body = resp.text().await?;

        Ok(TransportResponse {
            status,
            retry_after_ms,
            body,
        })
    }
}

/// Resolve an API key for a provider: keyring first, then the
/// `{PROVIDER}_API_KEY` environment variable.
pub fn resolve_api_key(provider_id: &str) -> Option<String> {
    if let Ok(entry) = Entry::new("flashgen", provider_id) {
        if let Ok(key) = entry.get_password() {
            return Some(key);
        }
    }
    let env_var = format!("{}_API_KEY", provider_id.to_uppercase().replace('-', "_"));
    env::var(env_var).ok()
}
