//! 弹性调用循环:限流准入、超时控制、指数退避重试。
//!
//! Resilient call loop (single client, single upstream).

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use super::policy::{Decision, RetryPolicy};
use super::wire::{ChatCompletion, ChatRequest, ErrorEnvelope};
use crate::config::GenerationConfig;
use crate::error_code::UpstreamErrorCode;
use crate::resilience::rate_limiter::RateLimiter;
use crate::tokens::{CharacterEstimator, TokenCounter};
use crate::transport::{HttpTransport, Transport, TransportResponse};
use crate::{Error, Result};

/// Abort controller shared between a caller and an in-flight call.
///
/// Cancellation and deadline expiry are one signal from the retry loop's
/// point of view: both surface as [`Error::Timeout`], retryable while budget
/// remains. A handle that was cancelled stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    /// Abort the in-flight attempt and any remaining retries.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the handle is cancelled; pends forever otherwise.
    pub(crate) async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // All senders gone without a cancel; nothing left to signal.
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw success body, before schema validation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Per-call outcome facts for observability.
#[derive(Debug, Clone)]
pub struct CallStats {
    pub model: String,
    pub http_status: u16,
    /// Attempts dispatched, including the successful one.
    pub attempts: u32,
    pub duration_ms: u128,
    pub client_request_id: String,
    /// Token cost charged against the rate limiter per attempt.
    pub estimated_tokens: u32,
}

/// Client for the upstream generation API.
///
/// Wraps each call in admission control, a per-attempt deadline, and retry
/// with exponential backoff. Rate-limit rejections are never retried here;
/// they carry the wait time back to the caller instead.
pub struct GenerationClient {
    config: GenerationConfig,
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
    estimator: Box<dyn TokenCounter>,
    timeout: Duration,
}

impl GenerationClient {
    /// Build a client with an HTTP transport from the configuration.
    pub fn new(config: GenerationConfig) -> Result<Self> {
        config.validate()?;
        let api_key = config.resolve_api_key().ok_or_else(|| {
            Error::config("api_key is required (set it in the config, keyring, or environment)")
        })?;
        let transport = HttpTransport::new(&config.base_url, &api_key, config.timeout_ms)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build over an injected transport. Tests use this to script upstream
    /// behavior without a network.
    pub fn with_transport(config: GenerationConfig, transport: Arc<dyn Transport>) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate_limiting.clone()));
        Self::with_parts(config, transport, limiter)
    }

    /// Build over an injected transport and a shared rate limiter.
    ///
    /// One limiter per upstream API key: clients configured for the same key
    /// should share the instance so their dispatches draw from one budget.
    pub fn with_parts(
        config: GenerationConfig,
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        let policy = RetryPolicy::new(config.retries, config.backoff_base_ms, config.max_backoff_ms);
        let timeout = Duration::from_millis(config.timeout_ms);
        Self {
            config,
            transport,
            limiter,
            policy,
            estimator: Box::new(CharacterEstimator::new()),
            timeout,
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Proposal-generation request for this client's configured model.
    pub fn proposal_request(&self, source_text: &str) -> ChatRequest {
        ChatRequest::proposal_prompt(&self.config.model, source_text)
    }

    /// Dispatch a request, returning the raw success body.
    pub async fn call(&self, request: &ChatRequest) -> Result<RawResponse> {
        Ok(self.call_cancellable(request, &CancelHandle::new()).await?.0)
    }

    /// Dispatch a request, returning the raw success body and call stats.
    pub async fn call_with_stats(&self, request: &ChatRequest) -> Result<(RawResponse, CallStats)> {
        self.call_cancellable(request, &CancelHandle::new()).await
    }

    /// Dispatch a request under an external abort controller.
    pub async fn call_cancellable(
        &self,
        request: &ChatRequest,
        cancel: &CancelHandle,
    ) -> Result<(RawResponse, CallStats)> {
        let estimated_tokens =
            u32::try_from(self.estimator.count_messages(&request.messages)).unwrap_or(u32::MAX);
        let client_request_id = Uuid::new_v4().to_string();
        let start = Instant::now();
        let mut attempt: u32 = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Timeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                });
            }

            // Admission gate. Check-and-commit happens under one lock, so
            // every dispatched attempt consumes budget; a rejection
            // propagates without consuming a retry slot.
            self.limiter.admit(estimated_tokens).await?;

            match self.attempt_once(request, &client_request_id, cancel).await {
                Ok(raw) => {
                    let stats = CallStats {
                        model: request.model.clone(),
                        http_status: raw.status,
                        attempts: attempt,
                        duration_ms: start.elapsed().as_millis(),
                        client_request_id,
                        estimated_tokens,
                    };
                    info!(
                        model = stats.model.as_str(),
                        http_status = stats.http_status,
                        attempts = stats.attempts,
                        duration_ms = stats.duration_ms as u64,
                        client_request_id = stats.client_request_id.as_str(),
                        "generation request succeeded"
                    );
                    return Ok((raw, stats));
                }
                Err(err) => match self.policy.decide(&err, attempt) {
                    Decision::Retry { delay } => {
                        warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            client_request_id = client_request_id.as_str(),
                            error = %err,
                            "generation attempt failed, backing off"
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = cancel.cancelled() => {
                                return Err(Error::Timeout {
                                    elapsed_ms: start.elapsed().as_millis() as u64,
                                });
                            }
                        }
                        attempt += 1;
                    }
                    Decision::Fail => {
                        warn!(
                            attempts = attempt,
                            client_request_id = client_request_id.as_str(),
                            error = %err,
                            "generation request failed"
                        );
                        return Err(if err.retryable() {
                            Error::RetriesExhausted {
                                attempts: attempt,
                                source: Box::new(err),
                            }
                        } else {
                            err
                        });
                    }
                },
            }
        }
    }

    /// One dispatch under the attempt deadline and the abort controller.
    async fn attempt_once(
        &self,
        request: &ChatRequest,
        client_request_id: &str,
        cancel: &CancelHandle,
    ) -> Result<RawResponse> {
        let attempt_start = Instant::now();
        let dispatch = self.transport.dispatch(request, client_request_id);

        let response = tokio::select! {
            res = tokio::time::timeout(self.timeout, dispatch) => match res {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(Error::Transport(e)),
                Err(_) => {
                    return Err(Error::Timeout {
                        elapsed_ms: attempt_start.elapsed().as_millis() as u64,
                    })
                }
            },
            _ = cancel.cancelled() => {
                return Err(Error::Timeout {
                    elapsed_ms: attempt_start.elapsed().as_millis() as u64,
                });
            }
        };

        if (200..300).contains(&response.status) {
            return Ok(RawResponse {
                status: response.status,
                body: response.body,
            });
        }
        Err(Self::classify_status_failure(&response))
    }

    /// Fold a non-2xx response into a classified upstream error.
    fn classify_status_failure(response: &TransportResponse) -> Error {
        let envelope = serde_json::from_str::<ErrorEnvelope>(&response.body)
            .ok()
            .map(|e| e.error);
        let error_type = envelope.as_ref().and_then(|e| e.error_type.clone());
        let message = envelope
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| format!("upstream returned HTTP {}", response.status));

        // Envelope code first, then the envelope type, then the HTTP status.
        let code = envelope
            .as_ref()
            .and_then(|e| e.code.as_deref())
            .and_then(UpstreamErrorCode::from_provider_code)
            .or_else(|| {
                error_type
                    .as_deref()
                    .and_then(UpstreamErrorCode::from_provider_code)
            })
            .unwrap_or_else(|| UpstreamErrorCode::from_http_status(response.status));

        Error::Upstream {
            status: response.status,
            code,
            error_type,
            message,
            retryable: code.retryable(),
            retry_after_ms: response.retry_after_ms,
        }
    }

    /// Validate a raw success body against the expected completion schema.
    ///
    /// The HTTP call already succeeded, so a mismatch here is a contract
    /// violation by the upstream and is never retried.
    pub fn parse_response(&self, raw: &RawResponse) -> Result<ChatCompletion> {
        serde_json::from_str(&raw.body)
            .map_err(|e| Error::parse(format!("completion schema mismatch: {e}")))
    }

    /// Dispatch and parse in one step, returning the first choice's content.
    pub async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let raw = self.call(request).await?;
        let completion = self.parse_response(&raw)?;
        completion
            .first_content()
            .map(str::to_owned)
            .ok_or_else(|| Error::parse("completion contained no choices"))
    }
}
