use thiserror::Error;

use crate::cache::StoreError;
use crate::error_code::UpstreamErrorCode;
use crate::resilience::rate_limiter::RateLimitError;
use crate::transport::TransportError;

/// Unified error type for the generation core.
///
/// Every variant is typed so the orchestrating service can branch on kind;
/// in particular rate-limit rejections carry the wait time and upstream
/// failures carry their classification.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cache store error: {0}")]
    Store(#[from] StoreError),

    #[error("rate limit: {0}")]
    RateLimit(#[from] RateLimitError),

    #[error("upstream error: HTTP {status} ({code}): {message}")]
    Upstream {
        status: u16,
        code: UpstreamErrorCode,
        /// Raw `error.type` from the provider envelope, when present.
        error_type: Option<String>,
        message: String,
        retryable: bool,
        retry_after_ms: Option<u64>,
    },

    #[error("attempt timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },

    #[error("response parse error: {detail}")]
    Parse { detail: String },

    #[error("network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted { attempts: u32, source: Box<Error> },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    pub fn parse(detail: impl Into<String>) -> Self {
        Error::Parse {
            detail: detail.into(),
        }
    }

    /// Whether the retry loop may attempt again on this failure.
    ///
    /// Rate-limit rejections are deliberately final here: they surface to
    /// the caller with `retry_after_ms` instead of consuming retry budget.
    pub fn retryable(&self) -> bool {
        match self {
            Error::Upstream { retryable, .. } => *retryable,
            Error::Timeout { .. } => true,
            Error::Transport(_) => true,
            _ => false,
        }
    }

    /// Suggested wait before trying again, when the failure carries one.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Error::RateLimit(e) => Some(e.retry_after_ms),
            Error::Upstream { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }
}
