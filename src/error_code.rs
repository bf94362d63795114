//! 上游错误码分类：统一各 provider 的错误码与重试语义。
//!
//! Upstream error classification.
//!
//! Providers surface failures through an error envelope code and an HTTP
//! status; this module folds both into one canonical code with a retry
//! verdict, so the retry loop never string-matches provider messages.
//!
//! ## Categories
//!
//! | Category | Codes                                          | Retry |
//! |----------|------------------------------------------------|-------|
//! | client   | invalid_request, authentication, permission_denied, not_found, request_too_large | no |
//! | rate     | rate_limited, quota_exhausted                  | rate_limited only |
//! | server   | server_error, overloaded, timeout              | yes |
//! | unknown  | unknown                                        | yes |
//!
//! ## Example
//!
//! ```rust
//! use flashgen::error_code::UpstreamErrorCode;
//!
//! let code = UpstreamErrorCode::from_provider_code("invalid_api_key")
//!     .unwrap_or(UpstreamErrorCode::Unknown);
//! assert_eq!(code, UpstreamErrorCode::Authentication);
//! assert!(!code.retryable());
//! ```

use std::fmt;

/// Canonical upstream failure code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamErrorCode {
    /// Malformed request, invalid parameters, or missing required fields
    InvalidRequest,
    /// Invalid, expired, or missing API key
    Authentication,
    /// Valid credentials but insufficient permissions
    PermissionDenied,
    /// Requested model or endpoint does not exist
    NotFound,
    /// Input exceeds context window or payload size limit
    RequestTooLarge,
    /// Request rate limit exceeded on the provider side
    RateLimited,
    /// Account usage quota or billing limit reached
    QuotaExhausted,
    /// Internal server error on provider side
    ServerError,
    /// Provider service temporarily overloaded
    Overloaded,
    /// Provider-side timeout before a response was produced
    Timeout,
    /// Error could not be classified
    Unknown,
}

impl UpstreamErrorCode {
    /// Returns the canonical name (e.g., `"invalid_request"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::Authentication => "authentication",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::RequestTooLarge => "request_too_large",
            Self::RateLimited => "rate_limited",
            Self::QuotaExhausted => "quota_exhausted",
            Self::ServerError => "server_error",
            Self::Overloaded => "overloaded",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }

    /// Returns whether another attempt may succeed.
    ///
    /// Unclassified failures default to retryable; only codes that describe
    /// a defect in the request or the account are final.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited
                | Self::ServerError
                | Self::Overloaded
                | Self::Timeout
                | Self::Unknown
        )
    }

    /// Returns the category: `"client"`, `"rate"`, `"server"`, or `"unknown"`.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidRequest
            | Self::Authentication
            | Self::PermissionDenied
            | Self::NotFound
            | Self::RequestTooLarge => "client",
            Self::RateLimited | Self::QuotaExhausted => "rate",
            Self::ServerError | Self::Overloaded | Self::Timeout => "server",
            Self::Unknown => "unknown",
        }
    }

    /// Maps a provider error code/type string to the canonical code.
    ///
    /// Accepts both canonical names and common provider aliases such as
    /// `"invalid_api_key"`, `"auth_error"`, `"context_length_exceeded"`.
    pub fn from_provider_code(provider_code: &str) -> Option<Self> {
        let code = match provider_code {
            "invalid_request" | "invalid_request_error" | "validation_error" => {
                Self::InvalidRequest
            }
            "authentication" | "authentication_error" | "auth_error" | "invalid_api_key" => {
                Self::Authentication
            }
            "permission_denied" | "permission_error" => Self::PermissionDenied,
            "not_found" | "model_not_found" => Self::NotFound,
            "request_too_large" | "context_length_exceeded" => Self::RequestTooLarge,
            "rate_limited" | "rate_limit_exceeded" | "rate_limit_error" => Self::RateLimited,
            "quota_exhausted" | "insufficient_quota" => Self::QuotaExhausted,
            "server_error" | "internal_error" => Self::ServerError,
            "overloaded" | "overloaded_error" => Self::Overloaded,
            "timeout" => Self::Timeout,
            _ => return None,
        };
        Some(code)
    }

    /// Maps an HTTP status code to the most likely canonical code.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidRequest,
            401 => Self::Authentication,
            402 => Self::QuotaExhausted, // OpenRouter: out of credits
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            408 => Self::Timeout,
            413 => Self::RequestTooLarge,
            429 => Self::RateLimited,
            500 | 502 => Self::ServerError,
            503 => Self::Overloaded,
            504 => Self::Timeout,
            529 => Self::Overloaded, // Anthropic overloaded; non-standard but commonly used
            s if (500..=599).contains(&s) => Self::ServerError,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for UpstreamErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
