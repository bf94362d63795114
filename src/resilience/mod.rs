//! 弹性保障模块：滚动窗口限流，保护上游请求与 token 配额。
//!
//! # Resilience Primitives Module
//!
//! Admission control for the upstream generation API. The limiter accounts
//! requests and estimated tokens in a fixed one-minute window and rejects
//! callers with the wait time remaining, so the orchestrating service can
//! schedule a retry instead of hammering the provider.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`rate_limiter::RateLimiter`] | Fixed-window request/token admission control |
//! | [`rate_limiter::RateLimitConfig`] | Per-minute ceilings |
//! | [`rate_limiter::RateLimitError`] | Rejection with `retry_after_ms` |
//!
//! ## Example
//!
//! ```rust
//! use flashgen::resilience::rate_limiter::{RateLimitConfig, RateLimiter};
//!
//! let config = RateLimitConfig::new()
//!     .with_max_requests_per_minute(30)
//!     .with_max_tokens_per_minute(90_000);
//! let limiter = RateLimiter::new(config);
//! ```

pub mod rate_limiter;
