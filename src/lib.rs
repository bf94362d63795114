//! # flashgen
//!
//! 这是 AI 闪卡生成的缓存与弹性调用核心库，通过内容相似度复用历史生成结果，
//! 并以限流、超时与重试保护上游模型调用。
//!
//! Generation caching core for AI flashcard proposals - a content-similarity
//! cache, a request/token rate limiter, and a resilient client for the
//! upstream model call.
//!
//! ## Overview
//!
//! Flashcard generation is expensive and repetitive: users re-submit the
//! same or lightly edited source text all the time. This library answers
//! those requests from a cache keyed by content hash and, failing that, by
//! normalized edit-distance similarity, so the upstream model is only
//! consulted for genuinely new material. Calls that do go upstream pass
//! through a fixed-window rate limiter and a retry loop with per-attempt
//! deadlines and exponential backoff.
//!
//! ## Key Features
//!
//! - **Similarity Cache**: [`GenerationCache`] reuses prior results for
//!   identical or near-identical source text
//! - **Pluggable Storage**: the [`cache::CacheStore`] seam with an
//!   in-memory reference implementation, [`MemoryStore`]
//! - **Rate Limiting**: request and token ceilings per fixed one-minute
//!   window via the [`resilience`] module
//! - **Resilient Calls**: [`GenerationClient`] wraps dispatch in admission
//!   control, timeouts, `Retry-After`-aware backoff, and cancellation
//! - **Classified Failures**: upstream errors normalized into
//!   [`UpstreamErrorCode`] with explicit retryability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flashgen::cache::MemoryStore;
//! use flashgen::{GenerationCache, GenerationClient, GenerationConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> flashgen::Result<()> {
//!     let config = GenerationConfig::from_env().with_api_key("your-api-key");
//!     let cache = GenerationCache::new(Arc::new(MemoryStore::new()), config.cache_config());
//!     let client = GenerationClient::new(config)?;
//!
//!     let source = "Photosynthesis converts light energy into chemical energy.";
//!     match cache.lookup(source).await? {
//!         Some(hit) => println!("cached proposals: {:?}", hit.payload),
//!         None => {
//!             let request = client.proposal_request(source);
//!             let content = client.complete(&request).await?;
//!             println!("model proposals: {content}");
//!             // Parse `content` into proposals, then cache.store(source, proposals).
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Content-similarity cache over a pluggable store |
//! | [`client`] | Resilient upstream client: retry, timeout, cancellation |
//! | [`config`] | Configuration surface, YAML loading, env overrides |
//! | [`error_code`] | Upstream failure classification |
//! | [`resilience`] | Fixed-window request/token rate limiting |
//! | [`similarity`] | Normalized edit-distance scoring |
//! | [`tokens`] | Token cost estimation for admission control |
//! | [`transport`] | HTTP dispatch seam and API-key resolution |

pub mod cache;
pub mod client;
pub mod config;
pub mod error_code;
pub mod resilience;
pub mod similarity;
pub mod tokens;
pub mod transport;

// Re-export main types for convenience
pub use cache::{
    CacheConfig, CacheEntry, CacheHit, CacheStats, CacheStore, ContentHash, FlashcardProposal,
    GenerationCache, MemoryStore, ProposalSource,
};
pub use client::{
    CallStats, CancelHandle, ChatCompletion, ChatMessage, ChatRequest, GenerationClient,
    MessageRole, RawResponse,
};
pub use config::GenerationConfig;
pub use error_code::UpstreamErrorCode;
pub use resilience::rate_limiter::{
    RateLimitConfig, RateLimitError, RateLimitKind, RateLimiter, RateLimiterSnapshot,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::Error;
