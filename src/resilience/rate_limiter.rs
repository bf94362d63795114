use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Accounting window length.
const WINDOW: Duration = Duration::from_secs(60);

/// Which ceiling rejected the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitKind {
    Requests,
    Tokens,
}

impl RateLimitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requests => "requests",
            Self::Tokens => "tokens",
        }
    }
}

impl std::fmt::Display for RateLimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Local admission-control rejection.
///
/// Never retried inside the client; `retry_after_ms` tells the caller when
/// the current window ends.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} rate limit exceeded, retry after {retry_after_ms} ms")]
pub struct RateLimitError {
    pub kind: RateLimitKind,
    pub retry_after_ms: u64,
}

fn default_max_requests_per_minute() -> u32 {
    30
}

fn default_max_tokens_per_minute() -> u32 {
    90_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: u32,
    #[serde(default = "default_max_tokens_per_minute")]
    pub max_tokens_per_minute: u32,
}

impl RateLimitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_requests_per_minute(mut self, max: u32) -> Self {
        self.max_requests_per_minute = max;
        self
    }

    pub fn with_max_tokens_per_minute(mut self, max: u32) -> Self {
        self.max_tokens_per_minute = max;
        self
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_minute: default_max_requests_per_minute(),
            max_tokens_per_minute: default_max_tokens_per_minute(),
        }
    }
}

#[derive(Debug)]
struct WindowState {
    request_count: u64,
    token_count: u64,
    window_start: Instant,
}

/// Point-in-time view of the current window.
#[derive(Debug, Clone)]
pub struct RateLimiterSnapshot {
    pub request_count: u64,
    pub token_count: u64,
    pub max_requests_per_minute: u32,
    pub max_tokens_per_minute: u32,
    pub window_remaining_ms: u64,
}

/// Fixed-window request/token rate limiter.
///
/// Counters accumulate since `window_start` and reset when a check finds the
/// window expired. Commits are unchecked increments, so a window may
/// overshoot a ceiling by one dispatch; the next check rejects.
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<WindowState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let state = Mutex::new(WindowState {
            request_count: 0,
            token_count: 0,
            window_start: Instant::now(),
        });
        Self { config, state }
    }

    /// Resets expired windows, returning time elapsed inside the current one.
    fn roll_window(st: &mut WindowState) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(st.window_start);
        if elapsed >= WINDOW {
            st.request_count = 0;
            st.token_count = 0;
            st.window_start = now;
            return Duration::ZERO;
        }
        elapsed
    }

    fn check_locked(&self, st: &WindowState, elapsed: Duration) -> Result<(), RateLimitError> {
        let retry_after_ms = (WINDOW - elapsed).as_millis() as u64;
        if st.request_count >= u64::from(self.config.max_requests_per_minute) {
            return Err(RateLimitError {
                kind: RateLimitKind::Requests,
                retry_after_ms,
            });
        }
        if st.token_count >= u64::from(self.config.max_tokens_per_minute) {
            return Err(RateLimitError {
                kind: RateLimitKind::Tokens,
                retry_after_ms,
            });
        }
        Ok(())
    }

    /// Admission check only. Rolls an expired window; does not consume
    /// budget beyond that.
    pub async fn check_and_reserve(&self, estimated_tokens: u32) -> Result<(), RateLimitError> {
        let mut st = self.state.lock().await;
        let elapsed = Self::roll_window(&mut st);
        self.check_locked(&st, elapsed).map_err(|e| {
            debug!(
                kind = %e.kind,
                estimated_tokens,
                retry_after_ms = e.retry_after_ms,
                "rate limiter rejected admission"
            );
            e
        })
    }

    /// Record a dispatched attempt: one request plus its token cost. Failed
    /// attempts count the same as successful ones.
    pub async fn commit(&self, tokens: u32) {
        let mut st = self.state.lock().await;
        st.request_count += 1;
        st.token_count += u64::from(tokens);
    }

    /// Check and commit under a single lock acquisition, so two concurrent
    /// callers can never both pass when one slot remains.
    pub async fn admit(&self, estimated_tokens: u32) -> Result<(), RateLimitError> {
        let mut st = self.state.lock().await;
        let elapsed = Self::roll_window(&mut st);
        self.check_locked(&st, elapsed).map_err(|e| {
            debug!(
                kind = %e.kind,
                estimated_tokens,
                retry_after_ms = e.retry_after_ms,
                "rate limiter rejected admission"
            );
            e
        })?;
        st.request_count += 1;
        st.token_count += u64::from(estimated_tokens);
        Ok(())
    }

    pub async fn snapshot(&self) -> RateLimiterSnapshot {
        let mut st = self.state.lock().await;
        let elapsed = Self::roll_window(&mut st);
        RateLimiterSnapshot {
            request_count: st.request_count,
            token_count: st.token_count,
            max_requests_per_minute: self.config.max_requests_per_minute,
            max_tokens_per_minute: self.config.max_tokens_per_minute,
            window_remaining_ms: (WINDOW - elapsed).as_millis() as u64,
        }
    }
}
