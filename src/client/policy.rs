use crate::Error;
use std::time::Duration;
use tracing::debug;

/// Internal decision for how to proceed after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Retry { delay: Duration },
    Fail,
}

/// Retry policy with exponential backoff.
///
/// Deterministic and explainable: the verdict comes from the error's own
/// classification, the delay from `2^attempt * backoff_base_ms`, overridden
/// by an upstream Retry-After hint when present and capped at
/// `max_backoff_ms`.
pub(crate) struct RetryPolicy {
    /// Total attempt budget, including the first attempt.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub max_backoff_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries: max_retries.max(1),
            backoff_base_ms,
            max_backoff_ms,
        }
    }

    /// Delay before the attempt following `attempt` (1-based index of the
    /// attempt that just failed).
    pub fn backoff_delay(&self, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let base = self.backoff_base_ms.saturating_mul(factor);
        let chosen = retry_after_ms.unwrap_or(base).min(self.max_backoff_ms);
        Duration::from_millis(chosen)
    }

    /// Decide what to do after attempt number `attempt` (1-based) failed.
    pub fn decide(&self, err: &Error, attempt: u32) -> Decision {
        if err.retryable() && attempt < self.max_retries {
            let delay = self.backoff_delay(attempt, err.retry_after_ms());
            debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "scheduling retry"
            );
            Decision::Retry { delay }
        } else {
            Decision::Fail
        }
    }
}
