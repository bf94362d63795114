//! Token estimation for rate-limit accounting.

use crate::client::wire::ChatMessage;

/// Estimates token cost of text before a request is dispatched.
///
/// Estimates feed the rate limiter's token ceiling; they do not need to match
/// the provider's tokenizer, only to be stable and conservative.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;

    fn count_messages(&self, messages: &[ChatMessage]) -> usize {
        messages.iter().map(|m| self.count(&m.content)).sum()
    }
}

/// Character-ratio estimator (roughly four characters per token for
/// English-like prose).
#[derive(Debug, Clone)]
pub struct CharacterEstimator {
    chars_per_token: f64,
}

impl CharacterEstimator {
    pub fn new() -> Self {
        Self::with_ratio(4.0)
    }

    pub fn with_ratio(ratio: f64) -> Self {
        Self {
            chars_per_token: ratio,
        }
    }
}

impl Default for CharacterEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounter for CharacterEstimator {
    fn count(&self, text: &str) -> usize {
        (text.len() as f64 / self.chars_per_token).ceil() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::wire::ChatMessage;

    #[test]
    fn test_character_estimator_rounds_up() {
        let est = CharacterEstimator::new();
        assert_eq!(est.count(""), 0);
        assert_eq!(est.count("abc"), 1);
        assert_eq!(est.count("abcd"), 1);
        assert_eq!(est.count("abcde"), 2);
        assert_eq!(est.count(&"x".repeat(400)), 100);
    }

    #[test]
    fn test_custom_ratio() {
        let est = CharacterEstimator::with_ratio(2.0);
        assert_eq!(est.count("abcd"), 2);
    }

    #[test]
    fn test_count_messages_sums_parts() {
        let est = CharacterEstimator::new();
        let messages = vec![
            ChatMessage::system(&"s".repeat(40)),
            ChatMessage::user(&"u".repeat(80)),
        ];
        assert_eq!(est.count_messages(&messages), 10 + 20);
    }
}
