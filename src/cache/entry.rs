//! Cached generation entries and their payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key::ContentHash;

/// Provenance tag carried by each proposal through review and persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProposalSource {
    AiFull,
    AiEdited,
    Manual,
}

/// A single generated flashcard proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardProposal {
    pub front: String,
    pub back: String,
    pub source: ProposalSource,
}

impl FlashcardProposal {
    pub fn new(front: impl Into<String>, back: impl Into<String>, source: ProposalSource) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            source,
        }
    }

    /// Proposal exactly as generated, before any user edit.
    pub fn ai_full(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self::new(front, back, ProposalSource::AiFull)
    }
}

/// A persisted generation result.
///
/// Entries are immutable once written; retention is enforced at query time,
/// not by deleting rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Row identity assigned by the store on insert.
    pub id: String,
    pub content_hash: ContentHash,
    /// Original text, kept for similarity comparison against future queries.
    pub source_text: String,
    pub payload: Vec<FlashcardProposal>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewCacheEntry {
    pub content_hash: ContentHash,
    pub source_text: String,
    pub payload: Vec<FlashcardProposal>,
}

impl NewCacheEntry {
    pub fn new(
        content_hash: ContentHash,
        source_text: impl Into<String>,
        payload: Vec<FlashcardProposal>,
    ) -> Self {
        Self {
            content_hash,
            source_text: source_text.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposal_source_wire_tags() {
        let json = serde_json::to_string(&ProposalSource::AiFull).unwrap();
        assert_eq!(json, "\"ai-full\"");
        let json = serde_json::to_string(&ProposalSource::AiEdited).unwrap();
        assert_eq!(json, "\"ai-edited\"");
        let json = serde_json::to_string(&ProposalSource::Manual).unwrap();
        assert_eq!(json, "\"manual\"");
    }

    #[test]
    fn test_proposal_deserializes_from_stored_json() {
        let raw = r#"{"front":"What is TCP?","back":"A reliable transport protocol","source":"ai-full"}"#;
        let p: FlashcardProposal = serde_json::from_str(raw).unwrap();
        assert_eq!(p.front, "What is TCP?");
        assert_eq!(p.source, ProposalSource::AiFull);
    }

    #[test]
    fn test_payload_persists_order() {
        let payload = vec![
            FlashcardProposal::ai_full("q1", "a1"),
            FlashcardProposal::ai_full("q2", "a2"),
        ];
        let json = serde_json::to_string(&payload).unwrap();
        let back: Vec<FlashcardProposal> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[0].front, "q1");
        assert_eq!(back[1].front, "q2");
    }
}
