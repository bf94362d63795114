//! Generation cache orchestration.

use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::entry::{CacheEntry, FlashcardProposal, NewCacheEntry};
use super::key::ContentHash;
use super::store::CacheStore;
use crate::similarity::similarity;
use crate::{Error, Result};
use uuid::Uuid;

/// Cache behavior knobs.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Minimum similarity score for a fallback match, in `[0.0, 1.0]`.
    pub similarity_threshold: f64,
    /// Entries older than this are ignored by the similarity scan. Exact
    /// hash matches are not time-filtered.
    pub retention_days: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            similarity_threshold: 0.85,
            retention_days: 30,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }
}

/// A successful lookup.
#[derive(Debug, Clone)]
pub struct CacheHit {
    /// Row identity of the winning entry.
    pub entry_id: String,
    pub payload: Vec<FlashcardProposal>,
    /// Score of the winning candidate; `1.0` for exact matches.
    pub similarity: f64,
    pub exact_match: bool,
}

/// Counters observed since construction.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub exact_hits: u64,
    pub similar_hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.exact_hits + self.similar_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

struct AtomicStats {
    exact_hits: AtomicU64,
    similar_hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    errors: AtomicU64,
}

impl AtomicStats {
    fn new() -> Self {
        Self {
            exact_hits: AtomicU64::new(0),
            similar_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    fn to_stats(&self) -> CacheStats {
        CacheStats {
            exact_hits: self.exact_hits.load(Ordering::Relaxed),
            similar_hits: self.similar_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Content-similarity cache in front of the generation call.
///
/// Lookup tries the exact hash first and only then scans recent entries for
/// a near match. Read failures degrade to a miss so a flaky store never
/// blocks generation; write failures propagate.
pub struct GenerationCache {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
    stats: Arc<AtomicStats>,
}

impl GenerationCache {
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            stats: Arc::new(AtomicStats::new()),
        }
    }

    pub async fn lookup(&self, source_text: &str) -> Result<Option<CacheHit>> {
        if !self.config.enabled {
            return Ok(None);
        }

        let hash = ContentHash::of(source_text);
        match self.store.find_by_hash(&hash).await {
            Ok(Some(entry)) => {
                self.stats.exact_hits.fetch_add(1, Ordering::Relaxed);
                debug!(content_hash = %hash, entry_id = %entry.id, "generation cache exact hit");
                return Ok(Some(CacheHit {
                    entry_id: entry.id,
                    payload: entry.payload,
                    similarity: 1.0,
                    exact_match: true,
                }));
            }
            Ok(None) => {}
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(store = self.store.name(), error = %e, "cache lookup degraded to miss");
                return Ok(None);
            }
        }

        let since = Utc::now() - Duration::days(self.config.retention_days);
        let candidates = match self.store.find_recent(since).await {
            Ok(c) => c,
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(store = self.store.name(), error = %e, "cache scan degraded to miss");
                return Ok(None);
            }
        };

        let mut best: Option<(f64, CacheEntry)> = None;
        for candidate in candidates {
            let score = similarity(source_text, &candidate.source_text);
            if score < self.config.similarity_threshold {
                continue;
            }
            let wins = match &best {
                None => true,
                // Equal scores: the more recent entry wins; equal timestamps
                // keep the first candidate seen.
                Some((best_score, best_entry)) => {
                    score > *best_score
                        || (score == *best_score && candidate.created_at > best_entry.created_at)
                }
            };
            if wins {
                best = Some((score, candidate));
            }
        }

        match best {
            Some((score, entry)) => {
                self.stats.similar_hits.fetch_add(1, Ordering::Relaxed);
                debug!(
                    entry_id = %entry.id,
                    similarity = score,
                    threshold = self.config.similarity_threshold,
                    "generation cache similarity hit"
                );
                Ok(Some(CacheHit {
                    entry_id: entry.id,
                    payload: entry.payload,
                    similarity: score,
                    exact_match: false,
                }))
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    /// Persist a fresh generation result.
    ///
    /// Never deduplicates against near matches: each generated result keeps
    /// its own row so future similarity scans see the historical text.
    pub async fn store(
        &self,
        source_text: &str,
        payload: Vec<FlashcardProposal>,
    ) -> Result<CacheEntry> {
        let hash = ContentHash::of(source_text);
        if !self.config.enabled {
            return Ok(CacheEntry {
                id: Uuid::nil().to_string(),
                content_hash: hash,
                source_text: source_text.to_string(),
                payload,
                created_at: Utc::now(),
            });
        }

        let entry = NewCacheEntry::new(hash, source_text, payload);
        match self.store.insert(entry).await {
            Ok(row) => {
                self.stats.stores.fetch_add(1, Ordering::Relaxed);
                debug!(entry_id = %row.id, content_hash = %row.content_hash, "generation result cached");
                Ok(row)
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(Error::Store(e))
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}
