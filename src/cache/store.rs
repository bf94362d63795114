//! Cache store adapter and the in-memory reference backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use super::entry::{CacheEntry, NewCacheEntry};
use super::key::ContentHash;

/// Failures surfaced by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed row {id}: {detail}")]
    MalformedRow { id: String, detail: String },

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Adapter over the persistent key-value collaborator holding generation
/// results.
///
/// Implementations own row identity and timestamps; callers never fabricate
/// either. `find_recent` may return entries in any order.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn find_by_hash(&self, hash: &ContentHash) -> Result<Option<CacheEntry>, StoreError>;

    /// Entries created at or after `since`.
    async fn find_recent(&self, since: DateTime<Utc>) -> Result<Vec<CacheEntry>, StoreError>;

    async fn insert(&self, entry: NewCacheEntry) -> Result<CacheEntry, StoreError>;

    fn name(&self) -> &'static str;
}

/// In-memory store modeling the collaborator's row table.
///
/// Used as the reference backend in tests; rows live in insertion order and
/// duplicate hashes are kept as separate rows, the way a real table would.
pub struct MemoryStore {
    rows: Arc<RwLock<Vec<CacheEntry>>>,
    fail_next_read: AtomicBool,
    fail_next_insert: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
            fail_next_read: AtomicBool::new(false),
            fail_next_insert: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert with an explicit timestamp. Lets tests backdate rows past the
    /// retention window without touching the wall clock.
    pub fn insert_at(&self, entry: NewCacheEntry, created_at: DateTime<Utc>) -> CacheEntry {
        let row = CacheEntry {
            id: Uuid::new_v4().to_string(),
            content_hash: entry.content_hash,
            source_text: entry.source_text,
            payload: entry.payload,
            created_at,
        };
        self.rows.write().unwrap().push(row.clone());
        row
    }

    /// Make the next read call fail with `StoreError::Unavailable`.
    pub fn fail_next_read(&self) {
        self.fail_next_read.store(true, Ordering::SeqCst);
    }

    /// Make the next insert fail with `StoreError::Unavailable`.
    pub fn fail_next_insert(&self) {
        self.fail_next_insert.store(true, Ordering::SeqCst);
    }

    fn take_read_failure(&self) -> Result<(), StoreError> {
        if self.fail_next_read.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn find_by_hash(&self, hash: &ContentHash) -> Result<Option<CacheEntry>, StoreError> {
        self.take_read_failure()?;
        let rows = self.rows.read().unwrap();
        // Most recent row wins when the same text was stored more than once.
        Ok(rows.iter().rev().find(|r| &r.content_hash == hash).cloned())
    }

    async fn find_recent(&self, since: DateTime<Utc>) -> Result<Vec<CacheEntry>, StoreError> {
        self.take_read_failure()?;
        let rows = self.rows.read().unwrap();
        Ok(rows
            .iter()
            .filter(|r| r.created_at >= since)
            .cloned()
            .collect())
    }

    async fn insert(&self, entry: NewCacheEntry) -> Result<CacheEntry, StoreError> {
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected insert failure".into()));
        }
        Ok(self.insert_at(entry, Utc::now()))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
