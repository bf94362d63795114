//! 生成缓存模块：基于内容相似度的缓存层，减少重复的 LLM 生成调用。
//!
//! # Generation Cache Module
//!
//! This module caches LLM generation results keyed by the source text they
//! were generated from, so that repeated or near-identical inputs never pay
//! for a second upstream call.
//!
//! ## Overview
//!
//! Lookup runs in two stages:
//! - Exact: a SHA-256 fingerprint of the source text is matched against
//!   stored entries. An exact hit short-circuits.
//! - Similar: on an exact miss, entries created inside the retention window
//!   are scored with normalized edit distance; the best candidate at or
//!   above the threshold wins.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`GenerationCache`] | Lookup/store orchestration with hit statistics |
//! | [`CacheConfig`] | Threshold, retention window, and enable switch |
//! | [`CacheStore`] | Trait for the persistent row store collaborator |
//! | [`MemoryStore`] | In-memory reference store used in tests |
//! | [`ContentHash`] | SHA-256 fingerprint of a source text |
//! | [`CacheEntry`] | One persisted generation result |
//!
//! ## Example
//!
//! ```rust
//! use flashgen::cache::{CacheConfig, GenerationCache, MemoryStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let config = CacheConfig::default().with_similarity_threshold(0.9);
//! let cache = GenerationCache::new(store, config);
//! ```

mod entry;
mod key;
mod service;
mod store;

pub use entry::{CacheEntry, FlashcardProposal, NewCacheEntry, ProposalSource};
pub use key::ContentHash;
pub use service::{CacheConfig, CacheHit, CacheStats, GenerationCache};
pub use store::{CacheStore, MemoryStore, StoreError};
