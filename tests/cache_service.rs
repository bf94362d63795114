//! Cache behavior at the crate surface: exact and similarity hits, the
//! retention window, threshold configuration, and degraded-store handling.

use chrono::{Duration, Utc};
use flashgen::cache::{
    CacheConfig, ContentHash, FlashcardProposal, GenerationCache, MemoryStore, NewCacheEntry,
};
use flashgen::Error;
use std::sync::Arc;

fn geology_cards() -> Vec<FlashcardProposal> {
    vec![
        FlashcardProposal::ai_full(
            "What are igneous rocks formed from?",
            "Cooled and solidified magma or lava",
        ),
        FlashcardProposal::ai_full(
            "Which rock type records sediment layers?",
            "Sedimentary rock",
        ),
    ]
}

fn cache_over(store: Arc<MemoryStore>) -> GenerationCache {
    GenerationCache::new(store, CacheConfig::default())
}

/// `base` with `edits` leading characters replaced, so the similarity score
/// is exactly `(len - edits) / len`.
fn with_edits(base: &str, edits: usize) -> String {
    format!("{}{}", "#".repeat(edits), &base[edits..])
}

#[tokio::test]
async fn test_exact_hit_returns_stored_payload() {
    let store = Arc::new(MemoryStore::new());
    let cache = cache_over(store.clone());
    let source = "Igneous rocks form when molten rock cools and solidifies.";

    let stored = cache.store(source, geology_cards()).await.unwrap();
    let hit = cache.lookup(source).await.unwrap().unwrap();

    assert!(hit.exact_match);
    assert_eq!(hit.similarity, 1.0);
    assert_eq!(hit.entry_id, stored.id);
    assert_eq!(hit.payload, geology_cards());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_lightly_edited_text_reuses_payload() {
    let store = Arc::new(MemoryStore::new());
    let cache = cache_over(store);
    let source = "a".repeat(100);
    cache.store(&source, geology_cards()).await.unwrap();

    // Ten edits out of a hundred characters: similarity 0.90.
    let edited = with_edits(&source, 10);
    let hit = cache.lookup(&edited).await.unwrap().unwrap();

    assert!(!hit.exact_match);
    assert!((hit.similarity - 0.90).abs() < 1e-9);
    assert_eq!(hit.payload, geology_cards());
}

#[tokio::test]
async fn test_threshold_boundary_is_inclusive() {
    let store = Arc::new(MemoryStore::new());
    let cache = cache_over(store);
    let source = "a".repeat(100);
    cache.store(&source, geology_cards()).await.unwrap();

    // 15 edits: similarity 0.85, right at the default threshold.
    let at_threshold = with_edits(&source, 15);
    assert!(cache.lookup(&at_threshold).await.unwrap().is_some());

    // 16 edits: similarity 0.84, just below.
    let below_threshold = with_edits(&source, 16);
    assert!(cache.lookup(&below_threshold).await.unwrap().is_none());
}

#[tokio::test]
async fn test_custom_threshold_is_honored() {
    let store = Arc::new(MemoryStore::new());
    let cache = GenerationCache::new(
        store,
        CacheConfig::default().with_similarity_threshold(0.95),
    );
    let source = "a".repeat(100);
    cache.store(&source, geology_cards()).await.unwrap();

    // 0.90 is a hit under the default threshold but not under 0.95.
    let edited = with_edits(&source, 10);
    assert!(cache.lookup(&edited).await.unwrap().is_none());
    assert!(cache.lookup(&with_edits(&source, 3)).await.unwrap().is_some());
}

#[tokio::test]
async fn test_retention_window_scopes_similarity_but_not_exact() {
    let store = Arc::new(MemoryStore::new());
    let cache = cache_over(store.clone());
    let old_text = "The water cycle moves water between oceans, air, and land.";
    store.insert_at(
        NewCacheEntry::new(ContentHash::of(old_text), old_text, geology_cards()),
        Utc::now() - Duration::days(40),
    );

    // Identical text: the hash index still answers.
    let hit = cache.lookup(old_text).await.unwrap().unwrap();
    assert!(hit.exact_match);

    // Near-identical text: the 40-day-old row is outside the scan window.
    let edited = format!("{old_text}!");
    assert!(cache.lookup(&edited).await.unwrap().is_none());

    // A fresh row with the same content is visible to the scan again.
    cache.store(old_text, geology_cards()).await.unwrap();
    assert!(cache.lookup(&edited).await.unwrap().is_some());
}

#[tokio::test]
async fn test_repeated_lookups_pick_the_same_winner() {
    let store = Arc::new(MemoryStore::new());
    let cache = cache_over(store.clone());
    let query = "a".repeat(100);
    // Two candidates at the same distance from the query, inserted an hour
    // apart; the newer row must win every time.
    let older = format!("b{}", "a".repeat(99));
    let newer = format!("{}b", "a".repeat(99));
    store.insert_at(
        NewCacheEntry::new(ContentHash::of(&older), &older, geology_cards()),
        Utc::now() - Duration::hours(2),
    );
    let expected = store.insert_at(
        NewCacheEntry::new(ContentHash::of(&newer), &newer, geology_cards()),
        Utc::now() - Duration::hours(1),
    );

    for _ in 0..3 {
        let hit = cache.lookup(&query).await.unwrap().unwrap();
        assert_eq!(hit.entry_id, expected.id);
    }
}

#[tokio::test]
async fn test_read_failure_degrades_and_recovers() {
    let store = Arc::new(MemoryStore::new());
    let cache = cache_over(store.clone());
    let source = "Plate tectonics explains continental drift.";
    cache.store(source, geology_cards()).await.unwrap();

    store.fail_next_read();
    // Degraded read path: miss, not error, and the failure is counted.
    assert!(cache.lookup(source).await.unwrap().is_none());
    assert_eq!(cache.stats().errors, 1);

    let hit = cache.lookup(source).await.unwrap();
    assert!(hit.is_some());
}

#[tokio::test]
async fn test_insert_failure_surfaces_to_caller() {
    let store = Arc::new(MemoryStore::new());
    let cache = cache_over(store.clone());

    store.fail_next_insert();
    let err = cache
        .store("Minerals are classified by hardness.", geology_cards())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Store(_)));
    assert_eq!(cache.stats().errors, 1);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_stats_accumulate_across_flows() {
    let store = Arc::new(MemoryStore::new());
    let cache = cache_over(store);
    let source = "a".repeat(100);

    assert!(cache.lookup(&source).await.unwrap().is_none()); // miss
    cache.store(&source, geology_cards()).await.unwrap(); // store
    cache.lookup(&source).await.unwrap(); // exact hit
    cache.lookup(&with_edits(&source, 5)).await.unwrap(); // similar hit

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.stores, 1);
    assert_eq!(stats.exact_hits, 1);
    assert_eq!(stats.similar_hits, 1);
    assert!((stats.hit_ratio() - 2.0 / 3.0).abs() < 1e-9);
}
