//! Analysis result caching
//!
//! Results are fetched by id after the analysis call returns. Entries expire
//! after a TTL, and the least recently used entry is evicted at capacity.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use super::analyzer::GapAnalysis;

/// Storage for completed analyses
pub trait ResultCache: Send + Sync {
    /// Look up an analysis, refreshing its recency
    fn get(&self, key: &str) -> Option<GapAnalysis>;

    /// Store an analysis
    fn put(&self, key: String, value: GapAnalysis);

    /// Remove an analysis, returning whether it was present
    fn invalidate(&self, key: &str) -> bool;
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    /// Results currently held, expired ones included until next touched
    pub entries: usize,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups for unknown or expired ids
    pub misses: u64,
    /// Oldest entries removed to stay under capacity
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
}

struct CacheEntry {
    value: GapAnalysis,
    inserted_at: Instant,
    last_access: u64,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    tick: u64,
    stats: CacheStats,
}

impl CacheInner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

/// In-memory LRU cache with a TTL
pub struct AnalysisCache {
    inner: Mutex<CacheInner>,
    max_entries: usize,
    ttl: Duration,
}

impl AnalysisCache {
    /// Create a new cache
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.entries.len(),
            ..inner.stats
        }
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let ttl = self.ttl;
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        let removed = before - inner.entries.len();
        inner.stats.expirations += removed as u64;
        removed
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        entry.inserted_at.elapsed() >= self.ttl
    }
}

impl ResultCache for AnalysisCache {
    fn get(&self, key: &str) -> Option<GapAnalysis> {
        let mut inner = self.inner.lock();

        match inner.entries.get(key).map(|entry| self.is_expired(entry)) {
            None => {
                inner.stats.misses += 1;
                return None;
            }
            Some(true) => {
                inner.entries.remove(key);
                inner.stats.expirations += 1;
                inner.stats.misses += 1;
                tracing::debug!("Cache miss (TTL expired): {}", key);
                return None;
            }
            Some(false) => {}
        }

        let tick = inner.next_tick();
        inner.stats.hits += 1;
        let entry = inner.entries.get_mut(key)?;
        entry.last_access = tick;
        Some(entry.value.clone())
    }

    fn put(&self, key: String, value: GapAnalysis) {
        let mut inner = self.inner.lock();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_entries {
            let lru_key = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(k, _)| k.clone());
            if let Some(lru_key) = lru_key {
                inner.entries.remove(&lru_key);
                inner.stats.evictions += 1;
                tracing::debug!("Evicted least recently used analysis: {}", lru_key);
            }
        }

        let tick = inner.next_tick();
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                last_access: tick,
            },
        );
    }

    fn invalidate(&self, key: &str) -> bool {
        self.inner.lock().entries.remove(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(name: &str) -> GapAnalysis {
        GapAnalysis::new(vec![name.to_string()], serde_json::json!({ "gaps": [] }))
    }

    #[test]
    fn test_put_and_get() {
        let cache = AnalysisCache::new(10, Duration::from_secs(60));
        let value = analysis("unit1.pdf");
        cache.put("a".to_string(), value.clone());

        assert_eq!(cache.get("a"), Some(value));
        assert_eq!(cache.get("b"), None);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = AnalysisCache::new(2, Duration::from_secs(60));
        cache.put("a".to_string(), analysis("a"));
        cache.put("b".to_string(), analysis("b"));

        // Touch "a" so "b" becomes the eviction candidate
        assert!(cache.get("a").is_some());
        cache.put("c".to_string(), analysis("c"));

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = AnalysisCache::new(1, Duration::from_secs(60));
        cache.put("a".to_string(), analysis("first"));
        cache.put("a".to_string(), analysis("second"));

        assert_eq!(cache.get("a").unwrap().document_names, vec!["second".to_string()]);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let cache = AnalysisCache::new(10, Duration::ZERO);
        cache.put("a".to_string(), analysis("a"));

        assert!(cache.get("a").is_none());
        assert_eq!(cache.stats().expirations, 1);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_purge_and_invalidate() {
        let cache = AnalysisCache::new(10, Duration::ZERO);
        cache.put("a".to_string(), analysis("a"));
        cache.put("b".to_string(), analysis("b"));
        assert_eq!(cache.purge_expired(), 2);

        let cache = AnalysisCache::new(10, Duration::from_secs(60));
        cache.put("a".to_string(), analysis("a"));
        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
    }
}
