//! In-memory similarity cache.
//!
//! LRU-bounded cache with per-entry TTL expiry. Remote cache services (Redis
//! and friends) can implement [`SimilarityCache`] instead; the engine treats
//! every implementation the same way: errors equal misses.

use crate::Result;
use crate::models::{ClusterId, PromptId};
use crate::storage::acquire_lock;
use crate::storage::traits::{SimilarityCache, similarity_cache_key};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A cached score with its expiry instant.
#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    score: f32,
    expires_at: Instant,
}

/// LRU similarity cache with TTL-based expiry.
pub struct InMemorySimilarityCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl InMemorySimilarityCache {
    /// Default entry capacity.
    pub const DEFAULT_CAPACITY: usize = 4096;

    /// Creates a cache with the given entry capacity.
    ///
    /// Capacity 0 is coerced to 1; an unbounded cache is never handed out.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the number of live (non-expired) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let entries = acquire_lock(&self.entries);
        let now = Instant::now();
        entries.iter().filter(|(_, e)| e.expires_at > now).count()
    }

    /// Returns true if the cache holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemorySimilarityCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl SimilarityCache for InMemorySimilarityCache {
    fn get(&self, prompt_id: &PromptId, cluster_id: &ClusterId) -> Result<Option<f32>> {
        let key = similarity_cache_key(prompt_id, cluster_id);
        let mut entries = acquire_lock(&self.entries);

        match entries.get(&key).copied() {
            Some(entry) if entry.expires_at > Instant::now() => {
                metrics::counter!("similarity_cache_hits_total").increment(1);
                Ok(Some(entry.score))
            },
            Some(_) => {
                // Expired: evict eagerly so the slot is reusable
                entries.pop(&key);
                metrics::counter!("similarity_cache_misses_total").increment(1);
                Ok(None)
            },
            None => {
                metrics::counter!("similarity_cache_misses_total").increment(1);
                Ok(None)
            },
        }
    }

    fn set(
        &self,
        prompt_id: &PromptId,
        cluster_id: &ClusterId,
        score: f32,
        ttl: Duration,
    ) -> Result<()> {
        let key = similarity_cache_key(prompt_id, cluster_id);
        let entry = CacheEntry {
            score,
            expires_at: Instant::now() + ttl,
        };
        acquire_lock(&self.entries).put(key, entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let cache = InMemorySimilarityCache::new(16);
        let p = PromptId::new("p-1");
        let c = ClusterId::new("c-1");

        assert_eq!(cache.get(&p, &c).unwrap(), None);
        cache.set(&p, &c, 0.9, Duration::from_secs(60)).unwrap();
        assert_eq!(cache.get(&p, &c).unwrap(), Some(0.9));
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = InMemorySimilarityCache::new(16);
        let p = PromptId::new("p-1");
        let c = ClusterId::new("c-1");

        cache.set(&p, &c, 0.9, Duration::from_secs(0)).unwrap();
        assert_eq!(cache.get(&p, &c).unwrap(), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction() {
        let cache = InMemorySimilarityCache::new(1);
        let p = PromptId::new("p-1");

        cache
            .set(&p, &ClusterId::new("c-1"), 0.8, Duration::from_secs(60))
            .unwrap();
        cache
            .set(&p, &ClusterId::new("c-2"), 0.7, Duration::from_secs(60))
            .unwrap();

        assert_eq!(cache.get(&p, &ClusterId::new("c-1")).unwrap(), None);
        assert_eq!(cache.get(&p, &ClusterId::new("c-2")).unwrap(), Some(0.7));
    }

    #[test]
    fn test_distinct_pairs_do_not_collide() {
        let cache = InMemorySimilarityCache::new(16);
        cache
            .set(
                &PromptId::new("p-1"),
                &ClusterId::new("c-1"),
                0.8,
                Duration::from_secs(60),
            )
            .unwrap();

        assert_eq!(
            cache
                .get(&PromptId::new("p-2"), &ClusterId::new("c-1"))
                .unwrap(),
            None
        );
    }
}
