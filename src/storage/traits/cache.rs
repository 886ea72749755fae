//! Similarity cache trait.
//!
//! The cache is a pure performance/consistency optimization, never a source of
//! truth. Misses and backend errors are equivalent: both force recomputation
//! and must never abort the assignment path. A cached score that is stale
//! relative to re-indexed vectors is accepted as-is until TTL expiry
//! (bounded staleness).

use crate::Result;
use crate::models::{ClusterId, PromptId};
use std::time::Duration;

/// Builds the cache key for a (prompt, candidate-cluster) similarity score.
#[must_use]
pub fn similarity_cache_key(prompt_id: &PromptId, cluster_id: &ClusterId) -> String {
    format!("similarity:{prompt_id}:{cluster_id}")
}

/// Trait for similarity score caches.
pub trait SimilarityCache: Send + Sync {
    /// Looks up a cached similarity score.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache backend fails; callers treat this the
    /// same as a miss.
    fn get(&self, prompt_id: &PromptId, cluster_id: &ClusterId) -> Result<Option<f32>>;

    /// Stores a similarity score with the given time-to-live.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache backend fails; callers log and continue.
    fn set(
        &self,
        prompt_id: &PromptId,
        cluster_id: &ClusterId,
        score: f32,
        ttl: Duration,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_format() {
        let key = similarity_cache_key(&PromptId::new("p-1"), &ClusterId::new("c-2"));
        assert_eq!(key, "similarity:p-1:c-2");
    }
}
