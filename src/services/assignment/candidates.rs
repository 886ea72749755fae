//! Candidate gathering and per-cluster score aggregation.

use crate::config::ClusteringConfig;
use crate::models::{ClusterId, PromptId};
use crate::storage::traits::{SimilarityCache, VectorSearchBackend};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A candidate cluster with the similarity score used for the decision.
#[derive(Debug, Clone)]
pub(super) struct ClusterCandidate {
    pub cluster_id: ClusterId,
    pub score: f32,
}

/// Gathers candidate clusters for a prompt embedding.
///
/// Candidate gathering optimizes for recall: the search limit is generous and
/// the score floor is looser than the assignment threshold. The threshold
/// decision happens in the engine, on cache-authoritative scores.
pub(super) struct CandidateGatherer {
    vector: Arc<dyn VectorSearchBackend>,
    cache: Arc<dyn SimilarityCache>,
    config: ClusteringConfig,
    cache_ttl: Duration,
}

impl CandidateGatherer {
    pub(super) fn new(
        vector: Arc<dyn VectorSearchBackend>,
        cache: Arc<dyn SimilarityCache>,
        config: ClusteringConfig,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            vector,
            cache,
            config,
            cache_ttl,
        }
    }

    /// Returns candidate clusters ordered by descending score.
    ///
    /// Each cluster is scored by the **max** over its matching points, so a
    /// cluster with one very close member beats a cluster with many mediocre
    /// ones. The prompt's own indexed point (a retry leftover) is excluded.
    /// A cached score for a (prompt, cluster) pair is authoritative; search
    /// scores fill cache misses with a TTL write.
    ///
    /// Vector search failures degrade to an empty candidate set: ingestion
    /// must not abort because the index is briefly unavailable.
    pub(super) fn gather(&self, prompt_id: &PromptId, embedding: &[f32]) -> Vec<ClusterCandidate> {
        let hits = match self.vector.search(
            embedding,
            self.config.candidate_limit,
            Some(self.config.search_score_floor),
        ) {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, "vector search failed, using empty candidate set");
                metrics::counter!("assignment_vector_search_failures_total").increment(1);
                return Vec::new();
            },
        };

        let mut best_per_cluster: HashMap<ClusterId, f32> = HashMap::new();
        for hit in hits {
            if hit.payload.prompt_id == *prompt_id {
                continue;
            }
            best_per_cluster
                .entry(hit.payload.cluster_id)
                .and_modify(|best| *best = best.max(hit.score))
                .or_insert(hit.score);
        }

        let mut candidates: Vec<ClusterCandidate> = best_per_cluster
            .into_iter()
            .map(|(cluster_id, search_score)| {
                let score = self.authoritative_score(prompt_id, &cluster_id, search_score);
                ClusterCandidate { cluster_id, score }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates
    }

    /// Resolves the decision score for one candidate pair.
    ///
    /// Cache errors are logged and treated as misses.
    fn authoritative_score(
        &self,
        prompt_id: &PromptId,
        cluster_id: &ClusterId,
        search_score: f32,
    ) -> f32 {
        match self.cache.get(prompt_id, cluster_id) {
            Ok(Some(cached)) => return cached,
            Ok(None) => {},
            Err(e) => {
                tracing::warn!(error = %e, "similarity cache read failed, treating as miss");
            },
        }

        if let Err(e) = self
            .cache
            .set(prompt_id, cluster_id, search_score, self.cache_ttl)
        {
            tracing::warn!(error = %e, "similarity cache write failed");
        }
        search_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::cache::InMemorySimilarityCache;
    use crate::storage::traits::{SimilarityCache as _, VectorPayload, VectorPoint};
    use crate::storage::vector::InMemoryVectorBackend;

    fn indexed(backend: &InMemoryVectorBackend, id: &str, cluster: &str, vector: Vec<f32>) {
        backend
            .upsert(&VectorPoint {
                id: PromptId::new(id),
                vector,
                payload: VectorPayload {
                    prompt_id: PromptId::new(id),
                    cluster_id: ClusterId::new(cluster),
                    content: String::new(),
                },
            })
            .unwrap();
    }

    fn gatherer(
        vector: Arc<InMemoryVectorBackend>,
        cache: Arc<InMemorySimilarityCache>,
    ) -> CandidateGatherer {
        CandidateGatherer::new(vector, cache, ClusteringConfig::default(), Duration::from_secs(60))
    }

    #[test]
    fn test_per_cluster_max_aggregation() {
        let vector = Arc::new(InMemoryVectorBackend::in_memory(2));
        // Cluster c-1 has a close and a distant member; its score is the max
        indexed(&vector, "p-1", "c-1", vec![1.0, 0.0]);
        indexed(&vector, "p-2", "c-1", vec![0.5, 0.5]);
        indexed(&vector, "p-3", "c-2", vec![0.6, 0.4]);

        let cache = Arc::new(InMemorySimilarityCache::default());
        let candidates =
            gatherer(vector, cache).gather(&PromptId::new("q"), &[1.0, 0.0]);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].cluster_id, ClusterId::new("c-1"));
        assert!((candidates[0].score - 1.0).abs() < 1e-6);
        assert!(candidates[0].score > candidates[1].score);
    }

    #[test]
    fn test_own_point_is_excluded() {
        let vector = Arc::new(InMemoryVectorBackend::in_memory(2));
        indexed(&vector, "q", "c-1", vec![1.0, 0.0]);

        let cache = Arc::new(InMemorySimilarityCache::default());
        let candidates = gatherer(vector, cache).gather(&PromptId::new("q"), &[1.0, 0.0]);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_cached_score_is_authoritative() {
        let vector = Arc::new(InMemoryVectorBackend::in_memory(2));
        indexed(&vector, "p-1", "c-1", vec![1.0, 0.0]);

        let cache = Arc::new(InMemorySimilarityCache::default());
        let query = PromptId::new("q");
        cache
            .set(&query, &ClusterId::new("c-1"), 0.7, Duration::from_secs(60))
            .unwrap();

        // Search would score ~1.0, but the cached 0.7 wins
        let candidates = gatherer(vector, cache).gather(&query, &[1.0, 0.0]);
        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_search_miss_populates_cache() {
        let vector = Arc::new(InMemoryVectorBackend::in_memory(2));
        indexed(&vector, "p-1", "c-1", vec![1.0, 0.0]);

        let cache = Arc::new(InMemorySimilarityCache::default());
        let query = PromptId::new("q");
        gatherer(vector, Arc::clone(&cache)).gather(&query, &[1.0, 0.0]);

        let cached = cache.get(&query, &ClusterId::new("c-1")).unwrap().unwrap();
        assert!((cached - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_search_error_degrades_to_empty() {
        let vector = Arc::new(InMemoryVectorBackend::in_memory(4));
        let cache = Arc::new(InMemorySimilarityCache::default());
        // Wrong query dimensions make the backend error
        let candidates = gatherer(vector, cache).gather(&PromptId::new("q"), &[1.0, 0.0]);
        assert!(candidates.is_empty());
    }
}
