//! Assignment engine orchestrator.

use super::candidates::CandidateGatherer;
use super::exact::ExactMatchChecker;
use super::types::AssignmentResult;
use crate::config::ClusteringConfig;
use crate::models::{Cluster, ClusterAssignment, ClusterId, Prompt, PromptId};
use crate::storage::content_fingerprint;
use crate::storage::traits::{
    RecordStore, SimilarityCache, VectorPayload, VectorPoint, VectorSearchBackend,
};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Default time-to-live for similarity scores cached during assignment.
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Engine that assigns prompts to semantic clusters.
///
/// Holds no mutable state; one instance is shared across concurrent ingestion
/// workers. All collaborators are trait objects behind `Arc`.
///
/// # Example
///
/// ```rust,ignore
/// use promptcluster::{ClusterAssignmentEngine, ClusteringConfig};
/// use promptcluster::storage::{InMemorySimilarityCache, InMemoryVectorBackend, SqliteRecordStore};
/// use std::sync::Arc;
///
/// let store = Arc::new(SqliteRecordStore::in_memory()?);
/// let vector = Arc::new(InMemoryVectorBackend::in_memory(384));
/// let cache = Arc::new(InMemorySimilarityCache::default());
/// let engine = ClusterAssignmentEngine::new(store, vector, cache, ClusteringConfig::default());
///
/// let result = engine.assign_to_cluster(&prompt.id, &embedding, &prompt.content)?;
/// ```
pub struct ClusterAssignmentEngine {
    store: Arc<dyn RecordStore>,
    vector: Arc<dyn VectorSearchBackend>,
    exact: ExactMatchChecker,
    candidates: CandidateGatherer,
    config: ClusteringConfig,
}

impl ClusterAssignmentEngine {
    /// Creates an engine over the given storage seams.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        vector: Arc<dyn VectorSearchBackend>,
        cache: Arc<dyn SimilarityCache>,
        config: ClusteringConfig,
    ) -> Self {
        Self::with_cache_ttl(store, vector, cache, config, DEFAULT_CACHE_TTL)
    }

    /// Creates an engine with a custom similarity-cache TTL.
    #[must_use]
    pub fn with_cache_ttl(
        store: Arc<dyn RecordStore>,
        vector: Arc<dyn VectorSearchBackend>,
        cache: Arc<dyn SimilarityCache>,
        config: ClusteringConfig,
        cache_ttl: Duration,
    ) -> Self {
        let exact = ExactMatchChecker::new(Arc::clone(&store));
        let candidates = CandidateGatherer::new(
            Arc::clone(&vector),
            cache,
            config.clone(),
            cache_ttl,
        );
        Self {
            store,
            vector,
            exact,
            candidates,
            config,
        }
    }

    /// Assigns a prompt to a cluster, creating one when nothing matches.
    ///
    /// The prompt row must already exist; this records the assignment and
    /// indexes the prompt's vector tagged with the resolved cluster id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for empty content or an embedding whose
    /// dimensions do not match the vector backend, [`Error::NotFound`] when an
    /// exact-content match points at a cluster that is gone, and
    /// [`Error::OperationFailed`] when the record store fails. Vector search
    /// and cache failures never abort assignment.
    #[instrument(skip(self, embedding, content), fields(prompt_id = %prompt_id))]
    pub fn assign_to_cluster(
        &self,
        prompt_id: &PromptId,
        embedding: &[f32],
        content: &str,
    ) -> Result<AssignmentResult> {
        if content.trim().is_empty() {
            return Err(Error::InvalidInput("prompt content is empty".to_string()));
        }
        if embedding.len() != self.vector.dimensions() {
            return Err(Error::InvalidInput(format!(
                "embedding dimension mismatch: expected {}, got {}",
                self.vector.dimensions(),
                embedding.len()
            )));
        }

        if let Some(cluster) = self.exact.check(content, prompt_id)? {
            tracing::info!(cluster_id = %cluster.id, "exact content match");
            return self.join_cluster(
                prompt_id,
                embedding,
                content,
                &cluster.id,
                1.0,
                1.0,
                "exact content match with an existing cluster member",
                "exact_match",
            );
        }

        for candidate in self.candidates.gather(prompt_id, embedding) {
            if candidate.score < self.config.similarity_threshold {
                // Candidates are sorted descending; nothing further can clear
                // the threshold
                break;
            }

            // A stale vector index can reference a deleted cluster; skip it
            if self.store.get_cluster(&candidate.cluster_id)?.is_none() {
                tracing::warn!(
                    cluster_id = %candidate.cluster_id,
                    "vector index references missing cluster, skipping candidate"
                );
                continue;
            }

            let confidence = (candidate.score / self.config.similarity_threshold).min(1.0);
            let reasoning = format!(
                "similarity {:.3} meets threshold {:.2}",
                candidate.score, self.config.similarity_threshold
            );
            tracing::info!(
                cluster_id = %candidate.cluster_id,
                score = candidate.score,
                "vector match"
            );
            return self.join_cluster(
                prompt_id,
                embedding,
                content,
                &candidate.cluster_id,
                candidate.score,
                confidence,
                &reasoning,
                "vector_match",
            );
        }

        self.seed_cluster(prompt_id, embedding, content)
    }

    /// Returns all prompts assigned to a cluster, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the cluster does not exist.
    #[instrument(skip(self), fields(cluster_id = %cluster_id))]
    pub fn cluster_prompts(&self, cluster_id: &ClusterId) -> Result<Vec<Prompt>> {
        if self.store.get_cluster(cluster_id)?.is_none() {
            return Err(Error::NotFound {
                entity: "cluster",
                id: cluster_id.as_str().to_string(),
            });
        }
        self.store.prompts_in_cluster(cluster_id)
    }

    /// Records the assignment against an existing cluster and indexes the
    /// prompt's vector.
    #[allow(clippy::too_many_arguments)]
    fn join_cluster(
        &self,
        prompt_id: &PromptId,
        embedding: &[f32],
        content: &str,
        cluster_id: &ClusterId,
        similarity_score: f32,
        confidence_score: f32,
        reasoning: &str,
        outcome: &'static str,
    ) -> Result<AssignmentResult> {
        let assignment = ClusterAssignment::new(
            prompt_id.clone(),
            cluster_id.clone(),
            similarity_score,
            confidence_score,
            reasoning,
        );
        self.store.record_assignment(&assignment)?;
        self.index_vector(prompt_id, embedding, content, cluster_id);

        metrics::counter!("assignment_total", "outcome" => outcome).increment(1);
        Ok(AssignmentResult {
            prompt_id: prompt_id.clone(),
            cluster_id: cluster_id.clone(),
            similarity_score,
            confidence_score,
            reasoning: reasoning.to_string(),
            is_new_cluster: false,
        })
    }

    /// Creates a cluster seeded by this prompt.
    ///
    /// The seed-fingerprint UNIQUE constraint collapses a concurrent creation
    /// or a caller retry onto the already-existing cluster.
    fn seed_cluster(
        &self,
        prompt_id: &PromptId,
        embedding: &[f32],
        content: &str,
    ) -> Result<AssignmentResult> {
        let cluster = Cluster::seeded_by(
            prompt_id.clone(),
            content_fingerprint(content),
            self.config.similarity_threshold,
        );
        let reasoning = "no existing match above threshold";
        let assignment =
            ClusterAssignment::new(prompt_id.clone(), cluster.id.clone(), 1.0, 1.0, reasoning);

        let resolved = self
            .store
            .create_cluster_with_assignment(&cluster, &assignment)?;
        let is_new_cluster = resolved.id == cluster.id;
        self.index_vector(prompt_id, embedding, content, &resolved.id);

        tracing::info!(cluster_id = %resolved.id, is_new_cluster, "seeded cluster");
        metrics::counter!("assignment_total", "outcome" => "new_cluster").increment(1);
        Ok(AssignmentResult {
            prompt_id: prompt_id.clone(),
            cluster_id: resolved.id,
            similarity_score: 1.0,
            confidence_score: 1.0,
            reasoning: reasoning.to_string(),
            is_new_cluster,
        })
    }

    /// Upserts the prompt's vector tagged with its resolved cluster.
    ///
    /// Index failures are logged, not surfaced: the index is rebuildable and
    /// the assignment itself is already durable.
    fn index_vector(
        &self,
        prompt_id: &PromptId,
        embedding: &[f32],
        content: &str,
        cluster_id: &ClusterId,
    ) {
        let point = VectorPoint {
            id: prompt_id.clone(),
            vector: embedding.to_vec(),
            payload: VectorPayload {
                prompt_id: prompt_id.clone(),
                cluster_id: cluster_id.clone(),
                content: content.to_string(),
            },
        };
        if let Err(e) = self.vector.upsert(&point) {
            tracing::warn!(error = %e, "vector upsert failed, index will lag the record store");
        }
    }
}
