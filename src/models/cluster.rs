//! Cluster and assignment entities.

use super::{ClusterId, PromptId};

/// A group of semantically equivalent prompts.
///
/// The `similarity_threshold` is a snapshot of the threshold in effect when the
/// cluster was created; it never retroactively changes past assignments.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Unique identifier.
    pub id: ClusterId,
    /// Optional display name.
    pub name: Option<String>,
    /// The prompt whose vector seeded this cluster (the centroid reference).
    pub seed_prompt_id: Option<PromptId>,
    /// SHA-256 fingerprint of the seed prompt's content.
    ///
    /// A UNIQUE constraint on this column collapses concurrent cluster
    /// creations for byte-identical content into a single row.
    pub seed_fingerprint: Option<String>,
    /// Similarity threshold snapshot at creation time.
    pub similarity_threshold: f32,
    /// Confidence score for the cluster as a whole.
    pub confidence_score: f32,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
    /// Last association change timestamp (Unix epoch seconds).
    pub updated_at: u64,
}

impl Cluster {
    /// Creates a cluster seeded by a prompt.
    ///
    /// The display name is derived from the id prefix, matching how clusters
    /// are labeled before any canonical template names them.
    #[must_use]
    pub fn seeded_by(
        seed_prompt_id: PromptId,
        seed_fingerprint: impl Into<String>,
        similarity_threshold: f32,
    ) -> Self {
        let id = ClusterId::generate();
        let short = id.as_str().chars().take(8).collect::<String>();
        let now = crate::current_timestamp();
        Self {
            name: Some(format!("Cluster-{short}")),
            id,
            seed_prompt_id: Some(seed_prompt_id),
            seed_fingerprint: Some(seed_fingerprint.into()),
            similarity_threshold,
            confidence_score: 1.0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The recorded link between one prompt and the cluster it was placed in.
///
/// Created once at assignment time and never mutated. `similarity_score` is
/// the actual score the decision was made on, not a post-hoc estimate.
#[derive(Debug, Clone)]
pub struct ClusterAssignment {
    /// The assigned prompt.
    pub prompt_id: PromptId,
    /// The cluster it was placed in.
    pub cluster_id: ClusterId,
    /// Similarity score used for the decision, in `[0, 1]`.
    pub similarity_score: f32,
    /// `min(similarity_score / threshold, 1.0)`; 1.0 on the exact-duplicate
    /// and new-cluster paths.
    pub confidence_score: f32,
    /// Free-text reasoning for the decision.
    pub reasoning: String,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
}

impl ClusterAssignment {
    /// Creates an assignment record with the current timestamp.
    #[must_use]
    pub fn new(
        prompt_id: PromptId,
        cluster_id: ClusterId,
        similarity_score: f32,
        confidence_score: f32,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            prompt_id,
            cluster_id,
            similarity_score,
            confidence_score,
            reasoning: reasoning.into(),
            created_at: crate::current_timestamp(),
        }
    }
}
