//! Assignment result types.

use crate::models::{ClusterId, PromptId};

/// Outcome of one cluster assignment decision.
#[derive(Debug, Clone)]
pub struct AssignmentResult {
    /// The prompt that was assigned.
    pub prompt_id: PromptId,
    /// The cluster it landed in.
    pub cluster_id: ClusterId,
    /// The similarity score the decision was made on, in `[0, 1]`.
    ///
    /// 1.0 on the exact-duplicate and new-cluster paths.
    pub similarity_score: f32,
    /// `min(similarity_score / threshold, 1.0)`; 1.0 on the exact-duplicate
    /// and new-cluster paths.
    pub confidence_score: f32,
    /// Free-text reasoning for the decision.
    pub reasoning: String,
    /// True when the prompt seeded a cluster instead of joining one.
    pub is_new_cluster: bool,
}
