//! Vector search backend trait.
//!
//! Provides the abstraction layer for the external vector search service.
//! Results carry a typed payload validated at the boundary rather than a
//! free-form dictionary.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use promptcluster::storage::vector::InMemoryVectorBackend;
//! use promptcluster::storage::traits::{VectorPayload, VectorPoint, VectorSearchBackend};
//!
//! let backend = InMemoryVectorBackend::in_memory(384);
//! backend.upsert(&VectorPoint {
//!     id: prompt_id.clone(),
//!     vector: embedding,
//!     payload: VectorPayload {
//!         prompt_id,
//!         cluster_id,
//!         content: "Translate {{text}} to French".to_string(),
//!     },
//! })?;
//!
//! let hits = backend.search(&query, 50, Some(0.5))?;
//! for hit in hits {
//!     println!("{} scored {:.3}", hit.payload.cluster_id, hit.score);
//! }
//! ```

use crate::Result;
use crate::models::{ClusterId, PromptId};
use serde::{Deserialize, Serialize};

/// Metadata attached to every indexed vector.
///
/// Typed replacement for the duck-typed payload dictionaries a remote vector
/// database returns; implementations validate fields at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorPayload {
    /// The prompt this vector was computed from.
    pub prompt_id: PromptId,
    /// The cluster the prompt was assigned to when indexed.
    pub cluster_id: ClusterId,
    /// The prompt content, for diagnostics.
    pub content: String,
}

/// A vector plus payload, as written to the index.
#[derive(Debug, Clone)]
pub struct VectorPoint {
    /// Point identifier (the prompt id).
    pub id: PromptId,
    /// The embedding vector.
    pub vector: Vec<f32>,
    /// Attached metadata.
    pub payload: VectorPayload,
}

/// A search hit: point id, similarity score, payload.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// Point identifier.
    pub id: PromptId,
    /// Cosine similarity score in `[0, 1]`.
    pub score: f32,
    /// Attached metadata.
    pub payload: VectorPayload,
}

/// Trait for vector search backends.
///
/// Implementations should be thread-safe (`Send + Sync`); methods take `&self`
/// so backends can be shared via `Arc<dyn VectorSearchBackend>` and use
/// interior mutability for mutable state.
pub trait VectorSearchBackend: Send + Sync {
    /// The dimensionality of indexed vectors.
    fn dimensions(&self) -> usize;

    /// Inserts or updates a point.
    ///
    /// Re-upserting an existing id replaces its vector and payload, which is
    /// how a prompt's resolved cluster id becomes visible to future searches.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails or dimensions mismatch.
    fn upsert(&self, point: &VectorPoint) -> Result<()>;

    /// Searches for the nearest neighbors of `query`.
    ///
    /// Returns up to `limit` hits with similarity at or above `score_floor`
    /// (when given), ordered by descending score.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails. Callers on the assignment path
    /// treat any error as an empty candidate set.
    fn search(
        &self,
        query: &[f32],
        limit: usize,
        score_floor: Option<f32>,
    ) -> Result<Vec<ScoredPoint>>;

    /// Removes a point by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    fn remove(&self, id: &PromptId) -> Result<bool>;

    /// Returns the total count of indexed points.
    ///
    /// # Errors
    ///
    /// Returns an error if the count operation fails.
    fn count(&self) -> Result<usize>;
}
