//! # Promptcluster
//!
//! Incremental semantic clustering and canonical template versioning for
//! prompt corpora.
//!
//! Promptcluster ingests text prompts, decides which semantic cluster each
//! prompt belongs to, and evolves a versioned canonical template per cluster
//! as new prompts arrive.
//!
//! ## Features
//!
//! - Incremental cluster assignment with an exact-duplicate fast path
//! - Similarity cache with bounded staleness (TTL-based expiry)
//! - Semantic-version template evolution (major/minor/patch change detection)
//! - Append-only evolution event audit trail
//! - Pluggable seams: record store, vector search, cache, embedder, reasoner
//!
//! ## Example
//!
//! ```rust,ignore
//! use promptcluster::{ClusterAssignmentEngine, ClusteringConfig};
//!
//! let engine = ClusterAssignmentEngine::new(store, vector, cache, config);
//! let result = engine.assign_to_cluster(&prompt_id, &embedding, "Translate this to French")?;
//! if result.is_new_cluster {
//!     println!("seeded cluster {}", result.cluster_id);
//! }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod embedding;
pub mod llm;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::{CacheConfig, ClusteringConfig, DriftConfig, PromptclusterConfig};
pub use embedding::Embedder;
pub use llm::ReasoningProvider;
pub use models::{
    CanonicalTemplate, ChangeKind, Cluster, ClusterAssignment, ClusterId, EvolutionEvent,
    EvolutionEventKind, Prompt, PromptId, SemanticVersion, TemplateId, TemplateSlot,
};
pub use services::{
    AssignmentResult, ClusterAssignmentEngine, DriftMonitor, DriftRecommendation, DriftReport,
    SlotDraft, TemplateDraft, TemplateVersioningEngine,
};
pub use storage::{RecordStore, SimilarityCache, VectorSearchBackend};

/// Error type for promptcluster operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Empty prompt content, dimension mismatches, malformed drafts |
/// | `OperationFailed` | `SQLite` queries fail, vector index I/O fails, provider calls fail |
/// | `NotFound` | A cluster/template referenced by another record does not exist |
/// | `InvalidVersion` | A version string does not parse as `MAJOR.MINOR.PATCH` |
///
/// Transient backend failures (cache, vector search) are *not* surfaced through
/// this type on the assignment path; the engine degrades to recomputation or an
/// empty candidate set and logs the failure instead.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - Prompt content is empty at assignment time
    /// - An embedding's dimensions do not match the vector backend
    /// - A template draft has no content
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` database operations fail
    /// - Vector index persistence fails
    /// - A reasoning provider call fails or returns unparseable output
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A referenced record does not exist.
    ///
    /// Raised when a data invariant is violated, e.g. an assignment or an
    /// exact-content match points at a cluster that is gone, or a
    /// `previous_template_id` resolves to no row. Never raised for ordinary
    /// cache or candidate misses, which are handled as absent values.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The entity kind (e.g. "cluster", "template").
        entity: &'static str,
        /// The identifier that failed to resolve.
        id: String,
    },

    /// A version string failed to parse as `MAJOR.MINOR.PATCH`.
    ///
    /// Aborts only the version-creation call that encountered it.
    #[error("invalid version format: {0}")]
    InvalidVersion(String),
}

/// Result type alias for promptcluster operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Centralized so every record carries timestamps from the same clock source.
/// Falls back to 0 if the system clock is before the Unix epoch.
///
/// # Examples
///
/// ```rust
/// use promptcluster::current_timestamp;
///
/// let ts = current_timestamp();
/// assert!(ts > 0);
/// ```
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("empty content".to_string());
        assert_eq!(err.to_string(), "invalid input: empty content");

        let err = Error::OperationFailed {
            operation: "insert_prompt".to_string(),
            cause: "disk full".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "operation 'insert_prompt' failed: disk full"
        );

        let err = Error::NotFound {
            entity: "cluster",
            id: "abc-123".to_string(),
        };
        assert_eq!(err.to_string(), "cluster not found: abc-123");

        let err = Error::InvalidVersion("1.2".to_string());
        assert_eq!(err.to_string(), "invalid version format: 1.2");
    }

    #[test]
    fn test_current_timestamp_monotonic_enough() {
        let a = current_timestamp();
        let b = current_timestamp();
        assert!(b >= a);
    }
}
