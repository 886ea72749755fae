//! Record store trait.
//!
//! Durable storage for prompts, clusters, assignments, templates, slots, and
//! evolution events, with cascade-delete semantics: deleting a cluster removes
//! its assignments and templates; deleting a template removes its slots and
//! events.

use crate::Result;
use crate::models::{
    CanonicalTemplate, Cluster, ClusterAssignment, ClusterId, EvolutionEvent, Prompt, PromptId,
    TemplateId,
};

/// Trait for record store backends.
///
/// Implementations should be thread-safe (`Send + Sync`) and are shared via
/// `Arc<dyn RecordStore>` across concurrent ingestion tasks.
pub trait RecordStore: Send + Sync {
    /// Inserts a prompt row.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    fn insert_prompt(&self, prompt: &Prompt) -> Result<()>;

    /// Fetches a prompt by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_prompt(&self, id: &PromptId) -> Result<Option<Prompt>>;

    /// Finds the cluster of another prompt with byte-identical content.
    ///
    /// Excludes `exclude` itself so a retried prompt never self-matches.
    /// Only prompts that already have a cluster assignment count.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn find_exact_content(&self, content: &str, exclude: &PromptId) -> Result<Option<ClusterId>>;

    /// Fetches a cluster by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_cluster(&self, id: &ClusterId) -> Result<Option<Cluster>>;

    /// Creates a cluster and its triggering assignment in one transaction.
    ///
    /// Either both commit or neither does: no cluster ever exists without at
    /// least the seeding assignment. If another cluster with the same
    /// `seed_fingerprint` already exists (a concurrent creation or a caller
    /// retry), the insert collapses onto that row: the assignment is recorded
    /// against the existing cluster and the existing cluster is returned.
    /// The near-identical-content race (two prompts that are semantically
    /// equal but not byte-identical) is accepted and left to asynchronous
    /// deduplication.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    fn create_cluster_with_assignment(
        &self,
        cluster: &Cluster,
        assignment: &ClusterAssignment,
    ) -> Result<Cluster>;

    /// Records an assignment against an existing cluster.
    ///
    /// Touches the cluster's `updated_at` in the same transaction. Re-recording
    /// the same `(prompt, cluster)` pair is a no-op, keeping caller retries
    /// idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the cluster does not exist.
    fn record_assignment(&self, assignment: &ClusterAssignment) -> Result<()>;

    /// Returns all prompts assigned to a cluster, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn prompts_in_cluster(&self, cluster_id: &ClusterId) -> Result<Vec<Prompt>>;

    /// Deletes a cluster, cascading to its assignments and templates.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete_cluster(&self, id: &ClusterId) -> Result<bool>;

    /// Inserts a template version together with its slots, transactionally.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    fn insert_template(&self, template: &CanonicalTemplate) -> Result<()>;

    /// Fetches a template (with slots) by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_template(&self, id: &TemplateId) -> Result<Option<CanonicalTemplate>>;

    /// Returns all template versions for a cluster, in insertion order.
    ///
    /// Semantic-version ordering is the versioning engine's concern.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn templates_for_cluster(&self, cluster_id: &ClusterId) -> Result<Vec<CanonicalTemplate>>;

    /// Deletes a template, cascading to its slots and evolution events.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete_template(&self, id: &TemplateId) -> Result<bool>;

    /// Appends an evolution event.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    fn record_event(&self, event: &EvolutionEvent) -> Result<()>;

    /// Returns a template's evolution events in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn events_for_template(&self, template_id: &TemplateId) -> Result<Vec<EvolutionEvent>>;
}
