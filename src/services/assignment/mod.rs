//! Cluster assignment engine.
//!
//! Decides which semantic cluster an incoming prompt belongs to:
//! 1. **Exact match**: byte-identical content of an already-assigned prompt
//! 2. **Vector match**: candidate gathering, per-cluster max aggregation,
//!    cache-authoritative scoring, threshold decision
//! 3. **New cluster**: fallback when nothing clears the threshold
//!
//! Uses short-circuit evaluation, returning on the first decisive path.

mod candidates;
mod engine;
mod exact;
mod types;

pub use engine::ClusterAssignmentEngine;
pub use types::AssignmentResult;
