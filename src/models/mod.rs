//! Data models for promptcluster.
//!
//! This module contains all the core data structures used throughout the system.

mod cluster;
mod events;
mod ids;
mod prompt;
mod template;

pub use cluster::{Cluster, ClusterAssignment};
pub use events::{EvolutionEvent, EvolutionEventKind};
pub use ids::{ClusterId, EventId, PromptId, TemplateId};
pub use prompt::{ModerationStatus, Prompt};
pub use template::{CanonicalTemplate, ChangeKind, SemanticVersion, TemplateSlot};
