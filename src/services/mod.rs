//! Service layer: the engines that implement clustering behavior.
//!
//! Services orchestrate the storage seams and hold no mutable state of their
//! own; one instance can be shared across concurrent ingestion workers.

pub mod assignment;
pub mod drift;
pub mod versioning;

pub use assignment::{AssignmentResult, ClusterAssignmentEngine};
pub use drift::{DriftMonitor, DriftRecommendation, DriftReport};
pub use versioning::{SlotDraft, TemplateDraft, TemplateVersioningEngine};
