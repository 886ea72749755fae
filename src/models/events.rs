//! Template evolution events.

use super::{EventId, SemanticVersion, TemplateId};

/// The kind of a template evolution event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvolutionEventKind {
    /// Template created (first version).
    Created,
    /// Template updated (any version bump).
    Updated,
    /// Variable slot added.
    SlotAdded,
    /// Variable slot removed.
    SlotRemoved,
    /// Variable slot modified.
    SlotModified,
    /// Semantic drift detected by a reasoning provider.
    DriftDetected,
    /// Version incremented without content change.
    VersionIncremented,
}

impl EvolutionEventKind {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Updated => "UPDATED",
            Self::SlotAdded => "SLOT_ADDED",
            Self::SlotRemoved => "SLOT_REMOVED",
            Self::SlotModified => "SLOT_MODIFIED",
            Self::DriftDetected => "DRIFT_DETECTED",
            Self::VersionIncremented => "VERSION_INCREMENTED",
        }
    }

    /// Parses an event kind string.
    ///
    /// Unknown kinds fall back to `Updated`, matching how stored historical
    /// kinds are tolerated on read.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "CREATED" => Self::Created,
            "SLOT_ADDED" => Self::SlotAdded,
            "SLOT_REMOVED" => Self::SlotRemoved,
            "SLOT_MODIFIED" => Self::SlotModified,
            "DRIFT_DETECTED" => Self::DriftDetected,
            "VERSION_INCREMENTED" => Self::VersionIncremented,
            _ => Self::Updated,
        }
    }

    /// Default human-readable reason for this kind.
    #[must_use]
    pub const fn default_reason(self) -> &'static str {
        match self {
            Self::Created => "Initial template creation",
            Self::Updated => "Template updated",
            Self::SlotAdded => "Variable slot added",
            Self::SlotRemoved => "Variable slot removed",
            Self::SlotModified => "Variable slot modified",
            Self::DriftDetected => "Semantic drift detected",
            Self::VersionIncremented => "Version incremented",
        }
    }
}

/// Immutable audit record of a template-version transition.
///
/// Append-only: events are never updated or deleted except by cascading
/// template deletion. Every event references the template version it
/// produced (or, for metadata events like drift, the version it concerns).
#[derive(Debug, Clone)]
pub struct EvolutionEvent {
    /// Unique identifier.
    pub id: EventId,
    /// The template version this event belongs to.
    pub template_id: TemplateId,
    /// Event kind.
    pub kind: EvolutionEventKind,
    /// Version before the transition; `None` for the first version.
    pub previous_version: Option<SemanticVersion>,
    /// Version after the transition.
    pub new_version: Option<SemanticVersion>,
    /// Reason for the change.
    pub change_reason: String,
    /// The agent that detected the change (model name or "system").
    pub detected_by: String,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
}

impl EvolutionEvent {
    /// Creates an event with a generated id and current timestamp.
    #[must_use]
    pub fn new(
        template_id: TemplateId,
        kind: EvolutionEventKind,
        previous_version: Option<SemanticVersion>,
        new_version: Option<SemanticVersion>,
        change_reason: impl Into<String>,
        detected_by: impl Into<String>,
    ) -> Self {
        Self {
            id: EventId::generate(),
            template_id,
            kind,
            previous_version,
            new_version,
            change_reason: change_reason.into(),
            detected_by: detected_by.into(),
            created_at: crate::current_timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            EvolutionEventKind::Created,
            EvolutionEventKind::Updated,
            EvolutionEventKind::SlotAdded,
            EvolutionEventKind::SlotRemoved,
            EvolutionEventKind::SlotModified,
            EvolutionEventKind::DriftDetected,
            EvolutionEventKind::VersionIncremented,
        ] {
            assert_eq!(EvolutionEventKind::parse(kind.as_str()), kind);
        }
    }

    #[test]
    fn test_unknown_kind_falls_back_to_updated() {
        assert_eq!(
            EvolutionEventKind::parse("SOMETHING_ELSE"),
            EvolutionEventKind::Updated
        );
    }

    #[test]
    fn test_created_event_has_no_previous_version() {
        let event = EvolutionEvent::new(
            TemplateId::new("t-1"),
            EvolutionEventKind::Created,
            None,
            Some(SemanticVersion::INITIAL),
            EvolutionEventKind::Created.default_reason(),
            "system",
        );
        assert!(event.previous_version.is_none());
        assert_eq!(event.new_version, Some(SemanticVersion::INITIAL));
    }
}
