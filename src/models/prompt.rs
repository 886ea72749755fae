//! Prompt entity.

use super::PromptId;

/// Moderation verdict attached to a prompt at ingestion time.
///
/// Moderation itself happens upstream; the core only records the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModerationStatus {
    /// Not yet reviewed.
    #[default]
    Pending,
    /// Passed moderation.
    Approved,
    /// Flagged by moderation.
    Flagged,
}

impl ModerationStatus {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Flagged => "flagged",
        }
    }

    /// Parses a status string, defaulting to `Pending` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "approved" => Self::Approved,
            "flagged" => Self::Flagged,
            _ => Self::Pending,
        }
    }
}

/// A raw ingested prompt.
///
/// Content is immutable after creation; a prompt is only ever removed through
/// cascading cluster deletion.
#[derive(Debug, Clone)]
pub struct Prompt {
    /// Unique identifier.
    pub id: PromptId,
    /// The prompt text, never mutated after ingestion.
    pub content: String,
    /// Moderation verdict tag.
    pub moderation_status: ModerationStatus,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
    /// Last update timestamp (Unix epoch seconds).
    pub updated_at: u64,
}

impl Prompt {
    /// Creates a prompt with a generated id and current timestamps.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        let now = crate::current_timestamp();
        Self {
            id: PromptId::generate(),
            content: content.into(),
            moderation_status: ModerationStatus::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moderation_status_roundtrip() {
        for status in [
            ModerationStatus::Pending,
            ModerationStatus::Approved,
            ModerationStatus::Flagged,
        ] {
            assert_eq!(ModerationStatus::parse(status.as_str()), status);
        }
        assert_eq!(ModerationStatus::parse("garbage"), ModerationStatus::Pending);
    }

    #[test]
    fn test_new_prompt_defaults() {
        let p = Prompt::new("Translate to French");
        assert_eq!(p.content, "Translate to French");
        assert_eq!(p.moderation_status, ModerationStatus::Pending);
        assert_eq!(p.created_at, p.updated_at);
    }
}
