//! Canonical template entities and semantic versioning.

use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

use super::{ClusterId, TemplateId};

/// Strict `MAJOR.MINOR.PATCH` pattern. No pre-release or build metadata.
static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)] // pattern is a compile-time constant
    Regex::new(r"^(\d+)\.(\d+)\.(\d+)$").unwrap()
});

/// The kind of change between two template versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Template text changed and the slot-name set changed.
    Major,
    /// Slot-name set changed but the text shape is reused.
    Minor,
    /// Only slot metadata (type, examples, confidence) changed.
    Patch,
}

impl ChangeKind {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        }
    }
}

/// A parsed `MAJOR.MINOR.PATCH` version.
///
/// Ordering is by `(major, minor, patch)` tuple, which is what template
/// version listings sort by — never insertion time, since out-of-order
/// recomputation is possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemanticVersion {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Patch component.
    pub patch: u32,
}

impl SemanticVersion {
    /// The first version assigned to any template: `1.0.0`.
    pub const INITIAL: Self = Self {
        major: 1,
        minor: 0,
        patch: 0,
    };

    /// Creates a version from components.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Returns the incremented version for the given change kind.
    ///
    /// Major bumps reset minor and patch; minor bumps reset patch.
    #[must_use]
    pub const fn bump(self, kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::Major => Self::new(self.major + 1, 0, 0),
            ChangeKind::Minor => Self::new(self.major, self.minor + 1, 0),
            ChangeKind::Patch => Self::new(self.major, self.minor, self.patch + 1),
        }
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SemanticVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = VERSION_RE
            .captures(s)
            .ok_or_else(|| Error::InvalidVersion(s.to_string()))?;

        let part = |i: usize| -> Result<u32> {
            caps.get(i)
                .map(|m| m.as_str())
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| Error::InvalidVersion(s.to_string()))
        };

        Ok(Self {
            major: part(1)?,
            minor: part(2)?,
            patch: part(3)?,
        })
    }
}

/// A named variable slot belonging to one template version.
#[derive(Debug, Clone)]
pub struct TemplateSlot {
    /// The slot name as it appears in the template text.
    pub name: String,
    /// Inferred type, when one was detected (e.g. "string", "number").
    pub slot_type: Option<String>,
    /// Example values observed for this slot.
    pub example_values: Vec<String>,
    /// Confidence score for the slot detection.
    pub confidence_score: f32,
}

/// A versioned snapshot of a cluster's extracted structure.
///
/// Multiple versions exist per cluster, ordered by semantic version.
#[derive(Debug, Clone)]
pub struct CanonicalTemplate {
    /// Unique identifier.
    pub id: TemplateId,
    /// The cluster this template describes.
    pub cluster_id: ClusterId,
    /// Template text with named `{{slot}}` markers.
    pub content: String,
    /// Semantic version of this snapshot.
    pub version: SemanticVersion,
    /// Variable slots for this version.
    pub slots: Vec<TemplateSlot>,
    /// Confidence score for the extraction.
    pub confidence_score: f32,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
}

impl CanonicalTemplate {
    /// Returns the sorted slot names for set comparisons.
    #[must_use]
    pub fn slot_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.slots.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_parse_valid() {
        let v: SemanticVersion = "1.2.3".parse().unwrap();
        assert_eq!(v, SemanticVersion::new(1, 2, 3));
        assert_eq!(v.to_string(), "1.2.3");
    }

    #[test_case("1.2"; "missing patch")]
    #[test_case("v1.2.3"; "prefixed")]
    #[test_case("1.2.3-beta"; "pre-release suffix")]
    #[test_case("1..3"; "empty component")]
    #[test_case(""; "empty string")]
    fn test_parse_invalid(input: &str) {
        assert!(matches!(
            input.parse::<SemanticVersion>(),
            Err(Error::InvalidVersion(_))
        ));
    }

    #[test_case(ChangeKind::Major, SemanticVersion::new(2, 0, 0); "major resets minor and patch")]
    #[test_case(ChangeKind::Minor, SemanticVersion::new(1, 3, 0); "minor resets patch")]
    #[test_case(ChangeKind::Patch, SemanticVersion::new(1, 2, 4); "patch increments")]
    fn test_bump(kind: ChangeKind, expected: SemanticVersion) {
        assert_eq!(SemanticVersion::new(1, 2, 3).bump(kind), expected);
    }

    #[test]
    fn test_ordering_is_by_tuple() {
        let mut versions = vec![
            SemanticVersion::new(1, 0, 0),
            SemanticVersion::new(2, 0, 0),
            SemanticVersion::new(1, 1, 0),
        ];
        versions.sort();
        assert_eq!(
            versions,
            vec![
                SemanticVersion::new(1, 0, 0),
                SemanticVersion::new(1, 1, 0),
                SemanticVersion::new(2, 0, 0),
            ]
        );
    }
}
