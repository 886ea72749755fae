//! Identifier newtypes.
//!
//! Each entity gets its own id wrapper so a `PromptId` can never be passed
//! where a `ClusterId` is expected. Ids are UUID v4 strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptId(String);

/// Unique identifier for a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(String);

/// Unique identifier for a canonical template version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

/// Unique identifier for an evolution event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

macro_rules! impl_id {
    ($name:ident) => {
        impl $name {
            /// Creates an id from an existing string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generates a fresh random id.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Returns the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

impl_id!(PromptId);
impl_id!(ClusterId);
impl_id!(TemplateId);
impl_id!(EventId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = PromptId::new("p-1");
        assert_eq!(id.as_str(), "p-1");
        assert_eq!(id.to_string(), "p-1");
        assert_eq!(PromptId::from("p-1"), id);
    }

    #[test]
    fn test_generate_is_unique() {
        assert_ne!(ClusterId::generate(), ClusterId::generate());
    }
}
