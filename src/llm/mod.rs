//! Reasoning provider abstraction.
//!
//! Provides a unified interface for the external reasoning models the drift
//! layer consults. How completions are computed is out of scope; providers are
//! black boxes behind [`ReasoningProvider`].

use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Matches a fenced ```json block; reasoning models often wrap their output.
static JSON_FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)] // pattern is a compile-time constant
    Regex::new(r"(?s)```json\s*(.*?)```").unwrap()
});

/// Matches a bare JSON object anywhere in the response.
static JSON_OBJECT_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)] // pattern is a compile-time constant
    Regex::new(r"(?s)\{.*\}").unwrap()
});

/// Trait for reasoning providers.
pub trait ReasoningProvider: Send + Sync {
    /// The provider name, recorded as the detecting agent on drift events.
    fn name(&self) -> &'static str;

    /// Generates a completion for the given prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    fn complete(&self, prompt: &str) -> Result<String>;

    /// Generates a completion with a system prompt.
    ///
    /// Default implementation concatenates system and user prompts.
    /// Providers should override this to use native system prompt support.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    fn complete_with_system(&self, system: &str, user: &str) -> Result<String> {
        let combined = format!("{system}\n\n---\n\nUser message:\n{user}");
        self.complete(&combined)
    }
}

/// Extracts a JSON object from a model response.
///
/// Tolerates markdown ```json fences and surrounding prose; falls back to the
/// first `{...}` span in the response.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if no JSON object can be located.
pub fn extract_json_object(response: &str) -> Result<String> {
    if let Some(caps) = JSON_FENCE_RE.captures(response) {
        if let Some(inner) = caps.get(1) {
            return Ok(inner.as_str().trim().to_string());
        }
    }

    JSON_OBJECT_RE
        .find(response)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::OperationFailed {
            operation: "extract_json_object".to_string(),
            cause: "no JSON object found in provider response".to_string(),
        })
}
