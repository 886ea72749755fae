//! Semantic drift detection.
//!
//! Thin orchestration over a [`ReasoningProvider`]: gathers a cluster's
//! recent prompts, asks the provider whether they still fit the canonical
//! template, and parses the structured verdict. Detected drift is appended to
//! the template's evolution history; acting on it (re-extraction, new
//! versions) is left to upstream pipelines.

use crate::config::DriftConfig;
use crate::llm::{ReasoningProvider, extract_json_object};
use crate::models::{CanonicalTemplate, ClusterId, TemplateId};
use crate::services::versioning::TemplateVersioningEngine;
use crate::storage::traits::RecordStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

const ANALYSIS_SYSTEM_PROMPT: &str = "You analyze whether recent prompts in a cluster have \
drifted from the cluster's canonical template. Respond with a JSON object: \
{\"has_drift\": bool, \"drift_score\": number in [0,1], \"reasoning\": string, \
\"detected_changes\": [string], \"recommendation\": \
\"none\" | \"update_template\" | \"create_new_template\"}.";

/// What to do about detected drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftRecommendation {
    /// No action needed.
    #[default]
    None,
    /// Re-extract and bump the existing template.
    UpdateTemplate,
    /// The cluster has diverged enough to warrant a separate template.
    CreateNewTemplate,
}

/// Structured drift verdict from the reasoning provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftReport {
    /// Whether recent prompts have drifted from the template.
    pub has_drift: bool,
    /// Drift magnitude in `[0, 1]`.
    pub drift_score: f32,
    /// The provider's explanation.
    pub reasoning: String,
    /// Specific changes the provider noticed.
    #[serde(default)]
    pub detected_changes: Vec<String>,
    /// Suggested follow-up action.
    #[serde(default)]
    pub recommendation: DriftRecommendation,
}

impl DriftReport {
    /// A no-drift report with the given reasoning.
    fn none(reasoning: impl Into<String>) -> Self {
        Self {
            has_drift: false,
            drift_score: 0.0,
            reasoning: reasoning.into(),
            detected_changes: Vec::new(),
            recommendation: DriftRecommendation::None,
        }
    }
}

/// Monitor that checks clusters for semantic drift.
pub struct DriftMonitor {
    store: Arc<dyn RecordStore>,
    provider: Arc<dyn ReasoningProvider>,
    versioning: TemplateVersioningEngine,
    config: DriftConfig,
}

impl DriftMonitor {
    /// Creates a monitor over the given store and reasoning provider.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        provider: Arc<dyn ReasoningProvider>,
        config: DriftConfig,
    ) -> Self {
        let versioning = TemplateVersioningEngine::new(Arc::clone(&store));
        Self {
            store,
            provider,
            versioning,
            config,
        }
    }

    /// Analyzes a cluster for drift against a template.
    ///
    /// Uses the given template, or the cluster's latest version when `None`.
    /// Clusters with fewer than the configured minimum of prompts produce a
    /// no-drift report; analysis on a handful of prompts is noise. When drift
    /// is detected, a `DriftDetected` event is appended to the template's
    /// history before the report is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the cluster or template does not exist,
    /// [`Error::OperationFailed`] if the provider call fails or returns an
    /// unparseable verdict.
    #[instrument(skip(self), fields(cluster_id = %cluster_id))]
    pub fn detect_drift(
        &self,
        cluster_id: &ClusterId,
        template_id: Option<&TemplateId>,
    ) -> Result<DriftReport> {
        if self.store.get_cluster(cluster_id)?.is_none() {
            return Err(Error::NotFound {
                entity: "cluster",
                id: cluster_id.as_str().to_string(),
            });
        }

        let template = match template_id {
            Some(id) => self
                .store
                .get_template(id)?
                .ok_or_else(|| Error::NotFound {
                    entity: "template",
                    id: id.as_str().to_string(),
                })?,
            None => self
                .versioning
                .latest_version(cluster_id)?
                .ok_or_else(|| Error::NotFound {
                    entity: "template",
                    id: cluster_id.as_str().to_string(),
                })?,
        };

        let mut prompts = self.store.prompts_in_cluster(cluster_id)?;
        prompts.truncate(self.config.recent_prompts);
        if prompts.len() < self.config.min_prompts {
            tracing::debug!(count = prompts.len(), "insufficient prompts for drift analysis");
            return Ok(DriftReport::none("insufficient prompts for drift analysis"));
        }

        let analysis_prompt = Self::build_analysis_prompt(
            &template,
            prompts.iter().map(|p| p.content.as_str()),
        );
        let response = self
            .provider
            .complete_with_system(ANALYSIS_SYSTEM_PROMPT, &analysis_prompt)?;

        let json = extract_json_object(&response)?;
        let mut report: DriftReport =
            serde_json::from_str(&json).map_err(|e| Error::OperationFailed {
                operation: "parse_drift_report".to_string(),
                cause: e.to_string(),
            })?;
        report.drift_score = report.drift_score.clamp(0.0, 1.0);

        metrics::counter!(
            "drift_checks_total",
            "outcome" => if report.has_drift { "drift" } else { "stable" }
        )
        .increment(1);

        if report.has_drift {
            tracing::info!(
                template_id = %template.id,
                drift_score = report.drift_score,
                "drift detected"
            );
            self.versioning
                .record_drift_event(&template.id, &report, self.provider.name())?;
        }

        Ok(report)
    }

    /// Runs drift detection over many clusters against their latest templates.
    ///
    /// One cluster's failure never aborts the batch; each result carries its
    /// own outcome.
    pub fn detect_drift_batch(
        &self,
        cluster_ids: &[ClusterId],
    ) -> Vec<(ClusterId, Result<DriftReport>)> {
        cluster_ids
            .iter()
            .map(|id| (id.clone(), self.detect_drift(id, None)))
            .collect()
    }

    /// Builds the analysis prompt from the template and recent prompts.
    fn build_analysis_prompt<'a>(
        template: &CanonicalTemplate,
        prompts: impl Iterator<Item = &'a str>,
    ) -> String {
        let slots = serde_json::json!(
            template
                .slots
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "name": s.name,
                        "slot_type": s.slot_type,
                    })
                })
                .collect::<Vec<_>>()
        );

        let mut out = format!(
            "Canonical template (version {}):\n{}\n\nSlots: {}\n\nRecent prompts:\n",
            template.version, template.content, slots
        );
        for (i, prompt) in prompts.enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, prompt));
        }
        out
    }
}
