//! Template versioning engine.
//!
//! Evolves one canonical template per cluster through semantic versions.
//! The bump kind is derived from what actually changed between the previous
//! and the new extraction: template text plus slot-name set → major, slot-name
//! set alone → minor, anything else → patch. Every version transition appends
//! an evolution event referencing the newly created template.

use crate::models::{
    CanonicalTemplate, ChangeKind, Cluster, ClusterId, EvolutionEvent, EvolutionEventKind,
    SemanticVersion, TemplateId, TemplateSlot,
};
use crate::services::drift::DriftReport;
use crate::storage::traits::RecordStore;
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;

/// A slot as proposed by upstream extraction, before persistence.
#[derive(Debug, Clone)]
pub struct SlotDraft {
    /// Slot name as it appears in the template text.
    pub name: String,
    /// Inferred type, when one was detected.
    pub slot_type: Option<String>,
    /// Example values observed for this slot.
    pub example_values: Vec<String>,
    /// Confidence score for the slot detection.
    pub confidence_score: f32,
}

/// A proposed template version, before persistence.
#[derive(Debug, Clone)]
pub struct TemplateDraft {
    /// The cluster this template describes.
    pub cluster_id: ClusterId,
    /// Template text with named `{{slot}}` markers.
    pub content: String,
    /// Proposed variable slots.
    pub slots: Vec<SlotDraft>,
    /// The version this draft evolves from; `None` for a cluster's first
    /// template.
    pub previous_template_id: Option<TemplateId>,
    /// Reason recorded on the evolution event; defaults per event kind.
    pub change_reason: Option<String>,
    /// The agent that produced the draft; defaults to "system".
    pub detected_by: Option<String>,
}

/// Engine that creates and orders template versions.
pub struct TemplateVersioningEngine {
    store: Arc<dyn RecordStore>,
}

impl TemplateVersioningEngine {
    /// Creates an engine over the given record store.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Persists a new template version derived from a draft.
    ///
    /// Without a previous template the version is `1.0.0` and a `Created`
    /// event is appended. With one, the bump kind follows the slot-name and
    /// text diff and an `Updated` event cites it. Template and slots commit
    /// in one transaction; the event is appended after.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for empty content,
    /// [`Error::NotFound`] when the cluster or the referenced previous
    /// template does not exist.
    #[instrument(skip(self, draft), fields(cluster_id = %draft.cluster_id))]
    pub fn create_version(&self, draft: TemplateDraft) -> Result<CanonicalTemplate> {
        if draft.content.trim().is_empty() {
            return Err(Error::InvalidInput("template content is empty".to_string()));
        }
        self.require_cluster(&draft.cluster_id)?;

        let previous = match &draft.previous_template_id {
            Some(id) => Some(self.require_template(id)?),
            None => None,
        };

        let (version, previous_version, kind) = match &previous {
            None => (SemanticVersion::INITIAL, None, None),
            Some(prev) => {
                let change = Self::classify_change(prev, &draft);
                (prev.version.bump(change), Some(prev.version), Some(change))
            },
        };

        let template = CanonicalTemplate {
            id: TemplateId::generate(),
            cluster_id: draft.cluster_id.clone(),
            content: draft.content.clone(),
            version,
            slots: draft
                .slots
                .iter()
                .map(|s| TemplateSlot {
                    name: s.name.clone(),
                    slot_type: s.slot_type.clone(),
                    example_values: s.example_values.clone(),
                    confidence_score: s.confidence_score,
                })
                .collect(),
            confidence_score: Self::draft_confidence(&draft),
            created_at: crate::current_timestamp(),
        };
        self.store.insert_template(&template)?;

        let event_kind = if previous.is_some() {
            EvolutionEventKind::Updated
        } else {
            EvolutionEventKind::Created
        };
        let reason = draft.change_reason.unwrap_or_else(|| {
            kind.map_or_else(
                || event_kind.default_reason().to_string(),
                |k| format!("{} version bump to {version}", k.as_str()),
            )
        });
        let event = EvolutionEvent::new(
            template.id.clone(),
            event_kind,
            previous_version,
            Some(version),
            reason,
            draft.detected_by.unwrap_or_else(|| "system".to_string()),
        );
        self.store.record_event(&event)?;

        tracing::info!(
            template_id = %template.id,
            version = %template.version,
            "created template version"
        );
        metrics::counter!("template_versions_total", "kind" => kind.map_or("initial", ChangeKind::as_str))
            .increment(1);
        Ok(template)
    }

    /// Returns all template versions for a cluster, ordered by parsed
    /// semantic version rather than insertion time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the cluster does not exist.
    pub fn template_versions(&self, cluster_id: &ClusterId) -> Result<Vec<CanonicalTemplate>> {
        self.require_cluster(cluster_id)?;
        let mut templates = self.store.templates_for_cluster(cluster_id)?;
        templates.sort_by_key(|t| t.version);
        Ok(templates)
    }

    /// Returns the highest-versioned template for a cluster, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the cluster does not exist.
    pub fn latest_version(&self, cluster_id: &ClusterId) -> Result<Option<CanonicalTemplate>> {
        Ok(self.template_versions(cluster_id)?.pop())
    }

    /// Returns a template's evolution events in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the template does not exist.
    pub fn evolution_history(&self, template_id: &TemplateId) -> Result<Vec<EvolutionEvent>> {
        self.require_template(template_id)?;
        self.store.events_for_template(template_id)
    }

    /// Appends a `DriftDetected` event carrying the drift score.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the template does not exist.
    #[instrument(skip(self, report), fields(template_id = %template_id))]
    pub fn record_drift_event(
        &self,
        template_id: &TemplateId,
        report: &DriftReport,
        detected_by: &str,
    ) -> Result<EvolutionEvent> {
        let template = self.require_template(template_id)?;

        let reason = format!(
            "Semantic drift detected (score {:.2}): {}",
            report.drift_score, report.reasoning
        );
        let event = EvolutionEvent::new(
            template.id,
            EvolutionEventKind::DriftDetected,
            None,
            Some(template.version),
            reason,
            detected_by,
        );
        self.store.record_event(&event)?;
        metrics::counter!("drift_events_total").increment(1);
        Ok(event)
    }

    /// Classifies the change between the previous template and a draft.
    fn classify_change(previous: &CanonicalTemplate, draft: &TemplateDraft) -> ChangeKind {
        let previous_slots: BTreeSet<&str> =
            previous.slots.iter().map(|s| s.name.as_str()).collect();
        let draft_slots: BTreeSet<&str> = draft.slots.iter().map(|s| s.name.as_str()).collect();

        let slots_changed = previous_slots != draft_slots;
        let text_changed = previous.content != draft.content;

        if text_changed && slots_changed {
            ChangeKind::Major
        } else if slots_changed {
            ChangeKind::Minor
        } else {
            ChangeKind::Patch
        }
    }

    /// Confidence for a draft: mean slot confidence, 1.0 when slotless.
    #[allow(clippy::cast_precision_loss)]
    fn draft_confidence(draft: &TemplateDraft) -> f32 {
        if draft.slots.is_empty() {
            return 1.0;
        }
        let sum: f32 = draft.slots.iter().map(|s| s.confidence_score).sum();
        sum / draft.slots.len() as f32
    }

    fn require_cluster(&self, id: &ClusterId) -> Result<Cluster> {
        self.store.get_cluster(id)?.ok_or_else(|| Error::NotFound {
            entity: "cluster",
            id: id.as_str().to_string(),
        })
    }

    fn require_template(&self, id: &TemplateId) -> Result<CanonicalTemplate> {
        self.store
            .get_template(id)?
            .ok_or_else(|| Error::NotFound {
                entity: "template",
                id: id.as_str().to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClusterAssignment, Prompt};
    use crate::storage::content_fingerprint;
    use crate::storage::sqlite::SqliteRecordStore;

    fn setup() -> (TemplateVersioningEngine, Arc<SqliteRecordStore>, ClusterId) {
        let store = Arc::new(SqliteRecordStore::in_memory().unwrap());

        let prompt = Prompt::new("Translate {{text}} to {{language}}");
        store.insert_prompt(&prompt).unwrap();
        let cluster = Cluster::seeded_by(
            prompt.id.clone(),
            content_fingerprint(&prompt.content),
            0.85,
        );
        let assignment = ClusterAssignment::new(
            prompt.id.clone(),
            cluster.id.clone(),
            1.0,
            1.0,
            "no existing match above threshold",
        );
        let cluster = store
            .create_cluster_with_assignment(&cluster, &assignment)
            .unwrap();

        let engine = TemplateVersioningEngine::new(Arc::clone(&store) as Arc<dyn RecordStore>);
        (engine, store, cluster.id)
    }

    fn slot(name: &str) -> SlotDraft {
        SlotDraft {
            name: name.to_string(),
            slot_type: Some("string".to_string()),
            example_values: vec![],
            confidence_score: 0.9,
        }
    }

    fn draft(
        cluster_id: &ClusterId,
        content: &str,
        slots: Vec<SlotDraft>,
        previous: Option<TemplateId>,
    ) -> TemplateDraft {
        TemplateDraft {
            cluster_id: cluster_id.clone(),
            content: content.to_string(),
            slots,
            previous_template_id: previous,
            change_reason: None,
            detected_by: None,
        }
    }

    #[test]
    fn test_first_version_is_1_0_0_with_created_event() {
        let (engine, _, cluster_id) = setup();

        let template = engine
            .create_version(draft(&cluster_id, "Translate {{a}}", vec![slot("a")], None))
            .unwrap();
        assert_eq!(template.version, SemanticVersion::INITIAL);

        let events = engine.evolution_history(&template.id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EvolutionEventKind::Created);
        assert_eq!(events[0].template_id, template.id);
        assert!(events[0].previous_version.is_none());
        assert_eq!(events[0].new_version, Some(SemanticVersion::INITIAL));
    }

    #[test]
    fn test_slot_set_change_is_minor() {
        let (engine, _, cluster_id) = setup();
        let content = "Translate {{a}} and {{b}}";

        let v1 = engine
            .create_version(draft(&cluster_id, content, vec![slot("a"), slot("b")], None))
            .unwrap();
        // Same text, slot set {a,b} -> {a,b,c}
        let v2 = engine
            .create_version(draft(
                &cluster_id,
                content,
                vec![slot("a"), slot("b"), slot("c")],
                Some(v1.id),
            ))
            .unwrap();

        assert_eq!(v2.version, SemanticVersion::new(1, 1, 0));
    }

    #[test]
    fn test_text_and_slot_change_is_major() {
        let (engine, _, cluster_id) = setup();

        let v1 = engine
            .create_version(draft(
                &cluster_id,
                "Translate {{a}}",
                vec![slot("a")],
                None,
            ))
            .unwrap();
        let v2 = engine
            .create_version(draft(
                &cluster_id,
                "Rewrite {{b}} formally",
                vec![slot("b")],
                Some(v1.id),
            ))
            .unwrap();

        assert_eq!(v2.version, SemanticVersion::new(2, 0, 0));
    }

    #[test]
    fn test_metadata_only_change_is_patch() {
        let (engine, _, cluster_id) = setup();
        let content = "Translate {{a}}";

        let v1 = engine
            .create_version(draft(&cluster_id, content, vec![slot("a")], None))
            .unwrap();
        let mut refined = slot("a");
        refined.slot_type = Some("text".to_string());
        let v2 = engine
            .create_version(draft(&cluster_id, content, vec![refined], Some(v1.id)))
            .unwrap();

        assert_eq!(v2.version, SemanticVersion::new(1, 0, 1));

        let events = engine.evolution_history(&v2.id).unwrap();
        assert_eq!(events[0].kind, EvolutionEventKind::Updated);
        assert_eq!(events[0].previous_version, Some(SemanticVersion::INITIAL));
    }

    #[test]
    fn test_text_only_change_is_patch() {
        let (engine, _, cluster_id) = setup();

        let v1 = engine
            .create_version(draft(&cluster_id, "Translate {{a}}", vec![slot("a")], None))
            .unwrap();
        let v2 = engine
            .create_version(draft(
                &cluster_id,
                "Please translate {{a}}",
                vec![slot("a")],
                Some(v1.id),
            ))
            .unwrap();

        assert_eq!(v2.version, SemanticVersion::new(1, 0, 1));
    }

    #[test]
    fn test_versions_ordered_by_semver_not_insertion() {
        let (engine, store, cluster_id) = setup();

        // Insert out of order directly through the store
        for v in ["1.0.0", "2.0.0", "1.1.0"] {
            let template = CanonicalTemplate {
                id: TemplateId::generate(),
                cluster_id: cluster_id.clone(),
                content: "{{x}}".to_string(),
                version: v.parse().unwrap(),
                slots: vec![],
                confidence_score: 1.0,
                created_at: crate::current_timestamp(),
            };
            store.insert_template(&template).unwrap();
        }

        let ordered: Vec<String> = engine
            .template_versions(&cluster_id)
            .unwrap()
            .iter()
            .map(|t| t.version.to_string())
            .collect();
        assert_eq!(ordered, vec!["1.0.0", "1.1.0", "2.0.0"]);

        let latest = engine.latest_version(&cluster_id).unwrap().unwrap();
        assert_eq!(latest.version, SemanticVersion::new(2, 0, 0));
    }

    #[test]
    fn test_missing_previous_template_is_not_found() {
        let (engine, _, cluster_id) = setup();

        let result = engine.create_version(draft(
            &cluster_id,
            "Translate {{a}}",
            vec![slot("a")],
            Some(TemplateId::new("vanished")),
        ));
        assert!(matches!(
            result,
            Err(Error::NotFound { entity: "template", .. })
        ));
    }

    #[test]
    fn test_missing_cluster_is_not_found() {
        let (engine, _, _) = setup();

        let result = engine.create_version(draft(
            &ClusterId::new("missing"),
            "Translate {{a}}",
            vec![],
            None,
        ));
        assert!(matches!(
            result,
            Err(Error::NotFound { entity: "cluster", .. })
        ));
    }

    #[test]
    fn test_empty_content_rejected() {
        let (engine, _, cluster_id) = setup();
        let result = engine.create_version(draft(&cluster_id, "  ", vec![], None));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_record_drift_event() {
        let (engine, _, cluster_id) = setup();

        let template = engine
            .create_version(draft(&cluster_id, "Translate {{a}}", vec![slot("a")], None))
            .unwrap();

        let report = DriftReport {
            has_drift: true,
            drift_score: 0.72,
            reasoning: "recent prompts ask for tone adjustment".to_string(),
            detected_changes: vec!["new tone slot".to_string()],
            recommendation: crate::services::drift::DriftRecommendation::UpdateTemplate,
        };
        let event = engine
            .record_drift_event(&template.id, &report, "reasoner-v1")
            .unwrap();

        assert_eq!(event.kind, EvolutionEventKind::DriftDetected);
        assert!(event.change_reason.contains("0.72"));
        assert_eq!(event.detected_by, "reasoner-v1");

        let history = engine.evolution_history(&template.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].kind, EvolutionEventKind::DriftDetected);
    }
}
