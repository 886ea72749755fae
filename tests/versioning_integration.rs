//! End-to-end template versioning and drift scenarios.

use promptcluster::models::{
    CanonicalTemplate, Cluster, ClusterAssignment, EvolutionEventKind, Prompt, SemanticVersion,
    TemplateId,
};
use promptcluster::storage::content_fingerprint;
use promptcluster::storage::sqlite::SqliteRecordStore;
use promptcluster::storage::RecordStore;
use promptcluster::{
    ClusterId, SlotDraft, TemplateDraft, TemplateVersioningEngine,
};
use std::sync::Arc;

fn seeded_store() -> (Arc<SqliteRecordStore>, ClusterId) {
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
    (store, cluster.id)
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
fn template_lifecycle_walks_through_bump_kinds() {
    let (store, cluster_id) = seeded_store();
    let engine = TemplateVersioningEngine::new(Arc::clone(&store) as Arc<dyn RecordStore>);

    // First extraction: 1.0.0
    let v1 = engine
        .create_version(draft(
            &cluster_id,
            "Translate {{text}} to {{language}}",
            vec![slot("text"), slot("language")],
            None,
        ))
        .unwrap();
    assert_eq!(v1.version, SemanticVersion::INITIAL);

    // Slot added, same text: minor
    let v2 = engine
        .create_version(draft(
            &cluster_id,
            "Translate {{text}} to {{language}}",
            vec![slot("text"), slot("language"), slot("tone")],
            Some(v1.id.clone()),
        ))
        .unwrap();
    assert_eq!(v2.version, SemanticVersion::new(1, 1, 0));

    // Text reworked with a different slot set: major
    let v3 = engine
        .create_version(draft(
            &cluster_id,
            "Rewrite {{text}} in {{style}}",
            vec![slot("text"), slot("style")],
            Some(v2.id.clone()),
        ))
        .unwrap();
    assert_eq!(v3.version, SemanticVersion::new(2, 0, 0));

    // Slot metadata refined only: patch
    let mut refined = slot("text");
    refined.example_values = vec!["a contract clause".to_string()];
    let v4 = engine
        .create_version(draft(
            &cluster_id,
            "Rewrite {{text}} in {{style}}",
            vec![refined, slot("style")],
            Some(v3.id.clone()),
        ))
        .unwrap();
    assert_eq!(v4.version, SemanticVersion::new(2, 0, 1));

    // Each transition left an event on its new template
    assert_eq!(
        engine.evolution_history(&v1.id).unwrap()[0].kind,
        EvolutionEventKind::Created
    );
    for id in [&v2.id, &v3.id, &v4.id] {
        let events = engine.evolution_history(id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EvolutionEventKind::Updated);
        assert_eq!(&events[0].template_id, id);
    }
}

#[test]
fn versions_are_ordered_by_semver_not_creation() {
    let (store, cluster_id) = seeded_store();
    let engine = TemplateVersioningEngine::new(Arc::clone(&store) as Arc<dyn RecordStore>);

    for v in ["1.0.0", "2.0.0", "1.1.0"] {
        let template = CanonicalTemplate {
            id: TemplateId::generate(),
            cluster_id: cluster_id.clone(),
            content: "{{x}}".to_string(),
            version: v.parse().unwrap(),
            slots: vec![],
            confidence_score: 1.0,
            created_at: promptcluster::current_timestamp(),
        };
        store.insert_template(&template).unwrap();
    }

    let listed: Vec<String> = engine
        .template_versions(&cluster_id)
        .unwrap()
        .iter()
        .map(|t| t.version.to_string())
        .collect();
    assert_eq!(listed, vec!["1.0.0", "1.1.0", "2.0.0"]);

    assert_eq!(
        engine.latest_version(&cluster_id).unwrap().unwrap().version,
        SemanticVersion::new(2, 0, 0)
    );
}

#[test]
fn event_reasons_default_sensibly_and_accept_overrides() {
    let (store, cluster_id) = seeded_store();
    let engine = TemplateVersioningEngine::new(Arc::clone(&store) as Arc<dyn RecordStore>);

    let v1 = engine
        .create_version(draft(&cluster_id, "Translate {{a}}", vec![slot("a")], None))
        .unwrap();
    let created = &engine.evolution_history(&v1.id).unwrap()[0];
    assert_eq!(created.change_reason, "Initial template creation");
    assert_eq!(created.detected_by, "system");

    let mut custom = draft(
        &cluster_id,
        "Translate {{a}} carefully",
        vec![slot("a")],
        Some(v1.id),
    );
    custom.change_reason = Some("operator-requested rewording".to_string());
    custom.detected_by = Some("admin".to_string());
    let v2 = engine.create_version(custom).unwrap();

    let updated = &engine.evolution_history(&v2.id).unwrap()[0];
    assert_eq!(updated.change_reason, "operator-requested rewording");
    assert_eq!(updated.detected_by, "admin");
    assert_eq!(updated.previous_version, Some(SemanticVersion::INITIAL));
    assert_eq!(updated.new_version, Some(SemanticVersion::new(1, 0, 1)));
}

#[test]
fn deleting_a_template_erases_its_history() {
    let (store, cluster_id) = seeded_store();
    let engine = TemplateVersioningEngine::new(Arc::clone(&store) as Arc<dyn RecordStore>);

    let v1 = engine
        .create_version(draft(&cluster_id, "Translate {{a}}", vec![slot("a")], None))
        .unwrap();
    assert!(store.delete_template(&v1.id).unwrap());

    assert!(engine.evolution_history(&v1.id).is_err());
    assert!(engine.latest_version(&cluster_id).unwrap().is_none());
}
