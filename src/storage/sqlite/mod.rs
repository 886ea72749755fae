//! `SQLite` record store.
//!
//! Durable storage for prompts, clusters, assignments, templates, slots, and
//! evolution events. Uses WAL mode for better concurrency and a busy timeout
//! so writers wait instead of failing immediately under contention. Foreign
//! keys are enabled so cluster and template deletions cascade.

use crate::models::{
    CanonicalTemplate, Cluster, ClusterAssignment, ClusterId, EvolutionEvent, EvolutionEventKind,
    EventId, ModerationStatus, Prompt, PromptId, SemanticVersion, TemplateId, TemplateSlot,
};
use crate::storage::acquire_lock;
use crate::storage::traits::RecordStore;
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;

/// Schema for the record store.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS prompts (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    moderation_status TEXT NOT NULL DEFAULT 'pending',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_prompts_content ON prompts(content);

CREATE TABLE IF NOT EXISTS clusters (
    id TEXT PRIMARY KEY,
    name TEXT,
    seed_prompt_id TEXT,
    seed_fingerprint TEXT UNIQUE,
    similarity_threshold REAL NOT NULL,
    confidence_score REAL NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS cluster_assignments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    prompt_id TEXT NOT NULL REFERENCES prompts(id) ON DELETE CASCADE,
    cluster_id TEXT NOT NULL REFERENCES clusters(id) ON DELETE CASCADE,
    similarity_score REAL NOT NULL,
    confidence_score REAL NOT NULL,
    reasoning TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE(prompt_id, cluster_id)
);

CREATE INDEX IF NOT EXISTS idx_assignments_cluster ON cluster_assignments(cluster_id);

CREATE TABLE IF NOT EXISTS canonical_templates (
    id TEXT PRIMARY KEY,
    cluster_id TEXT NOT NULL REFERENCES clusters(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    version TEXT NOT NULL,
    confidence_score REAL NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_templates_cluster ON canonical_templates(cluster_id);

CREATE TABLE IF NOT EXISTS template_slots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    template_id TEXT NOT NULL REFERENCES canonical_templates(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    slot_type TEXT,
    example_values TEXT NOT NULL DEFAULT '[]',
    confidence_score REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_slots_template ON template_slots(template_id);

CREATE TABLE IF NOT EXISTS evolution_events (
    id TEXT PRIMARY KEY,
    template_id TEXT NOT NULL REFERENCES canonical_templates(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    previous_version TEXT,
    new_version TEXT,
    change_reason TEXT NOT NULL,
    detected_by TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_template ON evolution_events(template_id);
";

/// Builds an [`Error::OperationFailed`] from a database error.
fn op_failed(operation: &str, e: &rusqlite::Error) -> Error {
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: e.to_string(),
    }
}

/// Parses a stored version string, tolerating malformed historical rows.
fn parse_stored_version(raw: &str) -> SemanticVersion {
    raw.parse().unwrap_or_else(|_| {
        tracing::warn!(version = raw, "malformed stored template version");
        SemanticVersion::new(0, 0, 0)
    })
}

/// `SQLite`-backed [`RecordStore`] implementation.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Opens (or creates) a database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be applied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| op_failed("open_database", &e))?;
        Self::init(conn)
    }

    /// Opens an in-memory database, for tests and ephemeral use.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| op_failed("open_database", &e))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        // WAL and synchronous tuning are best-effort; in-memory databases
        // reject journal_mode changes.
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let _ = conn.pragma_update(None, "synchronous", "NORMAL");
        let _ = conn.pragma_update(None, "busy_timeout", 5000);
        // Cascade deletes depend on this one.
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(|e| op_failed("enable_foreign_keys", &e))?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| op_failed("apply_schema", &e))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn map_prompt(row: &rusqlite::Row<'_>) -> rusqlite::Result<Prompt> {
        let status: String = row.get("moderation_status")?;
        Ok(Prompt {
            id: PromptId::new(row.get::<_, String>("id")?),
            content: row.get("content")?,
            moderation_status: ModerationStatus::parse(&status),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn map_cluster(row: &rusqlite::Row<'_>) -> rusqlite::Result<Cluster> {
        Ok(Cluster {
            id: ClusterId::new(row.get::<_, String>("id")?),
            name: row.get("name")?,
            seed_prompt_id: row
                .get::<_, Option<String>>("seed_prompt_id")?
                .map(PromptId::new),
            seed_fingerprint: row.get("seed_fingerprint")?,
            similarity_threshold: row.get("similarity_threshold")?,
            confidence_score: row.get("confidence_score")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn map_template_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CanonicalTemplate> {
        let version: String = row.get("version")?;
        Ok(CanonicalTemplate {
            id: TemplateId::new(row.get::<_, String>("id")?),
            cluster_id: ClusterId::new(row.get::<_, String>("cluster_id")?),
            content: row.get("content")?,
            version: parse_stored_version(&version),
            slots: Vec::new(),
            confidence_score: row.get("confidence_score")?,
            created_at: row.get("created_at")?,
        })
    }

    fn map_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<EvolutionEvent> {
        let kind: String = row.get("kind")?;
        Ok(EvolutionEvent {
            id: EventId::new(row.get::<_, String>("id")?),
            template_id: TemplateId::new(row.get::<_, String>("template_id")?),
            kind: EvolutionEventKind::parse(&kind),
            previous_version: row
                .get::<_, Option<String>>("previous_version")?
                .map(|v| parse_stored_version(&v)),
            new_version: row
                .get::<_, Option<String>>("new_version")?
                .map(|v| parse_stored_version(&v)),
            change_reason: row.get("change_reason")?,
            detected_by: row.get("detected_by")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Loads the slots for a set of already-mapped templates.
    fn attach_slots(conn: &Connection, templates: &mut [CanonicalTemplate]) -> Result<()> {
        let mut stmt = conn
            .prepare(
                "SELECT name, slot_type, example_values, confidence_score
                 FROM template_slots WHERE template_id = ?1 ORDER BY id",
            )
            .map_err(|e| op_failed("load_slots", &e))?;

        for template in templates.iter_mut() {
            let slots = stmt
                .query_map(params![template.id.as_str()], |row| {
                    let examples: String = row.get("example_values")?;
                    Ok(TemplateSlot {
                        name: row.get("name")?,
                        slot_type: row.get("slot_type")?,
                        example_values: serde_json::from_str(&examples).unwrap_or_default(),
                        confidence_score: row.get("confidence_score")?,
                    })
                })
                .and_then(std::iter::Iterator::collect)
                .map_err(|e| op_failed("load_slots", &e))?;
            template.slots = slots;
        }
        Ok(())
    }

    /// Inserts an assignment row and touches the cluster's `updated_at`.
    ///
    /// Runs inside the caller's transaction. Re-inserting an existing
    /// `(prompt, cluster)` pair is a no-op.
    fn insert_assignment_row(
        tx: &rusqlite::Transaction<'_>,
        assignment: &ClusterAssignment,
        cluster_id: &ClusterId,
    ) -> Result<()> {
        tx.execute(
            "INSERT INTO cluster_assignments
                 (prompt_id, cluster_id, similarity_score, confidence_score, reasoning, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(prompt_id, cluster_id) DO NOTHING",
            params![
                assignment.prompt_id.as_str(),
                cluster_id.as_str(),
                assignment.similarity_score,
                assignment.confidence_score,
                assignment.reasoning,
                assignment.created_at,
            ],
        )
        .map_err(|e| op_failed("insert_assignment", &e))?;

        tx.execute(
            "UPDATE clusters SET updated_at = ?1 WHERE id = ?2",
            params![crate::current_timestamp(), cluster_id.as_str()],
        )
        .map_err(|e| op_failed("touch_cluster", &e))?;

        Ok(())
    }
}

impl RecordStore for SqliteRecordStore {
    fn insert_prompt(&self, prompt: &Prompt) -> Result<()> {
        acquire_lock(&self.conn)
            .execute(
                "INSERT INTO prompts (id, content, moderation_status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    prompt.id.as_str(),
                    prompt.content,
                    prompt.moderation_status.as_str(),
                    prompt.created_at,
                    prompt.updated_at,
                ],
            )
            .map_err(|e| op_failed("insert_prompt", &e))?;
        Ok(())
    }

    fn get_prompt(&self, id: &PromptId) -> Result<Option<Prompt>> {
        acquire_lock(&self.conn)
            .query_row(
                "SELECT id, content, moderation_status, created_at, updated_at
                 FROM prompts WHERE id = ?1",
                params![id.as_str()],
                Self::map_prompt,
            )
            .optional()
            .map_err(|e| op_failed("get_prompt", &e))
    }

    fn find_exact_content(&self, content: &str, exclude: &PromptId) -> Result<Option<ClusterId>> {
        acquire_lock(&self.conn)
            .query_row(
                "SELECT ca.cluster_id
                 FROM prompts p
                 JOIN cluster_assignments ca ON ca.prompt_id = p.id
                 WHERE p.content = ?1 AND p.id != ?2
                 LIMIT 1",
                params![content, exclude.as_str()],
                |row| row.get::<_, String>(0).map(ClusterId::new),
            )
            .optional()
            .map_err(|e| op_failed("find_exact_content", &e))
    }

    fn get_cluster(&self, id: &ClusterId) -> Result<Option<Cluster>> {
        acquire_lock(&self.conn)
            .query_row(
                "SELECT id, name, seed_prompt_id, seed_fingerprint, similarity_threshold,
                        confidence_score, created_at, updated_at
                 FROM clusters WHERE id = ?1",
                params![id.as_str()],
                Self::map_cluster,
            )
            .optional()
            .map_err(|e| op_failed("get_cluster", &e))
    }

    fn create_cluster_with_assignment(
        &self,
        cluster: &Cluster,
        assignment: &ClusterAssignment,
    ) -> Result<Cluster> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn
            .transaction()
            .map_err(|e| op_failed("create_cluster", &e))?;

        let inserted = tx
            .execute(
                "INSERT INTO clusters
                     (id, name, seed_prompt_id, seed_fingerprint, similarity_threshold,
                      confidence_score, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(seed_fingerprint) DO NOTHING",
                params![
                    cluster.id.as_str(),
                    cluster.name,
                    cluster.seed_prompt_id.as_ref().map(PromptId::as_str),
                    cluster.seed_fingerprint,
                    cluster.similarity_threshold,
                    cluster.confidence_score,
                    cluster.created_at,
                    cluster.updated_at,
                ],
            )
            .map_err(|e| op_failed("create_cluster", &e))?;

        let resolved = if inserted == 0 {
            // Another creation with the same seed fingerprint landed first.
            // Collapse onto the winner and assign there instead.
            let fingerprint = cluster.seed_fingerprint.as_deref().unwrap_or_default();
            let existing = tx
                .query_row(
                    "SELECT id, name, seed_prompt_id, seed_fingerprint, similarity_threshold,
                            confidence_score, created_at, updated_at
                     FROM clusters WHERE seed_fingerprint = ?1",
                    params![fingerprint],
                    Self::map_cluster,
                )
                .optional()
                .map_err(|e| op_failed("create_cluster", &e))?;

            existing.ok_or_else(|| Error::NotFound {
                entity: "cluster",
                id: cluster.id.as_str().to_string(),
            })?
        } else {
            cluster.clone()
        };

        Self::insert_assignment_row(&tx, assignment, &resolved.id)?;
        tx.commit().map_err(|e| op_failed("create_cluster", &e))?;
        Ok(resolved)
    }

    fn record_assignment(&self, assignment: &ClusterAssignment) -> Result<()> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn
            .transaction()
            .map_err(|e| op_failed("record_assignment", &e))?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM clusters WHERE id = ?1",
                params![assignment.cluster_id.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map_err(|e| op_failed("record_assignment", &e))?;

        if exists.is_none() {
            return Err(Error::NotFound {
                entity: "cluster",
                id: assignment.cluster_id.as_str().to_string(),
            });
        }

        Self::insert_assignment_row(&tx, assignment, &assignment.cluster_id)?;
        tx.commit().map_err(|e| op_failed("record_assignment", &e))
    }

    fn prompts_in_cluster(&self, cluster_id: &ClusterId) -> Result<Vec<Prompt>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(
                "SELECT p.id, p.content, p.moderation_status, p.created_at, p.updated_at
                 FROM prompts p
                 JOIN cluster_assignments ca ON ca.prompt_id = p.id
                 WHERE ca.cluster_id = ?1
                 ORDER BY ca.created_at DESC, ca.id DESC",
            )
            .map_err(|e| op_failed("prompts_in_cluster", &e))?;

        stmt.query_map(params![cluster_id.as_str()], Self::map_prompt)
            .and_then(std::iter::Iterator::collect)
            .map_err(|e| op_failed("prompts_in_cluster", &e))
    }

    fn delete_cluster(&self, id: &ClusterId) -> Result<bool> {
        let deleted = acquire_lock(&self.conn)
            .execute("DELETE FROM clusters WHERE id = ?1", params![id.as_str()])
            .map_err(|e| op_failed("delete_cluster", &e))?;
        Ok(deleted > 0)
    }

    fn insert_template(&self, template: &CanonicalTemplate) -> Result<()> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn
            .transaction()
            .map_err(|e| op_failed("insert_template", &e))?;

        tx.execute(
            "INSERT INTO canonical_templates
                 (id, cluster_id, content, version, confidence_score, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                template.id.as_str(),
                template.cluster_id.as_str(),
                template.content,
                template.version.to_string(),
                template.confidence_score,
                template.created_at,
            ],
        )
        .map_err(|e| op_failed("insert_template", &e))?;

        for slot in &template.slots {
            let examples = serde_json::to_string(&slot.example_values).map_err(|e| {
                Error::OperationFailed {
                    operation: "insert_template".to_string(),
                    cause: e.to_string(),
                }
            })?;
            tx.execute(
                "INSERT INTO template_slots
                     (template_id, name, slot_type, example_values, confidence_score)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    template.id.as_str(),
                    slot.name,
                    slot.slot_type,
                    examples,
                    slot.confidence_score,
                ],
            )
            .map_err(|e| op_failed("insert_template", &e))?;
        }

        tx.commit().map_err(|e| op_failed("insert_template", &e))
    }

    fn get_template(&self, id: &TemplateId) -> Result<Option<CanonicalTemplate>> {
        let conn = acquire_lock(&self.conn);
        let template = conn
            .query_row(
                "SELECT id, cluster_id, content, version, confidence_score, created_at
                 FROM canonical_templates WHERE id = ?1",
                params![id.as_str()],
                Self::map_template_row,
            )
            .optional()
            .map_err(|e| op_failed("get_template", &e))?;

        let Some(template) = template else {
            return Ok(None);
        };

        let mut templates = [template];
        Self::attach_slots(&conn, &mut templates)?;
        let [template] = templates;
        Ok(Some(template))
    }

    fn templates_for_cluster(&self, cluster_id: &ClusterId) -> Result<Vec<CanonicalTemplate>> {
        let conn = acquire_lock(&self.conn);
        let mut templates: Vec<CanonicalTemplate> = {
            let mut stmt = conn
                .prepare(
                    "SELECT id, cluster_id, content, version, confidence_score, created_at
                     FROM canonical_templates WHERE cluster_id = ?1
                     ORDER BY rowid",
                )
                .map_err(|e| op_failed("templates_for_cluster", &e))?;

            stmt.query_map(params![cluster_id.as_str()], Self::map_template_row)
                .and_then(std::iter::Iterator::collect)
                .map_err(|e| op_failed("templates_for_cluster", &e))?
        };

        Self::attach_slots(&conn, &mut templates)?;
        Ok(templates)
    }

    fn delete_template(&self, id: &TemplateId) -> Result<bool> {
        let deleted = acquire_lock(&self.conn)
            .execute(
                "DELETE FROM canonical_templates WHERE id = ?1",
                params![id.as_str()],
            )
            .map_err(|e| op_failed("delete_template", &e))?;
        Ok(deleted > 0)
    }

    fn record_event(&self, event: &EvolutionEvent) -> Result<()> {
        acquire_lock(&self.conn)
            .execute(
                "INSERT INTO evolution_events
                     (id, template_id, kind, previous_version, new_version,
                      change_reason, detected_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    event.id.as_str(),
                    event.template_id.as_str(),
                    event.kind.as_str(),
                    event.previous_version.map(|v| v.to_string()),
                    event.new_version.map(|v| v.to_string()),
                    event.change_reason,
                    event.detected_by,
                    event.created_at,
                ],
            )
            .map_err(|e| op_failed("record_event", &e))?;
        Ok(())
    }

    fn events_for_template(&self, template_id: &TemplateId) -> Result<Vec<EvolutionEvent>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(
                "SELECT id, template_id, kind, previous_version, new_version,
                        change_reason, detected_by, created_at
                 FROM evolution_events WHERE template_id = ?1
                 ORDER BY created_at, rowid",
            )
            .map_err(|e| op_failed("events_for_template", &e))?;

        stmt.query_map(params![template_id.as_str()], Self::map_event)
            .and_then(std::iter::Iterator::collect)
            .map_err(|e| op_failed("events_for_template", &e))
    }
}
