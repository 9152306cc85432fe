//! Assay Storage Layer
//!
//! Implements the holon graph traits from `assay-domain` on SQLite.
//!
//! # Architecture
//!
//! - SQLite for holons, evidence, relations, waivers, workflow state and the audit log
//! - FTS5 external-content tables for search, maintained by triggers so the
//!   index is updated by the same statement as the row it mirrors
//!
//! # Examples
//!
//! ```no_run
//! use assay_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for holon operations
//! ```

#![warn(missing_docs)]

mod audit;
mod search;
mod state;

pub use audit::{AuditEntry, AuditResult};
pub use search::{SearchHit, SearchHitKind, SearchQuery, SearchScope, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};

use assay_domain::relation::clamp_congruence;
use assay_domain::traits::{HolonGraph, HolonQuery, HolonStore};
use assay_domain::{
    DecisionStatus, Evidence, EvidenceType, Holon, HolonKind, Layer, Relation, RelationType,
    Verdict, Waiver,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record not found
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind ("holon", "evidence", ...)
        kind: &'static str,
        /// Requested id
        id: String,
    },

    /// Rejected input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A holon with this id already exists
    #[error("Holon already exists: {0}")]
    Duplicate(String),
}

impl StoreError {
    fn holon_not_found(id: &str) -> Self {
        StoreError::NotFound {
            kind: "holon",
            id: id.to_string(),
        }
    }
}

const HOLON_COLUMNS: &str =
    "id, kind, layer, title, content, context_id, scope, cached_r_score, created_at, updated_at";

const EVIDENCE_COLUMNS: &str =
    "id, holon_id, type, content, verdict, assurance_level, carrier_ref, valid_until, created_at";

const RELATION_COLUMNS: &str = "source_id, target_id, relation_type, congruence_level, created_at";

const WAIVER_COLUMNS: &str = "id, evidence_id, waived_by, waived_until, rationale, created_at";

/// SQLite-based implementation of the holon store
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own
/// `SqliteStore`; concurrent writers rely on SQLite's own locking.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a store at the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use assay_store::SqliteStore;
    ///
    /// let store = SqliteStore::new(".assay/assay.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        tracing::debug!(path = %path.as_ref().display(), "Opened holon store");
        Ok(store)
    }

    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    /// Open a write transaction
    ///
    /// Every write until [`commit_transaction`](Self::commit_transaction) or
    /// [`rollback_transaction`](Self::rollback_transaction) lands together or
    /// not at all. Transactions do not nest.
    pub fn begin_transaction(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    /// Commit the open transaction; on failure it is rolled back
    pub fn commit_transaction(&mut self) -> Result<(), StoreError> {
        if let Err(e) = self.conn.execute_batch("COMMIT") {
            self.rollback_transaction();
            return Err(e.into());
        }
        Ok(())
    }

    /// Discard the open transaction
    pub fn rollback_transaction(&mut self) {
        if self.conn.is_autocommit() {
            return;
        }
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            tracing::warn!(error = %e, "Rollback failed");
        }
    }

    /// Get a holon, failing if it does not exist
    pub fn get_holon(&self, id: &str) -> Result<Holon, StoreError> {
        self.find_holon(id)?
            .ok_or_else(|| StoreError::holon_not_found(id))
    }

    /// Get a holon's title, failing if it does not exist
    pub fn get_holon_title(&self, id: &str) -> Result<String, StoreError> {
        self.conn
            .query_row("SELECT title FROM holons WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?
            .ok_or_else(|| StoreError::holon_not_found(id))
    }

    /// Whether a holon exists
    pub fn holon_exists(&self, id: &str) -> Result<bool, StoreError> {
        let exists = self
            .conn
            .query_row("SELECT 1 FROM holons WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?
            .is_some();
        Ok(exists)
    }

    /// Every holon id, oldest first
    pub fn list_holon_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT id FROM holons ORDER BY created_at, rowid")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Count of holons per active layer (L0, L1, L2) in a context
    pub fn count_active_by_layer(&self, context_id: &str) -> Result<BTreeMap<Layer, u64>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT layer, COUNT(*) FROM holons
             WHERE context_id = ?1 AND layer IN ('L0', 'L1', 'L2')
             GROUP BY layer",
        )?;
        let rows = stmt.query_map(params![context_id], |row| {
            let layer: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((layer, count))
        })?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let (layer, count) = row?;
            if let Some(layer) = Layer::parse(&layer) {
                counts.insert(layer, count.max(0) as u64);
            }
        }
        Ok(counts)
    }

    /// Whether any L2 holon in the context carries an audit report
    pub fn has_audited_l2(&self, context_id: &str) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM holons h
                 WHERE h.context_id = ?1 AND h.layer = 'L2'
                   AND EXISTS (SELECT 1 FROM evidence e WHERE e.holon_id = h.id AND e.type = 'audit_report')
                 LIMIT 1",
                params![context_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        Ok(found)
    }

    /// Decision records in a context with no resolution evidence yet
    pub fn list_open_decisions(&self, context_id: &str) -> Result<Vec<Holon>, StoreError> {
        let sql = format!(
            "SELECT {} FROM holons h
             WHERE h.context_id = ?1 AND h.layer = 'DRR'
               AND NOT EXISTS (
                   SELECT 1 FROM evidence e
                   WHERE e.holon_id = h.id
                     AND e.type IN ('implementation', 'abandonment', 'supersession'))
             ORDER BY h.created_at, h.rowid",
            HOLON_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let holons = stmt
            .query_map(params![context_id], holon_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(holons)
    }

    /// Resolution recorded for a decision, if any
    pub fn resolution_of(&self, holon_id: &str) -> Result<Option<DecisionStatus>, StoreError> {
        let kind: Option<String> = self
            .conn
            .query_row(
                "SELECT type FROM evidence
                 WHERE holon_id = ?1 AND type IN ('implementation', 'abandonment', 'supersession')
                 ORDER BY created_at, rowid LIMIT 1",
                params![holon_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(kind.as_deref().and_then(DecisionStatus::from_evidence_type))
    }

    /// All relations touching a holon, in either direction
    pub fn get_relations(&self, holon_id: &str) -> Result<Vec<Relation>, StoreError> {
        self.query_relations(
            "source_id = ?1 OR target_id = ?1",
            holon_id,
        )
    }

    fn query_relations(&self, filter: &str, holon_id: &str) -> Result<Vec<Relation>, StoreError> {
        let sql = format!(
            "SELECT {} FROM relations WHERE {} ORDER BY created_at, rowid",
            RELATION_COLUMNS, filter
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let relations = stmt
            .query_map(params![holon_id], relation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(relations)
    }

    fn query_evidence(&self, filter: &str, value: &dyn rusqlite::ToSql) -> Result<Vec<Evidence>, StoreError> {
        let sql = format!(
            "SELECT {} FROM evidence WHERE {} ORDER BY created_at, rowid",
            EVIDENCE_COLUMNS, filter
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let evidence = stmt
            .query_map([value], evidence_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(evidence)
    }
}

impl HolonGraph for SqliteStore {
    type Error = StoreError;

    fn holon_exists(&self, holon_id: &str) -> Result<bool, Self::Error> {
        SqliteStore::holon_exists(self, holon_id)
    }

    fn get_evidence(&self, holon_id: &str) -> Result<Vec<Evidence>, Self::Error> {
        self.query_evidence("holon_id = ?1", &holon_id)
    }

    fn get_active_waiver_for_evidence(
        &self,
        evidence_id: &str,
        now: u64,
    ) -> Result<Option<Waiver>, Self::Error> {
        let sql = format!(
            "SELECT {} FROM waivers
             WHERE evidence_id = ?1 AND waived_until > ?2
             ORDER BY waived_until DESC LIMIT 1",
            WAIVER_COLUMNS
        );
        let waiver = self
            .conn
            .query_row(&sql, params![evidence_id, to_sql_time(now)], waiver_from_row)
            .optional()?;
        Ok(waiver)
    }

    fn get_dependencies(&self, holon_id: &str) -> Result<Vec<Relation>, Self::Error> {
        self.query_relations(
            "(target_id = ?1 AND relation_type = 'componentOf')
             OR (source_id = ?1 AND relation_type = 'dependsOn')",
            holon_id,
        )
    }

    fn get_components_of(&self, holon_id: &str) -> Result<Vec<Relation>, Self::Error> {
        self.query_relations("target_id = ?1 AND relation_type = 'componentOf'", holon_id)
    }

    fn cache_reliability(&mut self, holon_id: &str, score: f64) -> Result<(), Self::Error> {
        let updated = self.conn.execute(
            "UPDATE holons SET cached_r_score = ?1 WHERE id = ?2",
            params![score.clamp(0.0, 1.0), holon_id],
        )?;
        if updated == 0 {
            return Err(StoreError::holon_not_found(holon_id));
        }
        Ok(())
    }
}

impl HolonStore for SqliteStore {
    fn create_holon(&mut self, holon: Holon) -> Result<(), Self::Error> {
        if self.holon_exists(&holon.id)? {
            return Err(StoreError::Duplicate(holon.id));
        }

        self.conn.execute(
            "INSERT INTO holons (id, kind, layer, title, content, context_id, scope, cached_r_score, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                &holon.id,
                holon.kind.map(|k| k.as_str()),
                holon.layer.as_str(),
                &holon.title,
                &holon.content,
                &holon.context_id,
                &holon.scope,
                holon.cached_score.clamp(0.0, 1.0),
                to_sql_time(holon.created_at),
                to_sql_time(holon.updated_at),
            ],
        )?;

        Ok(())
    }

    fn find_holon(&self, id: &str) -> Result<Option<Holon>, Self::Error> {
        let sql = format!("SELECT {} FROM holons WHERE id = ?1", HOLON_COLUMNS);
        let holon = self
            .conn
            .query_row(&sql, params![id], holon_from_row)
            .optional()?;
        Ok(holon)
    }

    fn update_holon_layer(&mut self, id: &str, layer: Layer, now: u64) -> Result<(), Self::Error> {
        let updated = self.conn.execute(
            "UPDATE holons SET layer = ?1, updated_at = ?2 WHERE id = ?3",
            params![layer.as_str(), to_sql_time(now), id],
        )?;
        if updated == 0 {
            return Err(StoreError::holon_not_found(id));
        }
        Ok(())
    }

    fn list_holons(&self, query: &HolonQuery) -> Result<Vec<Holon>, Self::Error> {
        let mut sql = format!("SELECT {} FROM holons WHERE 1=1", HOLON_COLUMNS);
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(context_id) = &query.context_id {
            sql.push_str(" AND context_id = ?");
            params.push(Box::new(context_id.clone()));
        }

        if let Some(layer) = query.layer {
            sql.push_str(" AND layer = ?");
            params.push(Box::new(layer.as_str()));
        }

        sql.push_str(" ORDER BY created_at, rowid");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            params.push(Box::new(limit as i64));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let holons = stmt
            .query_map(&param_refs[..], holon_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(holons)
    }

    fn create_relation(&mut self, relation: Relation) -> Result<(), Self::Error> {
        if relation.is_self_relation() {
            return Err(StoreError::Validation(format!(
                "holon {} cannot relate to itself",
                relation.source_id
            )));
        }

        self.conn.execute(
            "INSERT INTO relations (source_id, target_id, relation_type, congruence_level, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(source_id, target_id, relation_type) DO UPDATE SET
             congruence_level = excluded.congruence_level",
            params![
                &relation.source_id,
                &relation.target_id,
                relation.relation_type.as_str(),
                clamp_congruence(i64::from(relation.congruence_level)),
                to_sql_time(relation.created_at),
            ],
        )?;

        Ok(())
    }

    fn get_collection_members(&self, holon_id: &str) -> Result<Vec<Relation>, Self::Error> {
        self.query_relations("target_id = ?1 AND relation_type = 'memberOf'", holon_id)
    }

    fn add_evidence(&mut self, evidence: Evidence) -> Result<(), Self::Error> {
        self.conn.execute(
            "INSERT INTO evidence (id, holon_id, type, content, verdict, assurance_level, carrier_ref, valid_until, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                &evidence.id,
                &evidence.holon_id,
                evidence.evidence_type.as_str(),
                &evidence.content,
                evidence.verdict.as_str(),
                &evidence.assurance_level,
                &evidence.carrier_ref,
                evidence.valid_until.map(to_sql_time),
                to_sql_time(evidence.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_evidence_by_id(&self, id: &str) -> Result<Option<Evidence>, Self::Error> {
        Ok(self.query_evidence("id = ?1", &id)?.into_iter().next())
    }

    fn list_evidence_expiring_before(&self, until: u64) -> Result<Vec<Evidence>, Self::Error> {
        let sql = format!(
            "SELECT {} FROM evidence
             WHERE valid_until IS NOT NULL AND valid_until < ?1
             ORDER BY valid_until, rowid",
            EVIDENCE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let evidence = stmt
            .query_map(params![to_sql_time(until)], evidence_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(evidence)
    }

    fn create_waiver(&mut self, waiver: Waiver) -> Result<(), Self::Error> {
        self.conn.execute(
            "INSERT INTO waivers (id, evidence_id, waived_by, waived_until, rationale, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &waiver.id,
                &waiver.evidence_id,
                &waiver.waived_by,
                to_sql_time(waiver.waived_until),
                &waiver.rationale,
                to_sql_time(waiver.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_active_waivers(&self, now: u64) -> Result<Vec<Waiver>, Self::Error> {
        let sql = format!(
            "SELECT {} FROM waivers WHERE waived_until > ?1 ORDER BY waived_until, rowid",
            WAIVER_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let waivers = stmt
            .query_map(params![to_sql_time(now)], waiver_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(waivers)
    }
}

/// SQLite integers are signed; timestamps beyond i64 saturate
pub(crate) fn to_sql_time(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

pub(crate) fn from_sql_time(secs: i64) -> u64 {
    secs.max(0) as u64
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, message.into())
}

pub(crate) fn parse_layer(column: usize, value: &str) -> rusqlite::Result<Layer> {
    Layer::parse(value).ok_or_else(|| conversion_error(column, format!("Unknown layer: {}", value)))
}

fn holon_from_row(row: &Row<'_>) -> rusqlite::Result<Holon> {
    let kind: Option<String> = row.get(1)?;
    let layer: String = row.get(2)?;

    Ok(Holon {
        id: row.get(0)?,
        kind: kind.as_deref().and_then(HolonKind::parse),
        layer: parse_layer(2, &layer)?,
        title: row.get(3)?,
        content: row.get(4)?,
        context_id: row.get(5)?,
        scope: row.get(6)?,
        cached_score: row.get(7)?,
        created_at: from_sql_time(row.get(8)?),
        updated_at: from_sql_time(row.get(9)?),
    })
}

fn evidence_from_row(row: &Row<'_>) -> rusqlite::Result<Evidence> {
    let evidence_type: String = row.get(2)?;
    let verdict: String = row.get(4)?;
    let valid_until: Option<i64> = row.get(7)?;

    Ok(Evidence {
        id: row.get(0)?,
        holon_id: row.get(1)?,
        evidence_type: EvidenceType::parse(&evidence_type),
        content: row.get(3)?,
        verdict: Verdict::parse(&verdict),
        assurance_level: row.get(5)?,
        carrier_ref: row.get(6)?,
        valid_until: valid_until.map(from_sql_time),
        created_at: from_sql_time(row.get(8)?),
    })
}

fn relation_from_row(row: &Row<'_>) -> rusqlite::Result<Relation> {
    let relation_type: String = row.get(2)?;
    let level: i64 = row.get(3)?;

    Ok(Relation {
        source_id: row.get(0)?,
        target_id: row.get(1)?,
        relation_type: RelationType::parse(&relation_type),
        congruence_level: clamp_congruence(level),
        created_at: from_sql_time(row.get(4)?),
    })
}

fn waiver_from_row(row: &Row<'_>) -> rusqlite::Result<Waiver> {
    Ok(Waiver {
        id: row.get(0)?,
        evidence_id: row.get(1)?,
        waived_by: row.get(2)?,
        waived_until: from_sql_time(row.get(3)?),
        rationale: row.get(4)?,
        created_at: from_sql_time(row.get(5)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_conversion_saturates() {
        assert_eq!(to_sql_time(42), 42);
        assert_eq!(to_sql_time(u64::MAX), i64::MAX);
        assert_eq!(from_sql_time(-5), 0);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        store.initialize_schema().unwrap();
    }

    fn holon(id: &str) -> Holon {
        Holon::new(
            id.to_string(),
            None,
            Layer::L0,
            format!("Holon {}", id),
            "body".to_string(),
            "default".to_string(),
            None,
            1_700_000_000,
        )
    }

    fn evidence(id: &str, holon_id: &str) -> Evidence {
        Evidence {
            id: id.to_string(),
            holon_id: holon_id.to_string(),
            evidence_type: EvidenceType::Internal,
            content: "checked".to_string(),
            verdict: Verdict::Pass,
            assurance_level: None,
            carrier_ref: None,
            valid_until: None,
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_failed_multi_row_write_rolls_back() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        store.create_holon(holon("h")).unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER frozen BEFORE UPDATE OF layer ON holons
                 BEGIN SELECT RAISE(ABORT, 'layer is frozen'); END;",
            )
            .unwrap();

        store.begin_transaction().unwrap();
        store.add_evidence(evidence("e1", "h")).unwrap();
        assert!(store.update_holon_layer("h", Layer::L1, 1_700_000_001).is_err());
        store.rollback_transaction();

        assert!(store.get_evidence("h").unwrap().is_empty());
        assert_eq!(store.get_holon("h").unwrap().layer, Layer::L0);
        assert!(store.conn.is_autocommit());
    }

    #[test]
    fn test_committed_writes_persist() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        store.begin_transaction().unwrap();
        store.create_holon(holon("h")).unwrap();
        store.add_evidence(evidence("e1", "h")).unwrap();
        store.commit_transaction().unwrap();

        assert_eq!(store.get_evidence("h").unwrap().len(), 1);

        // Rolling back with nothing open is a no-op
        store.rollback_transaction();
        assert!(store.holon_exists("h").unwrap());
    }

    #[test]
    fn test_search_index_survives_vacuum() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = SqliteStore::new(dir.path().join("assay.db")).unwrap();
        for id in ["alpha", "beta", "gamma"] {
            store.create_holon(holon(id)).unwrap();
        }
        store.add_evidence(evidence("e-gamma", "gamma")).unwrap();
        store
            .conn
            .execute_batch("DELETE FROM holons WHERE id = 'alpha'; VACUUM;")
            .unwrap();

        let key: String = store
            .conn
            .query_row("SELECT name FROM pragma_table_info('holons') WHERE pk = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(key, "seq");

        let hits = store.search(&SearchQuery::new("gamma")).unwrap();
        let mut ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, ["e-gamma", "gamma"]);

        store
            .conn
            .execute_batch(
                "INSERT INTO holons_fts(holons_fts) VALUES('integrity-check');
                 INSERT INTO evidence_fts(evidence_fts) VALUES('integrity-check');",
            )
            .unwrap();
    }
}
