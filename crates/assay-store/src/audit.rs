//! Append-only operation log

use crate::{from_sql_time, to_sql_time, SqliteStore, StoreError};
use rusqlite::{params, Row};
use serde::Serialize;

/// Outcome recorded for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditResult {
    /// The operation completed
    Success,
    /// The operation was rejected or failed
    Error,
}

impl AuditResult {
    fn as_str(&self) -> &'static str {
        match self {
            AuditResult::Success => "SUCCESS",
            AuditResult::Error => "ERROR",
        }
    }

    fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("SUCCESS") {
            AuditResult::Success
        } else {
            AuditResult::Error
        }
    }
}

/// One audit log row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    /// Row id
    pub id: String,
    /// When the operation ran (Unix seconds)
    pub timestamp: u64,
    /// Operation name
    pub operation: String,
    /// Role the caller acted under
    pub actor: String,
    /// Holon or evidence the operation touched
    pub target_id: Option<String>,
    /// Outcome
    pub result: AuditResult,
    /// Free-form details (error message, chosen verdict, ...)
    pub details: Option<String>,
    /// Bounded context
    pub context_id: String,
}

const AUDIT_COLUMNS: &str = "id, timestamp, operation, actor, target_id, result, details, context_id";

impl SqliteStore {
    /// Append an audit row
    pub fn append_audit_entry(&mut self, entry: &AuditEntry) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO audit_log (id, timestamp, operation, actor, target_id, result, details, context_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &entry.id,
                to_sql_time(entry.timestamp),
                &entry.operation,
                &entry.actor,
                &entry.target_id,
                entry.result.as_str(),
                &entry.details,
                &entry.context_id,
            ],
        )?;
        Ok(())
    }

    /// Audit rows touching one target, oldest first
    pub fn audit_log_for_target(&self, target_id: &str) -> Result<Vec<AuditEntry>, StoreError> {
        let sql = format!(
            "SELECT {} FROM audit_log WHERE target_id = ?1 ORDER BY timestamp, rowid",
            AUDIT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![target_id], audit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Most recent audit rows, newest first
    pub fn recent_audit_log(&self, limit: usize) -> Result<Vec<AuditEntry>, StoreError> {
        let sql = format!(
            "SELECT {} FROM audit_log ORDER BY timestamp DESC, rowid DESC LIMIT ?1",
            AUDIT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![limit as i64], audit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

fn audit_from_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    let result: String = row.get(5)?;
    Ok(AuditEntry {
        id: row.get(0)?,
        timestamp: from_sql_time(row.get(1)?),
        operation: row.get(2)?,
        actor: row.get(3)?,
        target_id: row.get(4)?,
        result: AuditResult::parse(&result),
        details: row.get(6)?,
        context_id: row.get(7)?,
    })
}
