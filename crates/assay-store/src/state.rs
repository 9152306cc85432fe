//! Context-keyed workflow state

use crate::{to_sql_time, SqliteStore, StoreError};
use assay_domain::traits::WorkflowStateStore;
use assay_domain::{Phase, Role, RoleAssignment, WorkflowState};
use rusqlite::{params, OptionalExtension};

impl WorkflowStateStore for SqliteStore {
    type Error = StoreError;

    fn load_state(&self, context_id: &str) -> Result<Option<WorkflowState>, Self::Error> {
        let row = self
            .conn
            .query_row(
                "SELECT phase, role, session_id, last_commit, assurance_threshold
                 FROM workflow_state WHERE context_id = ?1",
                params![context_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, f64>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((phase, role, session_id, last_commit, assurance_threshold)) = row else {
            return Ok(None);
        };

        let phase = Phase::parse(&phase)
            .ok_or_else(|| StoreError::Validation(format!("Unknown stored phase: {}", phase)))?;
        let active_role = role.as_deref().and_then(Role::parse).map(|role| {
            RoleAssignment::new(role, session_id.unwrap_or_default(), context_id)
        });

        Ok(Some(WorkflowState {
            context_id: context_id.to_string(),
            phase,
            active_role,
            last_commit,
            assurance_threshold,
        }))
    }

    fn save_state(&mut self, state: &WorkflowState, now: u64) -> Result<(), Self::Error> {
        let (role, session_id) = match &state.active_role {
            Some(assignment) => (Some(assignment.role.as_str()), Some(assignment.session_id.as_str())),
            None => (None, None),
        };

        self.conn.execute(
            "INSERT INTO workflow_state (context_id, phase, role, session_id, last_commit, assurance_threshold, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(context_id) DO UPDATE SET
                 phase = excluded.phase,
                 role = excluded.role,
                 session_id = excluded.session_id,
                 last_commit = excluded.last_commit,
                 assurance_threshold = excluded.assurance_threshold,
                 updated_at = excluded.updated_at",
            params![
                &state.context_id,
                state.phase.as_str(),
                role,
                session_id,
                &state.last_commit,
                state.assurance_threshold,
                to_sql_time(now),
            ],
        )?;

        tracing::debug!(context = %state.context_id, phase = %state.phase, "Saved workflow state");
        Ok(())
    }
}
