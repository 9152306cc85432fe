//! Operation handlers
//!
//! Each operation has a `XxxParams` type deserialized from the caller's
//! JSON arguments, a `XxxResult` type serialized back, and a handler that
//! runs against an [`OpContext`]. Authorization has already happened by the
//! time a handler runs.

pub mod decision;
pub mod evidence;
pub mod link;
pub mod maintenance;
pub mod propose;
pub mod reliability;
pub mod search;
pub mod workflow;

use crate::{EngineConfig, IntegrityWarning};
use assay_domain::RoleAssignment;
use assay_janitor::Janitor;
use assay_store::SqliteStore;
use assay_workflow::PhaseMachine;

/// Everything a handler may touch during one invocation
pub struct OpContext<'a> {
    pub(crate) store: &'a mut SqliteStore,
    pub(crate) config: &'a EngineConfig,
    pub(crate) janitor: &'a mut Janitor,
    pub(crate) machine: &'a mut PhaseMachine,
    pub(crate) caller: &'a RoleAssignment,
    pub(crate) now: u64,
    warnings: Vec<IntegrityWarning>,
    state_changed: bool,
}

impl<'a> OpContext<'a> {
    pub(crate) fn new(
        store: &'a mut SqliteStore,
        config: &'a EngineConfig,
        janitor: &'a mut Janitor,
        machine: &'a mut PhaseMachine,
        caller: &'a RoleAssignment,
        now: u64,
    ) -> Self {
        Self {
            store,
            config,
            janitor,
            machine,
            caller,
            now,
            warnings: Vec::new(),
            state_changed: false,
        }
    }

    /// Bounded context of this invocation
    pub(crate) fn context_id(&self) -> &str {
        &self.caller.context_id
    }

    /// Expiry for evidence recorded now without an explicit one
    pub(crate) fn default_expiry(&self) -> u64 {
        self.now.saturating_add(self.config.evidence.validity_secs())
    }

    pub(crate) fn warn(&mut self, warning: IntegrityWarning) {
        tracing::warn!(context = %self.caller.context_id, "{}", warning);
        self.warnings.push(warning);
    }

    /// Raise one cache warning per holon, however often it failed
    pub(crate) fn note_uncached(&mut self, holon_ids: &[String]) {
        for holon_id in holon_ids {
            let seen = self.warnings.iter().any(|w| {
                matches!(w, IntegrityWarning::CacheWriteFailed { holon_id: h } if h == holon_id)
            });
            if !seen {
                self.warn(IntegrityWarning::CacheWriteFailed {
                    holon_id: holon_id.clone(),
                });
            }
        }
    }

    /// The workflow state was changed and must be saved
    pub(crate) fn mark_state_changed(&mut self) {
        self.state_changed = true;
    }

    pub(crate) fn state_changed(&self) -> bool {
        self.state_changed
    }

    pub(crate) fn take_warnings(&mut self) -> Vec<IntegrityWarning> {
        std::mem::take(&mut self.warnings)
    }
}

/// Non-empty required text argument
pub(crate) fn required<'s>(field: &str, value: &'s str) -> Result<&'s str, crate::EngineError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(crate::EngineError::validation(format!("{} is required", field)));
    }
    Ok(value)
}
