//! The engine: authorize, execute and audit one named operation

use crate::dates::now_unix;
use crate::ops::{decision, evidence, link, maintenance, propose, reliability, search, workflow, OpContext};
use crate::{EngineConfig, EngineError, IntegrityWarning, Outcome};
use assay_domain::traits::HolonStore;
use assay_domain::{new_record_id, EvidenceAnchor, Holon, Layer, Phase, Role, RoleAssignment};
use assay_gatekeeper::{Gatekeeper, Operation};
use assay_janitor::Janitor;
use assay_store::{AuditEntry, AuditResult, SqliteStore};
use assay_workflow::{AnchorValidator, PhaseMachine};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// Argument and result fields naming the record an operation touched, in
/// order of preference
const TARGET_KEYS: [&str; 6] = [
    "holon_id",
    "drr_id",
    "decision_id",
    "evidence_id",
    "source_id",
    "winner_id",
];

/// Entry point for every operation
///
/// Each call loads the caller's context state, checks the dispatch table,
/// runs the operation to completion, saves the state if it changed and
/// appends an audit row. The operation's writes and the state save share
/// one transaction; the audit row is written after it, whatever the result.
pub struct Engine {
    store: SqliteStore,
    config: EngineConfig,
    gatekeeper: Gatekeeper,
    janitor: Janitor,
}

impl Engine {
    /// Open the store named by `config`
    pub fn open(config: EngineConfig) -> Result<Self, EngineError> {
        let store = SqliteStore::new(&config.store.path)?;
        Ok(Self::with_store(store, config))
    }

    /// Load configuration from a TOML file (defaults if absent) and open the store
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        Self::open(EngineConfig::load(path)?)
    }

    /// Engine over an already opened store
    pub fn with_store(store: SqliteStore, config: EngineConfig) -> Self {
        tracing::debug!(
            store = %config.store.path.display(),
            root = %config.workflow.root.display(),
            "Engine ready"
        );
        Self {
            gatekeeper: Gatekeeper::new(config.gatekeeper.clone()),
            janitor: Janitor::new(config.janitor.clone()),
            store,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read access to the underlying store
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn janitor(&self) -> &Janitor {
        &self.janitor
    }

    /// A role in the configured default context
    pub fn assignment(&self, role: Role, session_id: impl Into<String>) -> RoleAssignment {
        RoleAssignment::new(role, session_id, self.config.workflow.default_context.clone())
    }

    /// Get a holon by id
    pub fn get_holon(&self, id: &str) -> Result<Holon, EngineError> {
        Ok(self.store.get_holon(id)?)
    }

    /// Move a holon from layer `from` to layer `to`, returning its new layer
    ///
    /// Fails if the holon does not exist or is not currently in `from`.
    pub fn move_holon(&mut self, id: &str, from: Layer, to: Layer) -> Result<Layer, EngineError> {
        let holon = self
            .store
            .find_holon(id)?
            .ok_or_else(|| EngineError::not_found("holon", id))?;
        if holon.layer != from {
            return Err(EngineError::State {
                message: format!("holon '{}' is in {}, not {}", id, holon.layer, from),
                hint: Some(format!("Move it from {}", holon.layer)),
            });
        }
        self.store.update_holon_layer(id, to, now_unix())?;
        tracing::info!(holon = %id, from = %from, to = %to, "Holon moved");
        Ok(to)
    }

    /// Whether `caller` could move its context into `target` right now
    ///
    /// Nothing is persisted. The reason is `"OK"` when allowed.
    pub fn can_transition(
        &mut self,
        caller: &RoleAssignment,
        target: Phase,
        anchor: Option<&EvidenceAnchor>,
    ) -> Result<(bool, String), EngineError> {
        let caller = self.in_context(caller);
        let machine = self.load_machine(&caller.context_id)?;
        Ok(machine.can_transition(&mut self.store, now_unix(), target, &caller, anchor))
    }

    /// Run operation `name` with JSON `args` at the current time
    pub fn invoke(
        &mut self,
        name: &str,
        caller: &RoleAssignment,
        args: Value,
    ) -> Result<Outcome<Value>, EngineError> {
        self.invoke_at(name, caller, args, now_unix())
    }

    /// Run operation `name` with JSON `args` as of `now` (Unix seconds)
    ///
    /// Failures are closed: the operation's writes are rolled back, the error
    /// is returned and nothing but the audit row is written. Best-effort
    /// problems come back as warnings.
    pub fn invoke_at(
        &mut self,
        name: &str,
        caller: &RoleAssignment,
        args: Value,
        now: u64,
    ) -> Result<Outcome<Value>, EngineError> {
        let caller = self.in_context(caller);
        let arg_target = target_id(&args);

        match self.execute(name, &caller, args, now) {
            Ok((value, mut warnings)) => {
                let target = target_id(&value).or(arg_target);
                let details = (!warnings.is_empty()).then(|| {
                    warnings.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
                });
                if let Err(e) = self.audit(name, &caller, target, AuditResult::Success, details, now) {
                    let warning = IntegrityWarning::AuditLogFailed { reason: e.to_string() };
                    tracing::warn!(operation = %name, "{}", warning);
                    warnings.push(warning);
                }
                tracing::info!(
                    operation = %name,
                    role = %caller.role,
                    context = %caller.context_id,
                    warnings = warnings.len(),
                    "Operation completed"
                );
                Ok(Outcome { value, warnings })
            }
            Err(err) => {
                tracing::warn!(
                    operation = %name,
                    role = %caller.role,
                    context = %caller.context_id,
                    kind = err.category(),
                    error = %err,
                    "Operation rejected"
                );
                if let Err(e) = self.audit(name, &caller, arg_target, AuditResult::Error, Some(err.to_string()), now) {
                    tracing::warn!(operation = %name, error = %e, "Audit log entry not written");
                }
                Err(err)
            }
        }
    }

    fn in_context(&self, caller: &RoleAssignment) -> RoleAssignment {
        let mut caller = caller.clone();
        if caller.context_id.trim().is_empty() {
            caller.context_id = self.config.workflow.default_context.clone();
        }
        caller
    }

    /// Load a context's machine; a configured threshold override wins over
    /// the stored one
    fn load_machine(&self, context_id: &str) -> Result<PhaseMachine, EngineError> {
        let workflow = &self.config.workflow;
        let mut machine = PhaseMachine::load(
            &self.store,
            context_id,
            workflow.threshold_for(context_id),
            AnchorValidator::new(workflow.root.clone()),
        )?;
        if let Some(threshold) = workflow.threshold_override(context_id) {
            machine.set_threshold(threshold);
        }
        Ok(machine)
    }

    fn execute(
        &mut self,
        name: &str,
        caller: &RoleAssignment,
        args: Value,
        now: u64,
    ) -> Result<(Value, Vec<IntegrityWarning>), EngineError> {
        let mut machine = self.load_machine(&caller.context_id)?;
        let rule = self.gatekeeper.authorize(name, caller.role, machine.phase())?;
        let operation = rule.operation;

        self.store.begin_transaction()?;
        match self.dispatch(operation, caller, &mut machine, args, now) {
            Ok(done) => {
                self.store.commit_transaction()?;
                Ok(done)
            }
            Err(err) => {
                self.store.rollback_transaction();
                Err(err)
            }
        }
    }

    /// Run the handler and save the state; the caller owns the transaction
    fn dispatch(
        &mut self,
        operation: Operation,
        caller: &RoleAssignment,
        machine: &mut PhaseMachine,
        args: Value,
        now: u64,
    ) -> Result<(Value, Vec<IntegrityWarning>), EngineError> {
        let mut ctx = OpContext::new(
            &mut self.store,
            &self.config,
            &mut self.janitor,
            machine,
            caller,
            now,
        );
        let value = match operation {
            Operation::Propose => call(&mut ctx, operation, args, propose::handle_propose),
            Operation::Verify => call(&mut ctx, operation, args, evidence::handle_verify),
            Operation::Test => call(&mut ctx, operation, args, evidence::handle_test),
            Operation::Audit => call(&mut ctx, operation, args, evidence::handle_audit),
            Operation::Decide => call(&mut ctx, operation, args, decision::handle_decide),
            Operation::Resolve => call(&mut ctx, operation, args, decision::handle_resolve),
            Operation::Link => call(&mut ctx, operation, args, link::handle_link),
            Operation::CalculateR => call(&mut ctx, operation, args, reliability::handle_calculate_r),
            Operation::AuditTree => call(&mut ctx, operation, args, reliability::handle_audit_tree),
            Operation::Search => call(&mut ctx, operation, args, search::handle_search),
            Operation::Transition => call(&mut ctx, operation, args, workflow::handle_transition),
            Operation::Status => call(&mut ctx, operation, args, workflow::handle_status),
            Operation::Reset => call(&mut ctx, operation, args, workflow::handle_reset),
            Operation::CheckDecay => call(&mut ctx, operation, args, maintenance::handle_check_decay),
            Operation::Waive => call(&mut ctx, operation, args, maintenance::handle_waive),
            Operation::Deprecate => call(&mut ctx, operation, args, maintenance::handle_deprecate),
            Operation::RefreshScores => call(&mut ctx, operation, args, maintenance::handle_refresh_scores),
        }?;

        let changed = ctx.state_changed();
        let warnings = ctx.take_warnings();
        if changed {
            machine.save(&mut self.store, now)?;
        }
        Ok((value, warnings))
    }

    fn audit(
        &mut self,
        name: &str,
        caller: &RoleAssignment,
        target_id: Option<String>,
        result: AuditResult,
        details: Option<String>,
        now: u64,
    ) -> Result<(), EngineError> {
        self.store.append_audit_entry(&AuditEntry {
            id: new_record_id(),
            timestamp: now,
            operation: name.to_string(),
            actor: caller.role.as_str().to_string(),
            target_id,
            result,
            details,
            context_id: caller.context_id.clone(),
        })?;
        Ok(())
    }
}

/// Decode arguments, run a handler and encode its result
fn call<P, R, F>(ctx: &mut OpContext<'_>, operation: Operation, args: Value, handler: F) -> Result<Value, EngineError>
where
    P: DeserializeOwned,
    R: Serialize,
    F: FnOnce(&mut OpContext<'_>, P) -> Result<R, EngineError>,
{
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    let params: P = serde_json::from_value(args).map_err(|e| {
        EngineError::validation_with_hint(
            format!("invalid arguments for {}: {}", operation, e),
            "Check the argument names and types",
        )
    })?;
    let result = handler(ctx, params)?;
    serde_json::to_value(result)
        .map_err(|e| EngineError::Store(format!("failed to encode {} result: {}", operation, e)))
}

fn target_id(value: &Value) -> Option<String> {
    TARGET_KEYS.iter().find_map(|key| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    })
}
