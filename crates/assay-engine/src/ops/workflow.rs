//! `transition`, `status` and `reset`: workflow state of a bounded context

use super::OpContext;
use crate::EngineError;
use assay_domain::{
    EvidenceAnchor, Holon, Layer, Phase, ReliabilityReport, Role, TRANSITIONS,
};
use assay_workflow::{derive_phase, expected_anchor, LayerCensus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Artifact justifying a transition
#[derive(Debug, Default, Deserialize)]
pub struct AnchorParams {
    /// Artifact kind (`file`, `directory`, `holon`, ...)
    #[serde(default)]
    pub kind: String,
    /// Artifact location, relative to the workflow root
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub description: String,
    /// Holon to gate on when entering Operation
    #[serde(default)]
    pub holon_id: Option<String>,
}

impl From<AnchorParams> for EvidenceAnchor {
    fn from(params: AnchorParams) -> Self {
        EvidenceAnchor {
            kind: params.kind,
            uri: params.uri,
            description: params.description,
            holon_id: params.holon_id,
        }
    }
}

/// Parameters for a phase change
#[derive(Debug, Deserialize)]
pub struct TransitionParams {
    /// Destination phase
    pub target: String,
    #[serde(default)]
    pub anchor: Option<AnchorParams>,
    /// Change marker (for example a commit hash) to remember with the new phase
    #[serde(default)]
    pub last_commit: Option<String>,
}

/// Result of an accepted transition
#[derive(Debug, Serialize)]
pub struct TransitionResult {
    pub context_id: String,
    pub from: Phase,
    pub to: Phase,
    pub role: Role,
    /// Reliability report of the gated holon when entering Operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReliabilityReport>,
}

/// An unresolved decision record
#[derive(Debug, Serialize)]
pub struct DecisionSummary {
    pub id: String,
    pub title: String,
    pub created_at: u64,
}

impl From<Holon> for DecisionSummary {
    fn from(holon: Holon) -> Self {
        Self {
            id: holon.id,
            title: holon.title,
            created_at: holon.created_at,
        }
    }
}

/// Status takes no parameters
#[derive(Debug, Default, Deserialize)]
pub struct StatusParams {}

/// Workflow and knowledge summary of a context
#[derive(Debug, Serialize)]
pub struct StatusResult {
    pub context_id: String,
    /// Persisted phase; the only one that gates anything
    pub phase: Phase,
    pub active_role: Option<Role>,
    pub session_id: Option<String>,
    pub threshold: f64,
    pub last_commit: Option<String>,
    /// Phase suggested by the knowledge counts; informational
    pub derived_phase: Phase,
    pub layers: BTreeMap<Layer, u64>,
    pub open_decisions: Vec<DecisionSummary>,
    /// Transitions available from the current phase
    pub next_steps: Vec<String>,
}

/// Parameters for a reset
#[derive(Debug, Default, Deserialize)]
pub struct ResetParams {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Result of a reset
#[derive(Debug, Serialize)]
pub struct ResetResult {
    pub context_id: String,
    pub previous_phase: Phase,
    pub reason: String,
    /// Decisions still awaiting a resolution
    pub open_decisions: Vec<DecisionSummary>,
}

/// Handle `transition`
pub(crate) fn handle_transition(
    ctx: &mut OpContext<'_>,
    params: TransitionParams,
) -> Result<TransitionResult, EngineError> {
    let target = Phase::parse(params.target.trim()).ok_or_else(|| {
        EngineError::validation_with_hint(
            format!("unknown phase '{}'", params.target),
            "Use IDLE, ABDUCTION, DEDUCTION, INDUCTION, AUDIT, DECISION or OPERATION",
        )
    })?;
    let anchor = params.anchor.map(EvidenceAnchor::from);
    let assignment = ctx.caller.clone();
    let role = assignment.role;

    let outcome = ctx
        .machine
        .transition(ctx.store, ctx.now, target, assignment, anchor.as_ref())?;
    if let Some(report) = &outcome.report {
        ctx.note_uncached(&report.uncached);
    }
    if let Some(marker) = params.last_commit.filter(|m| !m.trim().is_empty()) {
        ctx.machine.set_last_commit(marker.trim());
    }
    ctx.mark_state_changed();

    Ok(TransitionResult {
        context_id: ctx.context_id().to_string(),
        from: outcome.from,
        to: outcome.to,
        role,
        report: outcome.report,
    })
}

fn next_steps(phase: Phase) -> Vec<String> {
    TRANSITIONS
        .iter()
        .filter(|rule| rule.from == phase)
        .map(|rule| format!("{} as {} with {}", rule.to, rule.role, expected_anchor(rule.to)))
        .collect()
}

/// Handle `status`
pub(crate) fn handle_status(ctx: &mut OpContext<'_>, _params: StatusParams) -> Result<StatusResult, EngineError> {
    let context_id = ctx.context_id().to_string();
    let layers = ctx.store.count_active_by_layer(&context_id)?;
    let audited = ctx.store.has_audited_l2(&context_id)?;
    let derived_phase = derive_phase(&LayerCensus::from_counts(&layers, audited));
    let open_decisions = ctx
        .store
        .list_open_decisions(&context_id)?
        .into_iter()
        .map(DecisionSummary::from)
        .collect();

    let state = ctx.machine.state();
    Ok(StatusResult {
        phase: state.phase,
        active_role: state.active_role.as_ref().map(|a| a.role),
        session_id: state.active_role.as_ref().map(|a| a.session_id.clone()),
        threshold: state.threshold(),
        last_commit: state.last_commit.clone(),
        next_steps: next_steps(state.phase),
        context_id,
        derived_phase,
        layers,
        open_decisions,
    })
}

/// Handle `reset`
///
/// Operational only: no decision record is written. Open decisions are
/// reported so they are not forgotten.
pub(crate) fn handle_reset(ctx: &mut OpContext<'_>, params: ResetParams) -> Result<ResetResult, EngineError> {
    let reason = params
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "user requested reset".to_string());
    let context_id = ctx.context_id().to_string();
    let open_decisions: Vec<DecisionSummary> = ctx
        .store
        .list_open_decisions(&context_id)?
        .into_iter()
        .map(DecisionSummary::from)
        .collect();

    let previous_phase = ctx.machine.reset();
    ctx.mark_state_changed();
    tracing::info!(context = %context_id, from = %previous_phase, reason = %reason, open = open_decisions.len(), "Workflow reset");

    Ok(ResetResult {
        context_id,
        previous_phase,
        reason,
        open_decisions,
    })
}
