//! Phase state machine for one bounded context

use crate::{AnchorValidator, WorkflowError};
use assay_domain::traits::{HolonGraph, WorkflowStateStore};
use assay_domain::{
    compute_reliability, find_transition, EvidenceAnchor, Phase, ReliabilityReport,
    RoleAssignment, WorkflowState,
};
use std::fmt::Display;

/// Result of an accepted transition
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    /// Phase before the transition
    pub from: Phase,
    /// Phase after the transition
    pub to: Phase,
    /// Reliability report computed for the Operation gate
    pub report: Option<ReliabilityReport>,
}

/// Holds the workflow state of a context and authorizes changes to it
///
/// State is loaded explicitly, mutated only by an accepted transition or a
/// reset, and written back with [`PhaseMachine::save`].
#[derive(Debug, Clone)]
pub struct PhaseMachine {
    state: WorkflowState,
    anchors: AnchorValidator,
}

impl PhaseMachine {
    /// Wrap an already loaded state
    pub fn new(state: WorkflowState, anchors: AnchorValidator) -> Self {
        Self { state, anchors }
    }

    /// Load the state of `context_id`; a context with no stored state starts Idle
    pub fn load<S>(
        store: &S,
        context_id: &str,
        default_threshold: f64,
        anchors: AnchorValidator,
    ) -> Result<Self, WorkflowError>
    where
        S: WorkflowStateStore,
        S::Error: Display,
    {
        let state = store
            .load_state(context_id)
            .map_err(|e| WorkflowError::Store(format!("Failed to load workflow state: {}", e)))?
            .unwrap_or_else(|| WorkflowState::idle(context_id, default_threshold));
        Ok(Self::new(state, anchors))
    }

    /// Persist the current state
    pub fn save<S>(&self, store: &mut S, now: u64) -> Result<(), WorkflowError>
    where
        S: WorkflowStateStore,
        S::Error: Display,
    {
        store
            .save_state(&self.state, now)
            .map_err(|e| WorkflowError::Store(format!("Failed to save workflow state: {}", e)))
    }

    /// Current state
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Check whether `assignment` may move the context into `target`
    ///
    /// Read-only apart from the score cache written while evaluating the
    /// Operation gate. Returns the report computed for that gate.
    pub fn check_transition<G>(
        &self,
        graph: &mut G,
        now: u64,
        target: Phase,
        assignment: &RoleAssignment,
        anchor: Option<&EvidenceAnchor>,
    ) -> Result<Option<ReliabilityReport>, WorkflowError>
    where
        G: HolonGraph,
        G::Error: Display,
    {
        let from = self.state.phase;
        let role = assignment.role;

        if from == target {
            return if from.admits(role) {
                Ok(None)
            } else {
                Err(WorkflowError::RoleNotActive { phase: from, role })
            };
        }

        if find_transition(from, target, role).is_none() {
            return Err(WorkflowError::InvalidTransition { from, to: target, role });
        }

        self.anchors
            .validate(target, anchor)
            .map_err(|reason| WorkflowError::Anchor { to: target, reason })?;

        if target != Phase::Operation {
            return Ok(None);
        }

        let holon_id = anchor
            .and_then(|a| a.holon_id.as_deref())
            .filter(|id| !id.trim().is_empty())
            .ok_or(WorkflowError::MissingHolon)?;

        let exists = graph
            .holon_exists(holon_id)
            .map_err(|e| WorkflowError::Store(format!("Failed to look up holon: {}", e)))?;
        if !exists {
            return Err(WorkflowError::UnknownHolon(holon_id.to_string()));
        }

        let report = compute_reliability(graph, holon_id, now)
            .map_err(|e| WorkflowError::Store(format!("Failed to calculate reliability: {}", e)))?;

        let threshold = self.state.threshold();
        if report.final_score < threshold {
            return Err(WorkflowError::Threshold {
                holon_id: holon_id.to_string(),
                score: report.final_score,
                threshold,
                weakest_link: report.weakest_link.clone(),
            });
        }

        Ok(Some(report))
    }

    /// `(allowed, reason)` form of [`PhaseMachine::check_transition`]
    pub fn can_transition<G>(
        &self,
        graph: &mut G,
        now: u64,
        target: Phase,
        assignment: &RoleAssignment,
        anchor: Option<&EvidenceAnchor>,
    ) -> (bool, String)
    where
        G: HolonGraph,
        G::Error: Display,
    {
        match self.check_transition(graph, now, target, assignment, anchor) {
            Ok(_) => (true, "OK".to_string()),
            Err(e) => (false, e.to_string()),
        }
    }

    /// Check and, if allowed, apply a transition
    ///
    /// A rejected transition leaves the state untouched.
    pub fn transition<G>(
        &mut self,
        graph: &mut G,
        now: u64,
        target: Phase,
        assignment: RoleAssignment,
        anchor: Option<&EvidenceAnchor>,
    ) -> Result<TransitionOutcome, WorkflowError>
    where
        G: HolonGraph,
        G::Error: Display,
    {
        let from = self.state.phase;
        let report = match self.check_transition(graph, now, target, &assignment, anchor) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(
                    context = %self.state.context_id,
                    from = %from,
                    to = %target,
                    role = %assignment.role,
                    error = %e,
                    "Transition rejected"
                );
                return Err(e);
            }
        };

        self.state.phase = target;
        self.state.active_role = Some(assignment);
        tracing::info!(context = %self.state.context_id, from = %from, to = %target, "Phase changed");

        Ok(TransitionOutcome { from, to: target, report })
    }

    /// Return to Idle and clear the role, whatever the current phase
    pub fn reset(&mut self) -> Phase {
        let previous = self.state.phase;
        self.state.phase = Phase::Idle;
        self.state.active_role = None;
        tracing::info!(context = %self.state.context_id, from = %previous, "Cycle reset");
        previous
    }

    /// Record an externally observed change marker
    pub fn set_last_commit(&mut self, marker: impl Into<String>) {
        self.state.last_commit = Some(marker.into());
    }

    /// Override the assurance threshold of this context
    ///
    /// Values outside (0, 1] are ignored.
    pub fn set_threshold(&mut self, threshold: f64) {
        if threshold > 0.0 && threshold <= 1.0 {
            self.state.assurance_threshold = threshold;
        }
    }
}
