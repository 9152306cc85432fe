//! Workflow phases, roles and the fixed transition table

use std::fmt;

/// Default reliability a holon needs before entering [`Phase::Operation`]
pub const DEFAULT_ASSURANCE_THRESHOLD: f64 = 0.8;

/// Workflow phase of a bounded context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Nothing in progress
    Idle,
    /// Generating hypotheses
    Abduction,
    /// Logical verification
    Deduction,
    /// Empirical validation
    Induction,
    /// Risk audit of validated holons
    Audit,
    /// Choosing among validated holons
    Decision,
    /// Decision in operation
    Operation,
}

impl Phase {
    /// All phases
    pub const ALL: [Phase; 7] = [
        Phase::Idle,
        Phase::Abduction,
        Phase::Deduction,
        Phase::Induction,
        Phase::Audit,
        Phase::Decision,
        Phase::Operation,
    ];

    /// Stored form
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "IDLE",
            Phase::Abduction => "ABDUCTION",
            Phase::Deduction => "DEDUCTION",
            Phase::Induction => "INDUCTION",
            Phase::Audit => "AUDIT",
            Phase::Decision => "DECISION",
            Phase::Operation => "OPERATION",
        }
    }

    /// Parse a phase (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        Phase::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
    }

    /// Roles allowed to re-enter this phase without an anchor
    pub fn valid_roles(&self) -> &'static [Role] {
        match self {
            Phase::Idle => &Role::ALL,
            Phase::Abduction => &[Role::Abductor],
            Phase::Deduction => &[Role::Deductor],
            Phase::Induction => &[Role::Inductor],
            Phase::Audit => &[Role::Auditor],
            Phase::Decision => &[Role::Decider, Role::Auditor],
            Phase::Operation => &[Role::Decider],
        }
    }

    /// Whether `role` may act within this phase
    pub fn admits(&self, role: Role) -> bool {
        self.valid_roles().contains(&role)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for Phase {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Role a caller acts under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Proposes hypotheses
    Abductor,
    /// Verifies hypotheses logically
    Deductor,
    /// Validates hypotheses empirically
    Inductor,
    /// Audits validated hypotheses
    Auditor,
    /// Records decisions
    Decider,
    /// Read-only access
    Observer,
    /// Maintenance (score refresh, cycle reset)
    Maintainer,
}

impl Role {
    /// All roles
    pub const ALL: [Role; 7] = [
        Role::Abductor,
        Role::Deductor,
        Role::Inductor,
        Role::Auditor,
        Role::Decider,
        Role::Observer,
        Role::Maintainer,
    ];

    /// Stored form
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Abductor => "Abductor",
            Role::Deductor => "Deductor",
            Role::Inductor => "Inductor",
            Role::Auditor => "Auditor",
            Role::Decider => "Decider",
            Role::Observer => "Observer",
            Role::Maintainer => "Maintainer",
        }
    }

    /// Parse a role (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
    }

    /// Whether this role meets a requirement for `required`
    ///
    /// Observer is the floor: every role may perform observer operations.
    pub fn satisfies(&self, required: Role) -> bool {
        required == Role::Observer || *self == required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A single legal phase change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    /// Phase being left
    pub from: Phase,
    /// Phase being entered
    pub to: Phase,
    /// Role authorized to make the change
    pub role: Role,
}

/// The complete set of cross-phase transitions
pub const TRANSITIONS: [TransitionRule; 9] = [
    TransitionRule { from: Phase::Idle, to: Phase::Abduction, role: Role::Abductor },
    TransitionRule { from: Phase::Abduction, to: Phase::Deduction, role: Role::Deductor },
    TransitionRule { from: Phase::Deduction, to: Phase::Induction, role: Role::Inductor },
    TransitionRule { from: Phase::Induction, to: Phase::Deduction, role: Role::Deductor },
    TransitionRule { from: Phase::Induction, to: Phase::Audit, role: Role::Auditor },
    TransitionRule { from: Phase::Induction, to: Phase::Decision, role: Role::Decider },
    TransitionRule { from: Phase::Audit, to: Phase::Decision, role: Role::Decider },
    TransitionRule { from: Phase::Decision, to: Phase::Idle, role: Role::Decider },
    TransitionRule { from: Phase::Decision, to: Phase::Operation, role: Role::Decider },
];

/// Find the table row matching `(from, to, role)` exactly
pub fn find_transition(from: Phase, to: Phase, role: Role) -> Option<&'static TransitionRule> {
    TRANSITIONS
        .iter()
        .find(|rule| rule.from == from && rule.to == to && rule.role == role)
}

/// Binds a session to a role within a bounded context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    /// Role held
    pub role: Role,
    /// Session holding the role
    pub session_id: String,
    /// Bounded context
    pub context_id: String,
}

impl RoleAssignment {
    /// Create a role assignment
    pub fn new(role: Role, session_id: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            role,
            session_id: session_id.into(),
            context_id: context_id.into(),
        }
    }
}

/// Durable artifact reference justifying a phase change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceAnchor {
    /// Anchor kind (free-form, e.g. "hypotheses", "validation")
    pub kind: String,
    /// Location of the artifact
    pub uri: String,
    /// Short description
    pub description: String,
    /// Holon the transition concerns (required for Operation)
    pub holon_id: Option<String>,
}

impl EvidenceAnchor {
    /// Anchor pointing at an artifact location
    pub fn at(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    /// Anchor naming a holon
    pub fn for_holon(holon_id: impl Into<String>) -> Self {
        Self {
            holon_id: Some(holon_id.into()),
            ..Default::default()
        }
    }
}

/// Persisted workflow state of one bounded context
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowState {
    /// Bounded context key
    pub context_id: String,
    /// Current phase
    pub phase: Phase,
    /// Active role assignment, if any
    pub active_role: Option<RoleAssignment>,
    /// Last externally observed change marker (e.g. a commit id)
    pub last_commit: Option<String>,
    /// Assurance threshold; values <= 0 mean "use the default"
    pub assurance_threshold: f64,
}

impl WorkflowState {
    /// Fresh state for a context: Idle, no role
    pub fn idle(context_id: impl Into<String>, assurance_threshold: f64) -> Self {
        Self {
            context_id: context_id.into(),
            phase: Phase::Idle,
            active_role: None,
            last_commit: None,
            assurance_threshold,
        }
    }

    /// Effective threshold for entering Operation
    pub fn threshold(&self) -> f64 {
        if self.assurance_threshold <= 0.0 {
            DEFAULT_ASSURANCE_THRESHOLD
        } else {
            self.assurance_threshold
        }
    }
}
