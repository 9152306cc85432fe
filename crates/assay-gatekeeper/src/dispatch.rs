//! Operation dispatch table

use crate::{GatekeeperConfig, GatekeeperError};
use assay_domain::{Phase, Role};
use std::fmt;

/// Every operation an external caller may invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create an L0 hypothesis
    Propose,
    /// Logical check of an L0 hypothesis
    Verify,
    /// Empirical check of an L1/L2 hypothesis
    Test,
    /// Audit report on an L2 hypothesis
    Audit,
    /// Record a decision
    Decide,
    /// Record the outcome of a decision
    Resolve,
    /// Create a relation between holons
    Link,
    /// Compute reliability of one holon
    CalculateR,
    /// Reliability tree of a holon and its parts
    AuditTree,
    /// Full-text search
    Search,
    /// Change the workflow phase
    Transition,
    /// Report workflow state and knowledge counts
    Status,
    /// Evidence freshness report
    CheckDecay,
    /// Suspend decay for one evidence item
    Waive,
    /// Demote a holon one layer
    Deprecate,
    /// Recompute every cached score
    RefreshScores,
    /// Return the context to Idle
    Reset,
}

impl Operation {
    /// External operation name
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Propose => "propose",
            Operation::Verify => "verify",
            Operation::Test => "test",
            Operation::Audit => "audit",
            Operation::Decide => "decide",
            Operation::Resolve => "resolve",
            Operation::Link => "link",
            Operation::CalculateR => "calculate_r",
            Operation::AuditTree => "audit_tree",
            Operation::Search => "search",
            Operation::Transition => "transition",
            Operation::Status => "status",
            Operation::CheckDecay => "check_decay",
            Operation::Waive => "waive",
            Operation::Deprecate => "deprecate",
            Operation::RefreshScores => "refresh_scores",
            Operation::Reset => "reset",
        }
    }

    /// Look an operation up by its external name
    pub fn parse(name: &str) -> Option<Self> {
        DISPATCH_TABLE
            .iter()
            .map(|rule| rule.operation)
            .find(|op| op.name() == name)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the dispatch table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationRule {
    /// The operation
    pub operation: Operation,

    /// Role required to invoke it ([`Role::Observer`] means any role)
    pub role: Role,

    /// Phases in which it may run when phase gates are enforced; `None` is unrestricted
    pub phases: Option<&'static [Phase]>,

    /// Whether the operation writes to the store
    pub mutating: bool,
}

const fn rule(
    operation: Operation,
    role: Role,
    phases: Option<&'static [Phase]>,
    mutating: bool,
) -> OperationRule {
    OperationRule {
        operation,
        role,
        phases,
        mutating,
    }
}

/// Static authorization table, one row per operation, in [`Operation`] order
///
/// `transition` is listed under Observer because the phase machine checks the
/// role against its own transition table.
pub const DISPATCH_TABLE: [OperationRule; 17] = [
    rule(Operation::Propose, Role::Abductor, Some(&[Phase::Idle, Phase::Abduction]), true),
    rule(Operation::Verify, Role::Deductor, Some(&[Phase::Abduction, Phase::Deduction]), true),
    rule(Operation::Test, Role::Inductor, Some(&[Phase::Deduction, Phase::Induction]), true),
    rule(Operation::Audit, Role::Auditor, Some(&[Phase::Induction, Phase::Audit]), true),
    rule(
        Operation::Decide,
        Role::Decider,
        Some(&[Phase::Induction, Phase::Audit, Phase::Decision]),
        true,
    ),
    rule(Operation::Resolve, Role::Observer, None, true),
    rule(Operation::Link, Role::Abductor, None, true),
    rule(Operation::CalculateR, Role::Observer, None, false),
    rule(Operation::AuditTree, Role::Observer, None, false),
    rule(Operation::Search, Role::Observer, None, false),
    rule(Operation::Transition, Role::Observer, None, true),
    rule(Operation::Status, Role::Observer, None, false),
    rule(Operation::CheckDecay, Role::Observer, None, false),
    rule(Operation::Waive, Role::Observer, None, true),
    rule(Operation::Deprecate, Role::Observer, None, true),
    rule(Operation::RefreshScores, Role::Maintainer, None, true),
    rule(Operation::Reset, Role::Maintainer, None, true),
];

/// The Gatekeeper authorizes operations before they reach the store
pub struct Gatekeeper {
    config: GatekeeperConfig,
}

impl Gatekeeper {
    /// Create a new Gatekeeper with the given configuration
    pub fn new(config: GatekeeperConfig) -> Self {
        Self { config }
    }

    /// Create a Gatekeeper with default configuration
    pub fn default_config() -> Self {
        Self::new(GatekeeperConfig::default())
    }

    /// Active configuration
    pub fn config(&self) -> &GatekeeperConfig {
        &self.config
    }

    /// Table row for an operation
    pub fn rule_for(operation: Operation) -> &'static OperationRule {
        // Rows are declared in variant order.
        &DISPATCH_TABLE[operation as usize]
    }

    /// Check that `role`, in `phase`, may invoke the operation named `name`
    ///
    /// Unknown names are rejected rather than defaulting to read access.
    pub fn authorize(
        &self,
        name: &str,
        role: Role,
        phase: Phase,
    ) -> Result<&'static OperationRule, GatekeeperError> {
        let operation = Operation::parse(name)
            .ok_or_else(|| GatekeeperError::UnknownOperation(name.to_string()))?;
        self.authorize_operation(operation, role, phase)
    }

    /// [`Gatekeeper::authorize`] for an already-parsed operation
    pub fn authorize_operation(
        &self,
        operation: Operation,
        role: Role,
        phase: Phase,
    ) -> Result<&'static OperationRule, GatekeeperError> {
        let rule = Self::rule_for(operation);

        if self.config.enforce_roles && !role.satisfies(rule.role) {
            return Err(GatekeeperError::RoleMismatch {
                operation: operation.name(),
                required: rule.role,
                actual: role,
            });
        }

        if self.config.enforce_phase_gates {
            if let Some(allowed) = rule.phases {
                if !allowed.contains(&phase) {
                    return Err(GatekeeperError::PhaseNotAllowed {
                        operation: operation.name(),
                        phase,
                        allowed,
                    });
                }
            }
        }

        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_operation_has_one_row() {
        for (index, rule) in DISPATCH_TABLE.iter().enumerate() {
            assert_eq!(rule.operation as usize, index);
            let count = DISPATCH_TABLE
                .iter()
                .filter(|other| other.operation == rule.operation)
                .count();
            assert_eq!(count, 1, "{} listed {} times", rule.operation, count);
            assert_eq!(Operation::parse(rule.operation.name()), Some(rule.operation));
            assert_eq!(Gatekeeper::rule_for(rule.operation), rule);
        }
    }

    #[test]
    fn test_unknown_operation_rejected() {
        let gatekeeper = Gatekeeper::default_config();
        let err = gatekeeper
            .authorize("drop_tables", Role::Maintainer, Phase::Idle)
            .unwrap_err();
        assert_eq!(err, GatekeeperError::UnknownOperation("drop_tables".to_string()));
    }

    #[test]
    fn test_role_required() {
        let gatekeeper = Gatekeeper::default_config();

        assert!(gatekeeper.authorize("propose", Role::Abductor, Phase::Idle).is_ok());

        let err = gatekeeper
            .authorize("propose", Role::Decider, Phase::Idle)
            .unwrap_err();
        match err {
            GatekeeperError::RoleMismatch { operation, required, actual } => {
                assert_eq!(operation, "propose");
                assert_eq!(required, Role::Abductor);
                assert_eq!(actual, Role::Decider);
            }
            other => panic!("Expected RoleMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_observer_operations_open_to_every_role() {
        let gatekeeper = Gatekeeper::default_config();
        for role in Role::ALL {
            assert!(gatekeeper.authorize("search", role, Phase::Audit).is_ok());
            assert!(gatekeeper.authorize("calculate_r", role, Phase::Idle).is_ok());
        }
    }

    #[test]
    fn test_maintainer_operations() {
        let gatekeeper = Gatekeeper::default_config();
        assert!(gatekeeper.authorize("reset", Role::Maintainer, Phase::Decision).is_ok());
        assert!(gatekeeper.authorize("reset", Role::Observer, Phase::Decision).is_err());
        assert!(gatekeeper
            .authorize("refresh_scores", Role::Decider, Phase::Idle)
            .is_err());
    }

    #[test]
    fn test_phase_gates_off_by_default() {
        let gatekeeper = Gatekeeper::default_config();
        assert!(gatekeeper.authorize("verify", Role::Deductor, Phase::Idle).is_ok());
    }

    #[test]
    fn test_phase_gates_when_enforced() {
        let gatekeeper = Gatekeeper::new(GatekeeperConfig::strict());

        assert!(gatekeeper.authorize("verify", Role::Deductor, Phase::Deduction).is_ok());

        let err = gatekeeper
            .authorize("verify", Role::Deductor, Phase::Idle)
            .unwrap_err();
        assert!(matches!(
            err,
            GatekeeperError::PhaseNotAllowed { phase: Phase::Idle, .. }
        ));

        // Unrestricted rows ignore the phase
        assert!(gatekeeper.authorize("waive", Role::Observer, Phase::Operation).is_ok());
    }

    #[test]
    fn test_permissive_skips_roles() {
        let gatekeeper = Gatekeeper::new(GatekeeperConfig::permissive());
        assert!(gatekeeper.authorize("decide", Role::Observer, Phase::Idle).is_ok());
    }

    #[test]
    fn test_mutating_flags() {
        assert!(Gatekeeper::rule_for(Operation::Propose).mutating);
        assert!(!Gatekeeper::rule_for(Operation::Search).mutating);
        assert!(!Gatekeeper::rule_for(Operation::AuditTree).mutating);
    }
}
