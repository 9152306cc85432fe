//! Gatekeeper error types

use assay_domain::{Phase, Role};
use thiserror::Error;

/// Errors that can occur during gatekeeper checks
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatekeeperError {
    /// Operation name is not in the dispatch table
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Caller's role does not satisfy the operation's requirement
    #[error("Operation '{operation}' requires role {required}, caller is {actual}")]
    RoleMismatch {
        /// Operation name
        operation: &'static str,
        /// Role the table requires
        required: Role,
        /// Role the caller holds
        actual: Role,
    },

    /// Operation is restricted to other phases
    #[error("Operation '{operation}' is not allowed in phase {phase}")]
    PhaseNotAllowed {
        /// Operation name
        operation: &'static str,
        /// Current phase
        phase: Phase,
        /// Phases that admit the operation
        allowed: &'static [Phase],
    },

    /// A semantic precondition failed
    #[error("{operation}: {condition}")]
    Precondition {
        /// Operation name
        operation: &'static str,
        /// What was wrong
        condition: String,
        /// How to fix it
        suggestion: String,
    },

    /// A referenced record does not exist
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind
        kind: &'static str,
        /// Missing id
        id: String,
    },

    /// Store error during a precondition check
    #[error("Store error: {0}")]
    Store(String),
}

impl GatekeeperError {
    /// Remediation hint, when one applies
    pub fn suggestion(&self) -> Option<String> {
        match self {
            GatekeeperError::UnknownOperation(_) => {
                Some("Use one of the operations listed in the dispatch table".to_string())
            }
            GatekeeperError::RoleMismatch { required, .. } => {
                Some(format!("Act as {} for this operation", required))
            }
            GatekeeperError::PhaseNotAllowed { allowed, .. } => Some(format!(
                "Transition to one of: {}",
                allowed.iter().map(Phase::as_str).collect::<Vec<_>>().join(", ")
            )),
            GatekeeperError::Precondition { suggestion, .. } => Some(suggestion.clone()),
            GatekeeperError::NotFound { kind, .. } => {
                Some(format!("Check the {} id or create it first", kind))
            }
            GatekeeperError::Store(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_message_and_suggestion() {
        let err = GatekeeperError::Precondition {
            operation: "verify",
            condition: "holon 'x' is in L1, expected L0".to_string(),
            suggestion: "Only L0 holons can be verified".to_string(),
        };
        assert_eq!(err.to_string(), "verify: holon 'x' is in L1, expected L0");
        assert_eq!(err.suggestion().as_deref(), Some("Only L0 holons can be verified"));
    }

    #[test]
    fn test_phase_suggestion_lists_phases() {
        let err = GatekeeperError::PhaseNotAllowed {
            operation: "verify",
            phase: Phase::Idle,
            allowed: &[Phase::Abduction, Phase::Deduction],
        };
        assert_eq!(
            err.suggestion().as_deref(),
            Some("Transition to one of: ABDUCTION, DEDUCTION")
        );
    }
}
