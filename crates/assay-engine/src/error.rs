//! Error taxonomy for engine operations
//!
//! Failures are closed: the operation did not happen. Non-fatal problems are
//! reported as [`crate::IntegrityWarning`]s on a successful result instead.

use crate::config::ConfigError;
use assay_gatekeeper::GatekeeperError;
use assay_janitor::JanitorError;
use assay_store::StoreError;
use assay_workflow::WorkflowError;
use thiserror::Error;

/// Errors returned by [`crate::Engine`]
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed or unacceptable input
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong
        message: String,
        /// How to fix it
        hint: Option<String>,
    },

    /// A referenced record does not exist
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind
        kind: &'static str,
        /// Missing id
        id: String,
    },

    /// Illegal phase transition or role/phase mismatch
    #[error("State error: {message}")]
    State {
        /// What was refused
        message: String,
        /// What role, phase or artifact is required
        hint: Option<String>,
    },

    /// Reliability below the required threshold
    #[error(
        "Reliability of {holon_id} ({score:.2}) is below threshold ({threshold:.2}); weakest link: {}",
        .weakest_link.as_deref().unwrap_or("none")
    )]
    Threshold {
        /// Holon that was scored
        holon_id: String,
        /// Its final score
        score: f64,
        /// Required score
        threshold: f64,
        /// Dependency that limited the score
        weakest_link: Option<String>,
    },

    /// Storage failure
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Validation failure without a hint
    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation {
            message: message.into(),
            hint: None,
        }
    }

    /// Validation failure with a remediation hint
    pub fn validation_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        EngineError::Validation {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    /// Missing record
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        EngineError::NotFound { kind, id: id.into() }
    }

    /// Remediation hint, when one applies
    pub fn hint(&self) -> Option<String> {
        match self {
            EngineError::Validation { hint, .. } | EngineError::State { hint, .. } => hint.clone(),
            EngineError::NotFound { kind, .. } => {
                Some(format!("Check the {} id or create it first", kind))
            }
            EngineError::Threshold { weakest_link: Some(link), .. } => Some(format!(
                "Strengthen the evidence for '{}' or raise its congruence",
                link
            )),
            EngineError::Threshold { holon_id, .. } => {
                Some(format!("Record more reliable evidence for '{}'", holon_id))
            }
            EngineError::Store(_) | EngineError::Config(_) => None,
        }
    }

    /// Stable category name, used in audit rows
    pub fn category(&self) -> &'static str {
        match self {
            EngineError::Validation { .. } => "validation",
            EngineError::NotFound { .. } => "not_found",
            EngineError::State { .. } => "state",
            EngineError::Threshold { .. } => "threshold",
            EngineError::Store(_) => "store",
            EngineError::Config(_) => "config",
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => EngineError::NotFound { kind, id },
            StoreError::Validation(message) => EngineError::validation(message),
            StoreError::Duplicate(id) => EngineError::validation_with_hint(
                format!("holon '{}' already exists", id),
                "Choose a different title",
            ),
            StoreError::Database(e) => EngineError::Store(e.to_string()),
        }
    }
}

impl From<GatekeeperError> for EngineError {
    fn from(err: GatekeeperError) -> Self {
        let hint = err.suggestion();
        match err {
            GatekeeperError::NotFound { kind, id } => EngineError::NotFound { kind, id },
            GatekeeperError::Store(message) => EngineError::Store(message),
            e @ (GatekeeperError::RoleMismatch { .. } | GatekeeperError::PhaseNotAllowed { .. }) => {
                EngineError::State {
                    message: e.to_string(),
                    hint,
                }
            }
            e @ (GatekeeperError::UnknownOperation(_) | GatekeeperError::Precondition { .. }) => {
                EngineError::Validation {
                    message: e.to_string(),
                    hint,
                }
            }
        }
    }
}

impl From<WorkflowError> for EngineError {
    fn from(err: WorkflowError) -> Self {
        let hint = err.hint();
        match err {
            WorkflowError::Threshold {
                holon_id,
                score,
                threshold,
                weakest_link,
            } => EngineError::Threshold {
                holon_id,
                score,
                threshold,
                weakest_link,
            },
            WorkflowError::Store(message) => EngineError::Store(message),
            WorkflowError::UnknownHolon(id) => EngineError::NotFound { kind: "holon", id },
            e => EngineError::State {
                message: e.to_string(),
                hint,
            },
        }
    }
}

impl From<JanitorError> for EngineError {
    fn from(err: JanitorError) -> Self {
        match err {
            JanitorError::Store(message) => EngineError::Store(message),
            JanitorError::NotFound { kind, id } => EngineError::NotFound { kind, id },
            JanitorError::InvalidTransition(message) => EngineError::State {
                message,
                hint: Some("Only L2 and L1 holons can be deprecated".to_string()),
            },
            JanitorError::InvalidWaiver(message) => EngineError::validation(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assay_domain::{Phase, Role};

    #[test]
    fn test_threshold_message_names_weakest_link() {
        let err = EngineError::Threshold {
            holon_id: "root".to_string(),
            score: 0.75,
            threshold: 0.8,
            weakest_link: Some("cache-layer".to_string()),
        };
        let message = err.to_string();
        assert!(message.contains("0.75"));
        assert!(message.contains("0.80"));
        assert!(message.contains("cache-layer"));
        assert!(err.hint().is_some_and(|h| h.contains("cache-layer")));
    }

    #[test]
    fn test_store_mapping() {
        let err: EngineError = StoreError::Validation("holon x cannot relate to itself".into()).into();
        assert!(matches!(err, EngineError::Validation { .. }));

        let err: EngineError = StoreError::NotFound { kind: "holon", id: "x".into() }.into();
        assert_eq!(err.to_string(), "holon not found: x");

        let err: EngineError = StoreError::Duplicate("x".into()).into();
        assert_eq!(err.hint().as_deref(), Some("Choose a different title"));
    }

    #[test]
    fn test_gatekeeper_mapping() {
        let err: EngineError = GatekeeperError::RoleMismatch {
            operation: "verify",
            required: Role::Deductor,
            actual: Role::Observer,
        }
        .into();
        assert_eq!(err.category(), "state");
        assert_eq!(err.hint().as_deref(), Some("Act as Deductor for this operation"));

        let err: EngineError = GatekeeperError::UnknownOperation("fly".into()).into();
        assert_eq!(err.category(), "validation");
    }

    #[test]
    fn test_workflow_mapping() {
        let err: EngineError = WorkflowError::InvalidTransition {
            from: Phase::Idle,
            to: Phase::Induction,
            role: Role::Inductor,
        }
        .into();
        match &err {
            EngineError::State { message, hint } => {
                assert!(message.contains("IDLE -> INDUCTION"));
                assert!(hint.as_deref().is_some_and(|h| h.contains("ABDUCTION")));
            }
            other => panic!("Expected State, got {:?}", other),
        }

        let err: EngineError = WorkflowError::Threshold {
            holon_id: "h".into(),
            score: 0.1,
            threshold: 0.8,
            weakest_link: None,
        }
        .into();
        assert_eq!(err.category(), "threshold");

        let err: EngineError = WorkflowError::UnknownHolon("ghost".into()).into();
        assert!(matches!(err, EngineError::NotFound { kind: "holon", ref id } if id == "ghost"));
    }

    #[test]
    fn test_janitor_mapping() {
        let err: EngineError = JanitorError::InvalidWaiver("a rationale is required".into()).into();
        assert_eq!(err.category(), "validation");

        let err: EngineError = JanitorError::InvalidTransition("holon is in L0".into()).into();
        assert_eq!(err.category(), "state");
    }
}
