//! Workflow error types

use assay_domain::{Phase, Role};
use thiserror::Error;

/// Reasons a phase transition is refused
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    /// No table row matches the requested change
    #[error("Invalid transition: {from} -> {to} by {role}")]
    InvalidTransition {
        /// Current phase
        from: Phase,
        /// Requested phase
        to: Phase,
        /// Requesting role
        role: Role,
    },

    /// Role may not re-enter the current phase
    #[error("Role {role} is not active in {phase} phase")]
    RoleNotActive {
        /// Current phase
        phase: Phase,
        /// Requesting role
        role: Role,
    },

    /// Evidence anchor missing or unusable
    #[error("Transition to {to} requires a valid evidence anchor: {reason}")]
    Anchor {
        /// Requested phase
        to: Phase,
        /// What was wrong with the anchor
        reason: String,
    },

    /// Entering Operation without naming a holon
    #[error("Transition to OPERATION requires a holon id in the evidence anchor")]
    MissingHolon,

    /// The anchor names a holon that does not exist
    #[error("holon not found: {0}")]
    UnknownHolon(String),

    /// Reliability below the assurance threshold
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

    /// Store failure while loading state or scoring
    #[error("Store error: {0}")]
    Store(String),
}

impl WorkflowError {
    /// What the caller needs to provide for the transition to succeed
    pub fn hint(&self) -> Option<String> {
        match self {
            WorkflowError::InvalidTransition { from, .. } => {
                let targets: Vec<String> = assay_domain::TRANSITIONS
                    .iter()
                    .filter(|rule| rule.from == *from)
                    .map(|rule| format!("{} (as {})", rule.to, rule.role))
                    .collect();
                Some(format!("From {} you can move to: {}", from, targets.join(", ")))
            }
            WorkflowError::RoleNotActive { phase, .. } => Some(format!(
                "Act as one of: {}",
                phase
                    .valid_roles()
                    .iter()
                    .map(Role::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            WorkflowError::Anchor { to, .. } => Some(crate::anchor::expected_anchor(*to).to_string()),
            WorkflowError::MissingHolon => {
                Some("Name the decided holon in the evidence anchor".to_string())
            }
            WorkflowError::UnknownHolon(_) => Some("Check the holon id in the evidence anchor".to_string()),
            WorkflowError::Threshold { weakest_link, .. } => Some(match weakest_link {
                Some(id) => format!("Strengthen the evidence for {}", id),
                None => "Add or refresh evidence for the holon".to_string(),
            }),
            WorkflowError::Store(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_names_triple() {
        let err = WorkflowError::InvalidTransition {
            from: Phase::Idle,
            to: Phase::Induction,
            role: Role::Inductor,
        };
        assert_eq!(err.to_string(), "Invalid transition: IDLE -> INDUCTION by Inductor");
        assert_eq!(
            err.hint().as_deref(),
            Some("From IDLE you can move to: ABDUCTION (as Abductor)")
        );
    }

    #[test]
    fn test_threshold_message() {
        let err = WorkflowError::Threshold {
            holon_id: "root".to_string(),
            score: 0.6,
            threshold: 0.8,
            weakest_link: Some("child".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("0.60"));
        assert!(msg.contains("0.80"));
        assert!(msg.contains("weakest link: child"));
    }
}
