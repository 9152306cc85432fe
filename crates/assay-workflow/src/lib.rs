//! Assay Workflow
//!
//! Phase state machine for a bounded context.
//!
//! A context moves through `Idle → Abduction → Deduction → Induction →
//! (Audit) → Decision → Operation`. Every cross-phase move must match a row
//! of [`assay_domain::TRANSITIONS`] exactly, carry an evidence anchor fit for
//! the destination, and, when entering Operation, name a holon whose
//! reliability meets the context's assurance threshold.
//!
//! [`derive_phase`] is separate: it guesses a phase from knowledge counts for
//! status display and never gates a transition.
//!
//! # Examples
//!
//! ```no_run
//! use assay_domain::{EvidenceAnchor, Phase, Role, RoleAssignment};
//! use assay_store::SqliteStore;
//! use assay_workflow::{AnchorValidator, PhaseMachine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = SqliteStore::new("assay.db")?;
//! let mut machine = PhaseMachine::load(&store, "default", 0.8, AnchorValidator::new(".assay"))?;
//!
//! let anchor = EvidenceAnchor::at("notes/problem.md");
//! machine.transition(
//!     &mut store,
//!     1_700_000_000,
//!     Phase::Abduction,
//!     RoleAssignment::new(Role::Abductor, "session-1", "default"),
//!     Some(&anchor),
//! )?;
//! machine.save(&mut store, 1_700_000_000)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod anchor;
mod derive;
mod error;
mod machine;

pub use anchor::{expected_anchor, AnchorValidator};
pub use derive::{derive_phase, LayerCensus};
pub use error::WorkflowError;
pub use machine::{PhaseMachine, TransitionOutcome};
