//! Assay Domain Layer
//!
//! Core model for the assurance pipeline: holons moving through layers,
//! the evidence and relations attached to them, and the rules that turn
//! those into a reliability score and a gated workflow.
//!
//! ## Key Concepts
//!
//! - **Holon**: a tracked hypothesis, claim or decision record
//! - **Layer**: assurance tier (L0 → L1 → L2, plus DRR and invalid)
//! - **Evidence**: append-only observations with an optional expiry
//! - **Relation**: typed edges; `componentOf`/`dependsOn` carry reliability
//! - **Reliability**: weakest-link score over evidence and dependencies
//! - **Phase**: workflow state of a bounded context
//!
//! ## Architecture
//!
//! Pure domain logic with trait definitions for persistence. The SQLite
//! implementation lives in `assay-store`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod evidence;
pub mod graph;
pub mod holon;
pub mod layer;
pub mod phase;
pub mod relation;
pub mod reliability;
pub mod traits;

// Re-exports for convenience
pub use evidence::{DecisionStatus, Evidence, EvidenceType, Verdict, Waiver};
pub use graph::would_create_cycle;
pub use holon::{new_record_id, slugify, Holon, HolonKind};
pub use layer::Layer;
pub use phase::{
    find_transition, EvidenceAnchor, Phase, Role, RoleAssignment, TransitionRule, WorkflowState,
    DEFAULT_ASSURANCE_THRESHOLD, TRANSITIONS,
};
pub use relation::{Relation, RelationType};
pub use reliability::{compute_reliability, ReliabilityReport};
