//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! The SQLite implementation lives in `assay-store`.

use crate::{Evidence, Holon, Layer, Relation, Waiver, WorkflowState};

/// Read access to the holon graph needed by the reliability calculator
///
/// The only mutation is the best-effort score cache write.
pub trait HolonGraph {
    /// Error type for graph operations
    type Error;

    /// Whether a holon with this id exists
    fn holon_exists(&self, holon_id: &str) -> Result<bool, Self::Error>;

    /// All evidence rows for a holon, unfiltered
    fn get_evidence(&self, holon_id: &str) -> Result<Vec<Evidence>, Self::Error>;

    /// The waiver covering `evidence_id` that is still active at `now`
    fn get_active_waiver_for_evidence(
        &self,
        evidence_id: &str,
        now: u64,
    ) -> Result<Option<Waiver>, Self::Error>;

    /// Reliability-carrying edges on which `holon_id` depends
    ///
    /// The union of `componentOf` edges targeting the holon and `dependsOn`
    /// edges sourced at it.
    fn get_dependencies(&self, holon_id: &str) -> Result<Vec<Relation>, Self::Error>;

    /// `componentOf` edges whose target is `holon_id`
    fn get_components_of(&self, holon_id: &str) -> Result<Vec<Relation>, Self::Error>;

    /// Persist a freshly computed score
    fn cache_reliability(&mut self, holon_id: &str, score: f64) -> Result<(), Self::Error>;
}

/// Trait for storing and retrieving holons, evidence, relations and waivers
///
/// Implemented by the infrastructure layer (assay-store)
pub trait HolonStore: HolonGraph {
    /// Insert a new holon; fails if the id already exists
    fn create_holon(&mut self, holon: Holon) -> Result<(), Self::Error>;

    /// Get a holon by id
    fn find_holon(&self, id: &str) -> Result<Option<Holon>, Self::Error>;

    /// Move a holon to another layer (idempotent)
    fn update_holon_layer(&mut self, id: &str, layer: Layer, now: u64) -> Result<(), Self::Error>;

    /// Query holons matching criteria
    fn list_holons(&self, query: &HolonQuery) -> Result<Vec<Holon>, Self::Error>;

    /// Insert a relation; fails on self-relations
    fn create_relation(&mut self, relation: Relation) -> Result<(), Self::Error>;

    /// `memberOf` edges whose target is `holon_id`
    fn get_collection_members(&self, holon_id: &str) -> Result<Vec<Relation>, Self::Error>;

    /// Append an evidence row
    fn add_evidence(&mut self, evidence: Evidence) -> Result<(), Self::Error>;

    /// Get an evidence row by id
    fn get_evidence_by_id(&self, id: &str) -> Result<Option<Evidence>, Self::Error>;

    /// Evidence whose `valid_until` falls before `until`, soonest first
    ///
    /// Waivers are not applied; callers decide what an active waiver means.
    fn list_evidence_expiring_before(&self, until: u64) -> Result<Vec<Evidence>, Self::Error>;

    /// Insert a waiver
    fn create_waiver(&mut self, waiver: Waiver) -> Result<(), Self::Error>;

    /// All waivers active at `now`
    fn list_active_waivers(&self, now: u64) -> Result<Vec<Waiver>, Self::Error>;
}

/// Persistence for context-keyed workflow state
pub trait WorkflowStateStore {
    /// Error type for state operations
    type Error;

    /// Load the stored state for a context, if any
    fn load_state(&self, context_id: &str) -> Result<Option<WorkflowState>, Self::Error>;

    /// Insert or replace the state for `state.context_id`
    fn save_state(&mut self, state: &WorkflowState, now: u64) -> Result<(), Self::Error>;
}

/// Query criteria for listing holons
#[derive(Debug, Clone, Default)]
pub struct HolonQuery {
    /// Filter by bounded context
    pub context_id: Option<String>,

    /// Filter by layer
    pub layer: Option<Layer>,

    /// Maximum results to return
    pub limit: Option<usize>,
}

impl HolonQuery {
    /// Every holon in a context
    pub fn in_context(context_id: impl Into<String>) -> Self {
        Self {
            context_id: Some(context_id.into()),
            ..Default::default()
        }
    }

    /// Restrict to one layer
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layer = Some(layer);
        self
    }
}
