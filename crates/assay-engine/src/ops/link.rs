//! `link`: create a typed relation between two holons

use super::{required, OpContext};
use crate::{EngineError, IntegrityWarning};
use assay_domain::relation::DEFAULT_CONGRUENCE;
use assay_domain::traits::HolonStore;
use assay_domain::{would_create_cycle, Relation, RelationType};
use serde::{Deserialize, Serialize};

/// Parameters for linking two holons
#[derive(Debug, Deserialize)]
pub struct LinkParams {
    /// Source holon
    pub source_id: String,
    /// Relation type (`componentOf`, `dependsOn`, `memberOf`, ...)
    pub relation_type: String,
    /// Target holon
    pub target_id: String,
    /// Congruence level 0-3; out-of-range values fall back to 3
    #[serde(default)]
    pub congruence_level: Option<i64>,
}

/// Result of linking
#[derive(Debug, Serialize)]
pub struct LinkResult {
    /// Source holon
    pub source_id: String,
    /// Relation type as stored
    pub relation_type: String,
    /// Target holon
    pub target_id: String,
    /// Level actually stored
    pub congruence_level: u8,
    /// False when the edge was skipped to avoid a cycle
    pub created: bool,
}

/// What happened to a requested relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Linked {
    Created,
    SkippedCycle,
}

/// Create `relation` unless it would close a dependency cycle
///
/// A would-be cycle is not an error: the edge is skipped and a warning
/// raised. Self-relations and store failures are errors.
pub(crate) fn relate(ctx: &mut OpContext<'_>, relation: Relation) -> Result<Linked, EngineError> {
    if relation.is_self_relation() {
        return Err(EngineError::validation(format!(
            "holon {} cannot relate to itself",
            relation.source_id
        )));
    }

    if would_create_cycle(&*ctx.store, &relation)? {
        ctx.warn(IntegrityWarning::RelationSkippedCycle {
            source_id: relation.source_id,
            target_id: relation.target_id,
            relation_type: relation.relation_type.to_string(),
        });
        return Ok(Linked::SkippedCycle);
    }

    tracing::debug!(
        source = %relation.source_id,
        relation = %relation.relation_type,
        target = %relation.target_id,
        cl = relation.congruence_level,
        "Creating relation"
    );
    ctx.store.create_relation(relation)?;
    Ok(Linked::Created)
}

/// [`relate`] for optional edges: any failure becomes a warning
pub(crate) fn relate_or_warn(ctx: &mut OpContext<'_>, relation: Relation) -> bool {
    let (source_id, target_id, relation_type) = (
        relation.source_id.clone(),
        relation.target_id.clone(),
        relation.relation_type.to_string(),
    );
    match relate(ctx, relation) {
        Ok(Linked::Created) => true,
        Ok(Linked::SkippedCycle) => false,
        Err(e) => {
            ctx.warn(IntegrityWarning::RelationFailed {
                source_id,
                target_id,
                relation_type,
                reason: e.to_string(),
            });
            false
        }
    }
}

/// Handle `link`
pub(crate) fn handle_link(ctx: &mut OpContext<'_>, params: LinkParams) -> Result<LinkResult, EngineError> {
    let source_id = required("source_id", &params.source_id)?.to_string();
    let target_id = required("target_id", &params.target_id)?.to_string();
    let relation_type = RelationType::parse(required("relation_type", &params.relation_type)?);

    let relation = Relation::new(
        source_id,
        relation_type,
        target_id,
        params.congruence_level.unwrap_or(i64::from(DEFAULT_CONGRUENCE)),
        ctx.now,
    );
    // A self-relation is invalid whether or not the holon exists
    if relation.is_self_relation() {
        return Err(EngineError::validation(format!(
            "holon {} cannot relate to itself",
            relation.source_id
        )));
    }
    for id in [&relation.source_id, &relation.target_id] {
        if !ctx.store.holon_exists(id)? {
            return Err(EngineError::not_found("holon", id.as_str()));
        }
    }
    let result = LinkResult {
        source_id: relation.source_id.clone(),
        relation_type: relation.relation_type.to_string(),
        target_id: relation.target_id.clone(),
        congruence_level: relation.congruence_level,
        created: false,
    };

    let created = relate(ctx, relation)? == Linked::Created;
    Ok(LinkResult { created, ..result })
}
