//! `propose`: record a new L0 hypothesis

use super::link::relate_or_warn;
use super::OpContext;
use crate::{EngineError, IntegrityWarning};
use assay_domain::traits::HolonStore;
use assay_domain::{slugify, Holon, HolonKind, Layer, Relation, RelationType};
use assay_gatekeeper::preconditions;
use serde::{Deserialize, Serialize};

/// Parameters for proposing a hypothesis
#[derive(Debug, Deserialize)]
pub struct ProposeParams {
    /// Title; the holon id is derived from it
    pub title: String,
    /// Hypothesis body
    pub content: String,
    /// `system` or `episteme`
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Scope of applicability
    #[serde(default)]
    pub scope: Option<String>,
    /// Why the hypothesis is worth checking
    #[serde(default)]
    pub rationale: Option<String>,
    /// Holon grouping the alternatives this one belongs to
    #[serde(default)]
    pub decision_context: Option<String>,
    /// Holons the new one is built from
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Congruence of the dependency edges (1-3, default 3)
    #[serde(default)]
    pub dependency_cl: Option<i64>,
}

fn default_kind() -> String {
    "system".to_string()
}

/// Result of proposing
#[derive(Debug, Serialize)]
pub struct ProposeResult {
    /// New holon id
    pub holon_id: String,
    /// Always L0
    pub layer: Layer,
    /// Parsed kind
    pub kind: HolonKind,
    /// Decision context linked through `memberOf`
    pub member_of: Option<String>,
    /// Dependencies linked through `componentOf`
    pub depends_on: Vec<String>,
}

/// Dependency congruence outside 1..=3 falls back to 3
fn dependency_level(level: Option<i64>) -> i64 {
    match level {
        Some(level @ 1..=3) => level,
        _ => 3,
    }
}

/// Handle `propose`
pub(crate) fn handle_propose(
    ctx: &mut OpContext<'_>,
    params: ProposeParams,
) -> Result<ProposeResult, EngineError> {
    let kind = preconditions::check_propose(&params.title, &params.content, &params.kind)?;
    let title = params.title.trim();
    let holon_id = slugify(title);
    if holon_id.is_empty() {
        return Err(EngineError::validation_with_hint(
            format!("title '{}' yields an empty id", title),
            "Use a title containing letters or digits",
        ));
    }

    let content = match params.rationale.as_deref().map(str::trim) {
        Some(rationale) if !rationale.is_empty() => {
            format!("{}\n\nRationale: {}", params.content.trim(), rationale)
        }
        _ => params.content.trim().to_string(),
    };
    let scope = params.scope.filter(|s| !s.trim().is_empty());
    let context_id = ctx.context_id().to_string();

    ctx.store.create_holon(Holon::new(
        holon_id.clone(),
        Some(kind),
        Layer::L0,
        title.to_string(),
        content,
        context_id,
        scope,
        ctx.now,
    ))?;
    tracing::info!(holon = %holon_id, kind = %kind, "Hypothesis proposed");

    let mut member_of = None;
    if let Some(group) = params.decision_context.filter(|g| !g.trim().is_empty()) {
        if ctx.store.holon_exists(&group)? {
            let edge = Relation::new(holon_id.clone(), RelationType::MemberOf, group.clone(), 3, ctx.now);
            if relate_or_warn(ctx, edge) {
                member_of = Some(group);
            }
        } else {
            ctx.warn(IntegrityWarning::MissingReference {
                record_kind: "holon".to_string(),
                id: group,
                skipped: "memberOf relation".to_string(),
            });
        }
    }

    let level = dependency_level(params.dependency_cl);
    let mut depends_on = Vec::new();
    for dependency in params.depends_on {
        if !ctx.store.holon_exists(&dependency)? {
            ctx.warn(IntegrityWarning::MissingReference {
                record_kind: "holon".to_string(),
                id: dependency,
                skipped: "componentOf relation".to_string(),
            });
            continue;
        }

        let edge = Relation::new(
            dependency.clone(),
            RelationType::ComponentOf,
            holon_id.clone(),
            level,
            ctx.now,
        );
        if relate_or_warn(ctx, edge) {
            depends_on.push(dependency);
        }
    }

    Ok(ProposeResult {
        holon_id,
        layer: Layer::L0,
        kind,
        member_of,
        depends_on,
    })
}
