//! `decide` and `resolve`: decision records and their outcomes

use super::link::relate_or_warn;
use super::{required, OpContext};
use crate::dates::parse_optional_date;
use crate::{EngineError, IntegrityWarning};
use assay_domain::traits::HolonStore;
use assay_domain::{
    new_record_id, slugify, DecisionStatus, Evidence, EvidenceType, Holon, Layer, Relation,
    RelationType, Verdict,
};
use assay_gatekeeper::preconditions;
use serde::{Deserialize, Serialize};

/// Parameters for recording a decision
#[derive(Debug, Deserialize)]
pub struct DecideParams {
    /// Decision title; the DRR id is derived from it
    pub title: String,
    /// Selected hypothesis
    pub winner_id: String,
    /// Alternatives that lost
    #[serde(default)]
    pub rejected_ids: Vec<String>,
    /// Problem being decided
    #[serde(default)]
    pub context: String,
    /// What was decided
    #[serde(default)]
    pub decision: String,
    /// Why
    #[serde(default)]
    pub rationale: String,
    /// Expected consequences
    #[serde(default)]
    pub consequences: String,
}

/// Result of deciding
#[derive(Debug, Serialize)]
pub struct DecideResult {
    /// New decision record
    pub drr_id: String,
    /// Selected hypothesis
    pub winner_id: String,
    /// Alternatives linked through `rejects`
    pub rejected: Vec<String>,
    /// Winner's layer after the decision
    pub winner_layer: Layer,
}

/// Parameters for resolving a decision
#[derive(Debug, Deserialize)]
pub struct ResolveParams {
    /// DRR being resolved
    pub decision_id: String,
    /// `implemented`, `abandoned` or `superseded`
    pub resolution: String,
    /// Commit, PR or other reference (required for `implemented`)
    #[serde(default)]
    pub reference: Option<String>,
    /// Replacing DRR (required for `superseded`)
    #[serde(default)]
    pub superseded_by: Option<String>,
    /// Notes (required for `abandoned`)
    #[serde(default)]
    pub notes: Option<String>,
    /// Optional expiry of the resolution evidence
    #[serde(default)]
    pub valid_until: Option<String>,
}

/// Result of resolving
#[derive(Debug, Serialize)]
pub struct ResolveResult {
    /// DRR resolved
    pub decision_id: String,
    /// Its title
    pub title: String,
    /// Recorded outcome
    pub resolution: DecisionStatus,
    /// Resolution evidence
    pub evidence_id: String,
}

fn decision_body(params: &DecideParams) -> String {
    let mut body = format!("# {}\n\n", params.title.trim());
    let sections = [
        ("Context", params.context.as_str()),
        ("Decision", params.decision.as_str()),
        ("Rationale", params.rationale.as_str()),
        ("Consequences", params.consequences.as_str()),
    ];
    for (heading, text) in sections {
        let text = text.trim();
        if !text.is_empty() {
            body.push_str(&format!("## {}\n{}\n\n", heading, text));
        }
    }
    body.push_str(&format!("Selected: {}\n", params.winner_id.trim()));
    body
}

/// Handle `decide`
pub(crate) fn handle_decide(ctx: &mut OpContext<'_>, params: DecideParams) -> Result<DecideResult, EngineError> {
    let context_id = ctx.context_id().to_string();
    let winner = preconditions::check_decide(
        &*ctx.store,
        &ctx.config.gatekeeper,
        &context_id,
        params.winner_id.trim(),
        &params.title,
    )?;

    let title = params.title.trim();
    let drr_id = slugify(title);
    if drr_id.is_empty() {
        return Err(EngineError::validation_with_hint(
            format!("title '{}' yields an empty id", title),
            "Use a title containing letters or digits",
        ));
    }

    ctx.store.create_holon(Holon::new(
        drr_id.clone(),
        None,
        Layer::Drr,
        title.to_string(),
        decision_body(&params),
        context_id,
        None,
        ctx.now,
    ))?;
    tracing::info!(drr = %drr_id, winner = %winner.id, "Decision recorded");

    let selects = Relation::new(drr_id.clone(), RelationType::Selects, winner.id.clone(), 3, ctx.now);
    relate_or_warn(ctx, selects);

    let mut rejected = Vec::new();
    for rejected_id in params.rejected_ids {
        let rejected_id = rejected_id.trim().to_string();
        if rejected_id.is_empty() || rejected_id == winner.id {
            continue;
        }
        if !ctx.store.holon_exists(&rejected_id)? {
            ctx.warn(IntegrityWarning::MissingReference {
                record_kind: "holon".to_string(),
                id: rejected_id,
                skipped: "rejects relation".to_string(),
            });
            continue;
        }
        let edge = Relation::new(drr_id.clone(), RelationType::Rejects, rejected_id.clone(), 3, ctx.now);
        if relate_or_warn(ctx, edge) {
            rejected.push(rejected_id);
        }
    }

    let mut winner_layer = winner.layer;
    if winner.layer == Layer::L1 {
        match ctx.store.update_holon_layer(&winner.id, Layer::L2, ctx.now) {
            Ok(()) => {
                tracing::info!(holon = %winner.id, "Winner promoted to L2");
                winner_layer = Layer::L2;
            }
            Err(e) => ctx.warn(IntegrityWarning::PromotionFailed {
                holon_id: winner.id.clone(),
                reason: e.to_string(),
            }),
        }
    }

    Ok(DecideResult {
        drr_id,
        winner_id: winner.id,
        rejected,
        winner_layer,
    })
}

fn load_decision(ctx: &OpContext<'_>, id: &str, role: &str) -> Result<Holon, EngineError> {
    let holon = ctx
        .store
        .find_holon(id)?
        .ok_or_else(|| EngineError::not_found("decision", id))?;
    if holon.layer != Layer::Drr {
        return Err(EngineError::validation_with_hint(
            format!("{} '{}' is in {}, not a decision record", role, id, holon.layer),
            "Resolve decision records created by decide",
        ));
    }
    Ok(holon)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Handle `resolve`
///
/// A decision is resolved at most once; the outcome is stored as evidence
/// of type `implementation`, `abandonment` or `supersession`.
pub(crate) fn handle_resolve(ctx: &mut OpContext<'_>, params: ResolveParams) -> Result<ResolveResult, EngineError> {
    let decision_id = required("decision_id", &params.decision_id)?.to_string();
    let decision = load_decision(ctx, &decision_id, "holon")?;

    let invalid_resolution = || {
        EngineError::validation_with_hint(
            format!("invalid resolution '{}'", params.resolution),
            "Use implemented, abandoned or superseded",
        )
    };
    let resolution = DecisionStatus::parse(params.resolution.trim()).ok_or_else(invalid_resolution)?;

    let notes = non_empty(&params.notes);
    let (content, carrier_ref, successor) = match resolution {
        DecisionStatus::Open => return Err(invalid_resolution()),
        DecisionStatus::Implemented => {
            let reference = non_empty(&params.reference).ok_or_else(|| {
                EngineError::validation_with_hint(
                    "reference is required for an implemented decision",
                    "Give a reference such as commit:SHA or pr:NUM",
                )
            })?;
            let content = notes.unwrap_or("Decision implemented").to_string();
            (content, Some(reference.to_string()), None)
        }
        DecisionStatus::Abandoned => {
            let notes = notes.ok_or_else(|| {
                EngineError::validation_with_hint(
                    "notes are required for an abandoned decision",
                    "Explain why the decision was abandoned",
                )
            })?;
            (notes.to_string(), None, None)
        }
        DecisionStatus::Superseded => {
            let successor = non_empty(&params.superseded_by).ok_or_else(|| {
                EngineError::validation_with_hint(
                    "superseded_by is required for a superseded decision",
                    "Name the decision record that replaces this one",
                )
            })?;
            if successor == decision_id {
                return Err(EngineError::validation(format!(
                    "decision '{}' cannot supersede itself",
                    decision_id
                )));
            }
            load_decision(ctx, successor, "superseding holon")?;
            let content = notes
                .map(str::to_string)
                .unwrap_or_else(|| format!("Superseded by {}", successor));
            (
                content,
                Some(format!("superseded_by:{}", successor)),
                Some(successor.to_string()),
            )
        }
    };

    if let Some(existing) = ctx.store.resolution_of(&decision_id)? {
        return Err(EngineError::State {
            message: format!("decision '{}' is already resolved as {}", decision_id, existing),
            hint: Some("Record a new decision and supersede this one instead".to_string()),
        });
    }

    let valid_until = parse_optional_date(params.valid_until.as_deref())?;
    let evidence_type = resolution
        .evidence_type()
        .map(EvidenceType::parse)
        .ok_or_else(|| EngineError::validation("open is not a resolution"))?;

    let evidence_id = new_record_id();
    ctx.store.add_evidence(Evidence {
        id: evidence_id.clone(),
        holon_id: decision_id.clone(),
        evidence_type,
        content,
        verdict: Verdict::Pass,
        assurance_level: None,
        carrier_ref,
        valid_until,
        created_at: ctx.now,
    })?;
    tracing::info!(decision = %decision_id, resolution = %resolution, "Decision resolved");

    if let Some(successor) = successor {
        let edge = Relation::new(decision_id.clone(), RelationType::SupersededBy, successor, 3, ctx.now);
        relate_or_warn(ctx, edge);
    }

    Ok(ResolveResult {
        decision_id,
        title: decision.title,
        resolution,
        evidence_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::fixture::{Fixture, NOW};
    use assay_domain::traits::HolonGraph;
    use assay_domain::Role;

    fn decide(json: &str) -> DecideParams {
        serde_json::from_str(json).unwrap()
    }

    fn resolve(json: &str) -> ResolveParams {
        serde_json::from_str(json).unwrap()
    }

    /// Context with a validated winner, an L1 runner-up and one decision
    fn decided() -> Fixture {
        let mut fx = Fixture::new();
        fx.holon("redis", Layer::L2);
        fx.holon("memcached", Layer::L1);
        let mut ctx = fx.ctx(Role::Decider);
        handle_decide(
            &mut ctx,
            decide(r#"{"title": "Cache Choice", "winner_id": "redis", "rejected_ids": ["memcached"]}"#),
        )
        .unwrap();
        fx
    }

    #[test]
    fn test_decide_params_deserialize() {
        let p = decide(r#"{"title": "T", "winner_id": "w"}"#);
        assert!(p.rejected_ids.is_empty());
        assert!(p.rationale.is_empty());
    }

    #[test]
    fn test_decide_creates_drr_and_edges() {
        let mut fx = Fixture::new();
        fx.holon("redis", Layer::L2);
        fx.holon("memcached", Layer::L1);
        let mut ctx = fx.ctx(Role::Decider);

        let result = handle_decide(
            &mut ctx,
            decide(
                r#"{"title": "Cache Choice", "winner_id": "redis",
                    "rejected_ids": ["memcached", "redis", "", "ghost"], "rationale": "fast"}"#,
            ),
        )
        .unwrap();
        assert_eq!(result.drr_id, "cache-choice");
        assert_eq!(result.rejected, vec!["memcached"]);
        assert_eq!(result.winner_layer, Layer::L2);

        let warnings = ctx.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(&warnings[0], IntegrityWarning::MissingReference { id, .. } if id == "ghost"));

        let drr = fx.store.get_holon("cache-choice").unwrap();
        assert_eq!(drr.layer, Layer::Drr);
        assert_eq!(drr.kind, None);
        assert!(drr.content.contains("## Rationale\nfast"));

        let edges = fx.store.get_relations("cache-choice").unwrap();
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().any(|r| r.relation_type == RelationType::Selects && r.target_id == "redis"));
        assert!(edges.iter().any(|r| r.relation_type == RelationType::Rejects && r.target_id == "memcached"));
    }

    #[test]
    fn test_decide_promotes_l1_winner() {
        let mut fx = Fixture::new();
        fx.holon("validated", Layer::L2);
        fx.holon("candidate", Layer::L1);
        let mut ctx = fx.ctx(Role::Decider);

        let result = handle_decide(&mut ctx, decide(r#"{"title": "Pick", "winner_id": "candidate"}"#)).unwrap();
        assert_eq!(result.winner_layer, Layer::L2);
        assert_eq!(fx.store.get_holon("candidate").unwrap().layer, Layer::L2);
    }

    #[test]
    fn test_decide_requires_l2_in_context() {
        let mut fx = Fixture::new();
        fx.holon("candidate", Layer::L1);
        let mut ctx = fx.ctx(Role::Decider);

        let err = handle_decide(&mut ctx, decide(r#"{"title": "Pick", "winner_id": "candidate"}"#)).unwrap_err();
        assert!(err.hint().is_some_and(|h| h.contains("L2")));
        assert!(fx.store.find_holon("pick").unwrap().is_none());
    }

    #[test]
    fn test_resolve_implemented() {
        let mut fx = decided();
        let mut ctx = fx.ctx(Role::Observer);

        let result = handle_resolve(
            &mut ctx,
            resolve(r#"{"decision_id": "cache-choice", "resolution": "implemented", "reference": "commit:abc123"}"#),
        )
        .unwrap();
        assert_eq!(result.resolution, DecisionStatus::Implemented);
        assert_eq!(result.title, "Cache Choice");

        let evidence = fx.store.get_evidence("cache-choice").unwrap();
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].evidence_type.as_str(), "implementation");
        assert_eq!(evidence[0].content, "Decision implemented");
        assert_eq!(evidence[0].carrier_ref.as_deref(), Some("commit:abc123"));
        assert_eq!(evidence[0].verdict, Verdict::Pass);
        assert_eq!(evidence[0].valid_until, None);
        assert_eq!(evidence[0].created_at, NOW);
        assert_eq!(
            fx.store.resolution_of("cache-choice").unwrap(),
            Some(DecisionStatus::Implemented)
        );
    }

    #[test]
    fn test_resolve_requirements_per_outcome() {
        let mut fx = decided();
        let mut ctx = fx.ctx(Role::Observer);

        for json in [
            r#"{"decision_id": "cache-choice", "resolution": "implemented"}"#,
            r#"{"decision_id": "cache-choice", "resolution": "abandoned", "notes": "  "}"#,
            r#"{"decision_id": "cache-choice", "resolution": "superseded"}"#,
            r#"{"decision_id": "cache-choice", "resolution": "superseded", "superseded_by": "cache-choice"}"#,
            r#"{"decision_id": "cache-choice", "resolution": "open"}"#,
            r#"{"decision_id": "redis", "resolution": "abandoned", "notes": "x"}"#,
        ] {
            let err = handle_resolve(&mut ctx, resolve(json)).unwrap_err();
            assert!(matches!(err, EngineError::Validation { .. }), "{}: {:?}", json, err);
        }

        let err = handle_resolve(
            &mut ctx,
            resolve(r#"{"decision_id": "cache-choice", "resolution": "superseded", "superseded_by": "ghost"}"#),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
        assert!(fx.store.get_evidence("cache-choice").unwrap().is_empty());
    }

    #[test]
    fn test_resolve_superseded_links_successor() {
        let mut fx = decided();
        fx.holon("valkey", Layer::L2);
        let mut ctx = fx.ctx(Role::Decider);
        handle_decide(&mut ctx, decide(r#"{"title": "Cache Choice v2", "winner_id": "valkey"}"#)).unwrap();

        let result = handle_resolve(
            &mut ctx,
            resolve(r#"{"decision_id": "cache-choice", "resolution": "superseded", "superseded_by": "cache-choice-v2"}"#),
        )
        .unwrap();
        assert_eq!(result.resolution, DecisionStatus::Superseded);

        let evidence = fx.store.get_evidence("cache-choice").unwrap();
        assert_eq!(evidence[0].content, "Superseded by cache-choice-v2");
        assert_eq!(evidence[0].carrier_ref.as_deref(), Some("superseded_by:cache-choice-v2"));
        assert!(fx
            .store
            .get_relations("cache-choice")
            .unwrap()
            .iter()
            .any(|r| r.relation_type == RelationType::SupersededBy && r.target_id == "cache-choice-v2"));
    }

    #[test]
    fn test_resolve_only_once() {
        let mut fx = decided();
        let mut ctx = fx.ctx(Role::Observer);

        handle_resolve(
            &mut ctx,
            resolve(r#"{"decision_id": "cache-choice", "resolution": "abandoned", "notes": "budget cut"}"#),
        )
        .unwrap();
        let err = handle_resolve(
            &mut ctx,
            resolve(r#"{"decision_id": "cache-choice", "resolution": "implemented", "reference": "pr:7"}"#),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::State { .. }));
        assert!(err.to_string().contains("abandoned"));
    }
}
