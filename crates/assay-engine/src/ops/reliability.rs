//! `calculate_r` and `audit_tree`: reliability reports

use super::OpContext;
use crate::EngineError;
use assay_domain::traits::{HolonGraph, HolonStore};
use assay_domain::{compute_reliability, ReliabilityReport};
use assay_gatekeeper::preconditions;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Parameters for computing one holon's reliability
#[derive(Debug, Deserialize)]
pub struct CalculateRParams {
    /// Holon to score
    pub holon_id: String,
}

/// Handle `calculate_r`
pub(crate) fn handle_calculate_r(
    ctx: &mut OpContext<'_>,
    params: CalculateRParams,
) -> Result<ReliabilityReport, EngineError> {
    let holon = preconditions::check_calculate_r(&*ctx.store, params.holon_id.trim())?;
    let report = compute_reliability(ctx.store, &holon.id, ctx.now)?;
    ctx.note_uncached(&report.uncached);
    tracing::debug!(holon = %holon.id, score = report.final_score, "Reliability computed");
    Ok(report)
}

/// Parameters for a reliability tree
#[derive(Debug, Deserialize)]
pub struct AuditTreeParams {
    /// Root of the tree
    pub holon_id: String,
}

/// One node of a reliability tree
#[derive(Debug, Serialize)]
pub struct AuditNode {
    pub holon_id: String,
    /// `None` when the node is referenced by an edge but no longer exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub score: f64,
    pub self_score: f64,
    pub factors: Vec<String>,
    /// Congruence of the `componentOf` edge leading here; `None` at the root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub congruence_level: Option<u8>,
    /// The node already appears above it on this path and is not expanded
    pub cycle: bool,
    /// The node was expanded earlier in this tree and is not repeated
    pub shared: bool,
    pub components: Vec<AuditNode>,
    pub members: Vec<MemberScore>,
}

/// A `memberOf` alternative listed under its group
#[derive(Debug, Serialize)]
pub struct MemberScore {
    pub holon_id: String,
    pub title: Option<String>,
    pub score: f64,
}

/// Walk state of one `audit_tree` call
#[derive(Default)]
struct TreeWalk {
    /// Nodes above the current one
    path: Vec<String>,
    /// Nodes already expanded somewhere in the tree
    expanded: HashSet<String>,
    reports: HashMap<String, ReliabilityReport>,
}

impl TreeWalk {
    /// Reliability of `holon_id`, computed at most once per walk
    fn report(&mut self, ctx: &mut OpContext<'_>, holon_id: &str) -> Result<ReliabilityReport, EngineError> {
        if let Some(report) = self.reports.get(holon_id) {
            return Ok(report.clone());
        }
        let report = compute_reliability(ctx.store, holon_id, ctx.now)?;
        ctx.note_uncached(&report.uncached);
        self.reports.insert(holon_id.to_string(), report.clone());
        Ok(report)
    }

    fn node(
        &mut self,
        ctx: &mut OpContext<'_>,
        holon_id: &str,
        congruence_level: Option<u8>,
    ) -> Result<AuditNode, EngineError> {
        let title = title_of(ctx, holon_id)?;
        if self.path.iter().any(|seen| seen == holon_id) {
            return Ok(AuditNode {
                holon_id: holon_id.to_string(),
                title,
                score: 1.0,
                self_score: 1.0,
                factors: vec!["Cycle detected, not expanded".to_string()],
                congruence_level,
                cycle: true,
                shared: false,
                components: Vec::new(),
                members: Vec::new(),
            });
        }

        let report = self.report(ctx, holon_id)?;
        if !self.expanded.insert(holon_id.to_string()) {
            return Ok(AuditNode {
                holon_id: holon_id.to_string(),
                title,
                score: report.final_score,
                self_score: report.self_score,
                factors: report.factors,
                congruence_level,
                cycle: false,
                shared: true,
                components: Vec::new(),
                members: Vec::new(),
            });
        }

        self.path.push(holon_id.to_string());
        let mut components = Vec::new();
        for edge in ctx.store.get_components_of(holon_id)? {
            components.push(self.node(ctx, &edge.source_id, Some(edge.congruence_level))?);
        }
        self.path.pop();

        let mut members = Vec::new();
        for edge in ctx.store.get_collection_members(holon_id)? {
            let member = self.report(ctx, &edge.source_id)?;
            members.push(MemberScore {
                title: title_of(ctx, &edge.source_id)?,
                holon_id: edge.source_id,
                score: member.final_score,
            });
        }

        Ok(AuditNode {
            holon_id: holon_id.to_string(),
            title,
            score: report.final_score,
            self_score: report.self_score,
            factors: report.factors,
            congruence_level,
            cycle: false,
            shared: false,
            components,
            members,
        })
    }
}

fn title_of(ctx: &OpContext<'_>, holon_id: &str) -> Result<Option<String>, EngineError> {
    Ok(ctx.store.find_holon(holon_id)?.map(|h| h.title))
}

/// Handle `audit_tree`
///
/// Follows `componentOf` edges down from the root and lists `memberOf`
/// alternatives with their scores. A node reachable along several paths is
/// expanded once; later occurrences are marked `shared`.
pub(crate) fn handle_audit_tree(ctx: &mut OpContext<'_>, params: AuditTreeParams) -> Result<AuditNode, EngineError> {
    preconditions::check_audit_tree(&params.holon_id)?;
    let root = params.holon_id.trim();
    if !ctx.store.holon_exists(root)? {
        return Err(EngineError::not_found("holon", root));
    }
    TreeWalk::default().node(ctx, root, None)
}
