//! `check_decay`, `waive`, `deprecate` and `refresh_scores`

use super::{required, OpContext};
use crate::dates::parse_date;
use crate::EngineError;
use assay_domain::Layer;
use assay_janitor::{FreshnessReport, SweepReport};
use serde::{Deserialize, Serialize};

/// Operations that take no parameters
#[derive(Debug, Default, Deserialize)]
pub struct NoParams {}

/// Parameters for a waiver
#[derive(Debug, Deserialize)]
pub struct WaiveParams {
    /// Evidence whose decay is suspended
    pub evidence_id: String,
    /// End of the waiver (`YYYY-MM-DD` or RFC 3339), must be in the future
    pub until: String,
    /// Why the stale evidence is acceptable for now
    pub rationale: String,
}

/// Result of a waiver
#[derive(Debug, Serialize)]
pub struct WaiveResult {
    pub waiver_id: String,
    pub evidence_id: String,
    pub waived_by: String,
    pub waived_until: u64,
}

/// Parameters for deprecation
#[derive(Debug, Deserialize)]
pub struct DeprecateParams {
    /// Holon to demote
    pub holon_id: String,
}

/// Result of deprecation
#[derive(Debug, Serialize)]
pub struct DeprecateResult {
    pub holon_id: String,
    pub from: Layer,
    pub to: Layer,
}

/// Handle `check_decay`
pub(crate) fn handle_check_decay(ctx: &mut OpContext<'_>, _params: NoParams) -> Result<FreshnessReport, EngineError> {
    let report = ctx.janitor.freshness_report(&*ctx.store, ctx.now)?;
    tracing::debug!(
        stale = report.stale.len(),
        waivers = report.waivers.len(),
        "Freshness report built"
    );
    Ok(report)
}

/// Handle `waive`
pub(crate) fn handle_waive(ctx: &mut OpContext<'_>, params: WaiveParams) -> Result<WaiveResult, EngineError> {
    let evidence_id = required("evidence_id", &params.evidence_id)?;
    let until = parse_date(required("until", &params.until)?)?;
    let waived_by = ctx.caller.role.as_str();

    let waiver = ctx
        .janitor
        .waive(ctx.store, evidence_id, waived_by, until, params.rationale.trim(), ctx.now)?;

    Ok(WaiveResult {
        waiver_id: waiver.id,
        evidence_id: waiver.evidence_id,
        waived_by: waiver.waived_by,
        waived_until: waiver.waived_until,
    })
}

/// Handle `deprecate`
pub(crate) fn handle_deprecate(
    ctx: &mut OpContext<'_>,
    params: DeprecateParams,
) -> Result<DeprecateResult, EngineError> {
    let holon_id = required("holon_id", &params.holon_id)?;
    let (from, to) = ctx.janitor.deprecate(ctx.store, holon_id, ctx.now)?;
    Ok(DeprecateResult {
        holon_id: holon_id.to_string(),
        from,
        to,
    })
}

/// Handle `refresh_scores`
pub(crate) fn handle_refresh_scores(ctx: &mut OpContext<'_>, _params: NoParams) -> Result<SweepReport, EngineError> {
    let report = ctx.janitor.refresh_scores(ctx.store, ctx.now)?;
    ctx.note_uncached(&report.uncached);
    tracing::info!(scored = report.scored, changed = report.changed.len(), "Scores refreshed");
    Ok(report)
}
