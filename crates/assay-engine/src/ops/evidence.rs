//! `verify`, `test` and `audit`: operations that record evidence and move holons between layers

use super::{required, OpContext};
use crate::dates::parse_optional_date;
use crate::EngineError;
use assay_domain::traits::HolonStore;
use assay_domain::{new_record_id, Evidence, EvidenceType, Holon, HolonKind, Layer, Verdict};
use assay_gatekeeper::{preconditions, CheckVerdict};
use serde::{Deserialize, Serialize};

/// Parameters for logical verification
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    /// L0 holon to verify
    pub holon_id: String,
    /// `PASS`, `FAIL` or `REFINE`
    pub verdict: String,
    /// What was checked
    #[serde(default)]
    pub checks: String,
}

/// Result of verification
#[derive(Debug, Serialize)]
pub struct VerifyResult {
    /// Holon verified
    pub holon_id: String,
    /// Canonical verdict
    pub verdict: String,
    /// Layer after verification
    pub layer: Layer,
    /// Evidence recorded on PASS
    pub evidence_id: Option<String>,
}

/// Parameters for empirical testing
#[derive(Debug, Deserialize)]
pub struct TestParams {
    /// L1 or L2 holon under test
    pub holon_id: String,
    /// `PASS`, `FAIL` or `REFINE`
    pub verdict: String,
    /// What was observed
    pub content: String,
    /// `internal`, `external` or `research`
    #[serde(default = "default_test_type")]
    pub evidence_type: String,
    /// Artifact grounding the observation
    #[serde(default)]
    pub carrier_ref: Option<String>,
    /// Expiry (`YYYY-MM-DD` or RFC 3339); defaults to the configured window
    #[serde(default)]
    pub valid_until: Option<String>,
}

fn default_test_type() -> String {
    "internal".to_string()
}

/// Result of testing
#[derive(Debug, Serialize)]
pub struct TestResult {
    /// Holon tested
    pub holon_id: String,
    /// Canonical verdict
    pub verdict: String,
    /// Layer after the test
    pub layer: Layer,
    /// Evidence recorded
    pub evidence_id: String,
    /// Expiry of that evidence (Unix seconds)
    pub valid_until: u64,
}

/// Parameters for an audit
#[derive(Debug, Deserialize)]
pub struct AuditReportParams {
    /// L2 holon audited
    pub holon_id: String,
    /// Risks and findings
    pub risks: String,
}

/// Result of an audit
#[derive(Debug, Serialize)]
pub struct AuditReportResult {
    /// Holon audited
    pub holon_id: String,
    /// Evidence recorded
    pub evidence_id: String,
}

/// Everything needed for one evidence row besides the holon and time
struct Observation<'s> {
    evidence_type: EvidenceType,
    content: String,
    verdict: &'s str,
    assurance_level: &'s str,
    carrier_ref: Option<String>,
    valid_until: u64,
}

fn record(ctx: &mut OpContext<'_>, holon: &Holon, observation: Observation<'_>) -> Result<String, EngineError> {
    let id = new_record_id();
    ctx.store.add_evidence(Evidence {
        id: id.clone(),
        holon_id: holon.id.clone(),
        evidence_type: observation.evidence_type,
        content: observation.content,
        verdict: Verdict::parse(observation.verdict),
        assurance_level: Some(observation.assurance_level.to_string()),
        carrier_ref: observation.carrier_ref,
        valid_until: Some(observation.valid_until),
        created_at: ctx.now,
    })?;
    Ok(id)
}

fn move_to(ctx: &mut OpContext<'_>, holon: &Holon, layer: Layer) -> Result<Layer, EngineError> {
    if holon.layer != layer {
        ctx.store.update_holon_layer(&holon.id, layer, ctx.now)?;
        tracing::info!(holon = %holon.id, from = %holon.layer, to = %layer, "Holon moved");
    }
    Ok(layer)
}

/// Handle `verify`
///
/// PASS promotes L0 to L1 and records verification evidence; FAIL moves the
/// holon to invalid; REFINE leaves it in L0.
pub(crate) fn handle_verify(ctx: &mut OpContext<'_>, params: VerifyParams) -> Result<VerifyResult, EngineError> {
    let (holon, verdict) = preconditions::check_verify(&*ctx.store, &params.holon_id, &params.verdict)?;

    let (layer, evidence_id) = match verdict {
        CheckVerdict::Pass => {
            let layer = move_to(ctx, &holon, Layer::L1)?;
            let valid_until = ctx.default_expiry();
            let carrier = match holon.kind {
                Some(HolonKind::Episteme) => "formal-logic",
                _ => "internal-logic",
            };
            let evidence_id = record(
                ctx,
                &holon,
                Observation {
                    evidence_type: EvidenceType::parse("verification"),
                    content: format!("Verification checks:\n{}", params.checks.trim()),
                    verdict: verdict.evidence_verdict(),
                    assurance_level: "L1",
                    carrier_ref: Some(carrier.to_string()),
                    valid_until,
                },
            )?;
            (layer, Some(evidence_id))
        }
        CheckVerdict::Fail => (move_to(ctx, &holon, Layer::Invalid)?, None),
        CheckVerdict::Refine => (holon.layer, None),
    };

    Ok(VerifyResult {
        holon_id: holon.id,
        verdict: verdict.as_str().to_string(),
        layer,
        evidence_id,
    })
}

/// Handle `test`
///
/// Evidence is recorded whatever the verdict. An L1 holon is promoted to L2
/// on PASS and moved to invalid otherwise; an L2 holon keeps its layer.
pub(crate) fn handle_test(ctx: &mut OpContext<'_>, params: TestParams) -> Result<TestResult, EngineError> {
    let (holon, verdict) = preconditions::check_test(&*ctx.store, &params.holon_id, &params.verdict)?;
    let content = required("content", &params.content)?.to_string();

    let evidence_type = EvidenceType::parse(params.evidence_type.trim());
    if !matches!(
        evidence_type,
        EvidenceType::Internal | EvidenceType::External | EvidenceType::Research
    ) {
        return Err(EngineError::validation_with_hint(
            format!("invalid evidence type '{}'", params.evidence_type),
            "Use internal, external or research",
        ));
    }

    let valid_until = parse_optional_date(params.valid_until.as_deref())?
        .unwrap_or_else(|| ctx.default_expiry());

    let evidence_id = record(
        ctx,
        &holon,
        Observation {
            evidence_type,
            content,
            verdict: verdict.evidence_verdict(),
            assurance_level: "L2",
            carrier_ref: params.carrier_ref.filter(|c| !c.trim().is_empty()),
            valid_until,
        },
    )?;

    let layer = match (holon.layer, verdict) {
        (Layer::L1, CheckVerdict::Pass) => move_to(ctx, &holon, Layer::L2)?,
        (Layer::L1, _) => move_to(ctx, &holon, Layer::Invalid)?,
        (layer, _) => layer,
    };

    Ok(TestResult {
        holon_id: holon.id,
        verdict: verdict.as_str().to_string(),
        layer,
        evidence_id,
        valid_until,
    })
}

/// Handle `audit`
pub(crate) fn handle_audit(
    ctx: &mut OpContext<'_>,
    params: AuditReportParams,
) -> Result<AuditReportResult, EngineError> {
    let holon = preconditions::check_audit(&*ctx.store, &params.holon_id)?;
    let risks = required("risks", &params.risks)?.to_string();
    let valid_until = ctx.default_expiry();

    let evidence_id = record(
        ctx,
        &holon,
        Observation {
            evidence_type: EvidenceType::AuditReport,
            content: risks,
            verdict: "pass",
            assurance_level: "L2",
            carrier_ref: Some("auditor".to_string()),
            valid_until,
        },
    )?;
    tracing::info!(holon = %holon.id, "Audit recorded");

    Ok(AuditReportResult {
        holon_id: holon.id,
        evidence_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::fixture::{Fixture, NOW};
    use assay_domain::traits::HolonGraph;
    use assay_domain::Role;

    #[test]
    fn test_params_deserialize() {
        let p: VerifyParams = serde_json::from_str(r#"{"holon_id": "h", "verdict": "pass"}"#).unwrap();
        assert_eq!(p.checks, "");

        let p: TestParams =
            serde_json::from_str(r#"{"holon_id": "h", "verdict": "PASS", "content": "load test ok"}"#).unwrap();
        assert_eq!(p.evidence_type, "internal");
        assert_eq!(p.valid_until, None);
    }

    #[test]
    fn test_verify_pass_promotes_and_records() {
        let mut fx = Fixture::new();
        fx.holon("h", Layer::L0);
        let mut ctx = fx.ctx(Role::Deductor);

        let result = handle_verify(
            &mut ctx,
            VerifyParams { holon_id: "h".into(), verdict: "pass".into(), checks: "types line up".into() },
        )
        .unwrap();
        assert_eq!(result.layer, Layer::L1);
        assert_eq!(result.verdict, "PASS");

        let evidence = fx.store.get_evidence("h").unwrap();
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].evidence_type.as_str(), "verification");
        assert_eq!(evidence[0].carrier_ref.as_deref(), Some("internal-logic"));
        assert_eq!(evidence[0].valid_until, Some(NOW + 90 * 86_400));
        assert_eq!(fx.store.get_holon("h").unwrap().layer, Layer::L1);
    }

    #[test]
    fn test_verify_fail_and_refine() {
        let mut fx = Fixture::new();
        fx.holon("bad", Layer::L0);
        fx.holon("maybe", Layer::L0);
        let mut ctx = fx.ctx(Role::Deductor);

        let failed = handle_verify(
            &mut ctx,
            VerifyParams { holon_id: "bad".into(), verdict: "FAIL".into(), checks: String::new() },
        )
        .unwrap();
        assert_eq!(failed.layer, Layer::Invalid);

        let refined = handle_verify(
            &mut ctx,
            VerifyParams { holon_id: "maybe".into(), verdict: "refine".into(), checks: String::new() },
        )
        .unwrap();
        assert_eq!(refined.layer, Layer::L0);
        assert!(fx.store.get_evidence("maybe").unwrap().is_empty());
    }

    #[test]
    fn test_test_rejects_l0() {
        let mut fx = Fixture::new();
        fx.holon("fresh", Layer::L0);
        let mut ctx = fx.ctx(Role::Inductor);

        let err = handle_test(
            &mut ctx,
            TestParams {
                holon_id: "fresh".into(),
                verdict: "PASS".into(),
                content: "ran it".into(),
                evidence_type: "internal".into(),
                carrier_ref: None,
                valid_until: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.hint().as_deref(), Some("Run verify on the hypothesis first"));
    }

    #[test]
    fn test_test_layer_outcomes() {
        let mut fx = Fixture::new();
        fx.holon("good", Layer::L1);
        fx.holon("poor", Layer::L1);
        fx.holon("done", Layer::L2);
        let mut ctx = fx.ctx(Role::Inductor);

        fn run(ctx: &mut OpContext<'_>, id: &str, verdict: &str) -> TestResult {
            handle_test(
                ctx,
                TestParams {
                    holon_id: id.into(),
                    verdict: verdict.into(),
                    content: "observed".into(),
                    evidence_type: "external".into(),
                    carrier_ref: None,
                    valid_until: Some("2030-01-01".into()),
                },
            )
            .unwrap()
        }

        assert_eq!(run(&mut ctx, "good", "PASS").layer, Layer::L2);
        assert_eq!(run(&mut ctx, "poor", "REFINE").layer, Layer::Invalid);

        let kept = run(&mut ctx, "done", "FAIL");
        assert_eq!(kept.layer, Layer::L2);
        assert_eq!(kept.valid_until, 1_893_456_000);
        assert_eq!(fx.store.get_evidence("done").unwrap()[0].verdict, Verdict::Fail);
    }

    #[test]
    fn test_test_rejects_unknown_type() {
        let mut fx = Fixture::new();
        fx.holon("h", Layer::L1);
        let mut ctx = fx.ctx(Role::Inductor);

        let err = handle_test(
            &mut ctx,
            TestParams {
                holon_id: "h".into(),
                verdict: "PASS".into(),
                content: "x".into(),
                evidence_type: "hunch".into(),
                carrier_ref: None,
                valid_until: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
        assert!(fx.store.get_evidence("h").unwrap().is_empty());
    }

    #[test]
    fn test_audit_requires_l2() {
        let mut fx = Fixture::new();
        fx.holon("l1", Layer::L1);
        fx.holon("l2", Layer::L2);
        let mut ctx = fx.ctx(Role::Auditor);

        assert!(handle_audit(&mut ctx, AuditReportParams { holon_id: "l1".into(), risks: "r".into() }).is_err());
        handle_audit(&mut ctx, AuditReportParams { holon_id: "l2".into(), risks: "no blockers".into() }).unwrap();

        let evidence = fx.store.get_evidence("l2").unwrap();
        assert_eq!(evidence[0].evidence_type, EvidenceType::AuditReport);
        assert_eq!(evidence[0].carrier_ref.as_deref(), Some("auditor"));
    }
}
