//! Integration tests for the engine
//!
//! Every scenario goes through `Engine::invoke_at`, so authorization,
//! argument decoding, state persistence and audit logging are exercised
//! together with the operations themselves.

use assay_domain::{Layer, Role};
use assay_engine::{Engine, EngineConfig, EngineError, IntegrityWarning};
use assay_store::AuditResult;
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

const NOW: u64 = 1_700_000_000;
const DAY: u64 = 86_400;

fn engine(dir: &TempDir) -> Engine {
    Engine::open(EngineConfig::in_memory(dir.path())).unwrap()
}

fn run(engine: &mut Engine, op: &str, role: Role, args: Value) -> Value {
    let caller = engine.assignment(role, "session-1");
    let outcome = engine
        .invoke_at(op, &caller, args, NOW)
        .unwrap_or_else(|e| panic!("{} failed: {}", op, e));
    assert!(outcome.warnings.is_empty(), "{} warned: {:?}", op, outcome.warnings);
    outcome.value
}

fn run_err(engine: &mut Engine, op: &str, role: Role, args: Value) -> EngineError {
    let caller = engine.assignment(role, "session-1");
    engine.invoke_at(op, &caller, args, NOW).unwrap_err()
}

/// Propose, verify and test a hypothesis until it reaches L2
fn validated(engine: &mut Engine, title: &str, evidence_type: &str) -> String {
    let proposed = run(engine, "propose", Role::Abductor, json!({"title": title, "content": "candidate"}));
    let id = proposed["holon_id"].as_str().unwrap().to_string();
    run(engine, "verify", Role::Deductor, json!({"holon_id": id, "verdict": "PASS", "checks": "consistent"}));
    run(
        engine,
        "test",
        Role::Inductor,
        json!({"holon_id": id, "verdict": "PASS", "content": "load test", "evidence_type": evidence_type}),
    );
    id
}

#[test]
fn test_full_assurance_pipeline() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);

    let redis = run(
        &mut engine,
        "propose",
        Role::Abductor,
        json!({"title": "Use Redis", "content": "Cache sessions in Redis", "kind": "system"}),
    );
    assert_eq!(redis["holon_id"], "use-redis");
    assert_eq!(redis["layer"], "L0");
    run(&mut engine, "propose", Role::Abductor, json!({"title": "Use Memcached", "content": "Cache in Memcached"}));

    let verified = run(
        &mut engine,
        "verify",
        Role::Deductor,
        json!({"holon_id": "use-redis", "verdict": "PASS", "checks": "no contradictions"}),
    );
    assert_eq!(verified["layer"], "L1");
    run(&mut engine, "verify", Role::Deductor, json!({"holon_id": "use-memcached", "verdict": "PASS"}));

    let tested = run(
        &mut engine,
        "test",
        Role::Inductor,
        json!({"holon_id": "use-redis", "verdict": "PASS", "content": "p99 under 2ms", "evidence_type": "internal"}),
    );
    assert_eq!(tested["layer"], "L2");
    assert_eq!(tested["valid_until"], NOW + 90 * DAY);

    let audited = run(
        &mut engine,
        "audit",
        Role::Auditor,
        json!({"holon_id": "use-redis", "risks": "Single node; acceptable for sessions"}),
    );
    assert_eq!(audited["holon_id"], "use-redis");

    let score = run(&mut engine, "calculate_r", Role::Observer, json!({"holon_id": "use-redis"}));
    assert_eq!(score["final_score"], 1.0);

    let decided = run(
        &mut engine,
        "decide",
        Role::Decider,
        json!({
            "title": "Session Cache",
            "winner_id": "use-redis",
            "rejected_ids": ["use-memcached"],
            "rationale": "Better tested"
        }),
    );
    assert_eq!(decided["drr_id"], "session-cache");
    assert_eq!(decided["rejected"], json!(["use-memcached"]));
    assert_eq!(decided["winner_layer"], "L2");

    let drr = engine.get_holon("session-cache").unwrap();
    assert_eq!(drr.layer, Layer::Drr);
    assert!(drr.content.contains("## Rationale\nBetter tested"));

    let status = run(&mut engine, "status", Role::Observer, json!({}));
    assert_eq!(status["open_decisions"][0]["id"], "session-cache");

    let resolved = run(
        &mut engine,
        "resolve",
        Role::Observer,
        json!({"decision_id": "session-cache", "resolution": "implemented", "reference": "commit:abc123"}),
    );
    assert_eq!(resolved["resolution"], "implemented");
    assert_eq!(resolved["title"], "Session Cache");

    let status = run(&mut engine, "status", Role::Observer, json!({}));
    assert_eq!(status["open_decisions"], json!([]));

    let err = run_err(
        &mut engine,
        "resolve",
        Role::Observer,
        json!({"decision_id": "session-cache", "resolution": "abandoned", "notes": "changed our mind"}),
    );
    assert!(matches!(err, EngineError::State { .. }));
}

#[test]
fn test_role_mismatch_is_rejected_and_audited() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    run(&mut engine, "propose", Role::Abductor, json!({"title": "Idea", "content": "body"}));

    let err = run_err(&mut engine, "verify", Role::Inductor, json!({"holon_id": "idea", "verdict": "PASS"}));
    assert_eq!(err.category(), "state");
    assert!(err.hint().is_some());
    assert_eq!(engine.get_holon("idea").unwrap().layer, Layer::L0);

    let log = engine.store().audit_log_for_target("idea").unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].operation, "propose");
    assert_eq!(log[0].result, AuditResult::Success);
    assert_eq!(log[1].operation, "verify");
    assert_eq!(log[1].actor, "Inductor");
    assert_eq!(log[1].result, AuditResult::Error);
    assert!(log[1].details.as_deref().unwrap_or_default().contains("State error"));
}

#[test]
fn test_decide_requires_a_validated_hypothesis() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    run(&mut engine, "propose", Role::Abductor, json!({"title": "Idea", "content": "body"}));

    let err = run_err(
        &mut engine,
        "decide",
        Role::Decider,
        json!({"title": "Premature", "winner_id": "idea"}),
    );
    assert!(matches!(err, EngineError::Validation { .. }), "{:?}", err);
    assert!(matches!(engine.get_holon("premature"), Err(EngineError::NotFound { .. })));
}

/// Billing service (internal) built on a vendor SDK (research), with the
/// default context walked up to DECISION
fn billing_at_decision(dir: &TempDir, config: EngineConfig) -> Engine {
    fs::create_dir_all(dir.path().join("hypotheses")).unwrap();
    fs::write(dir.path().join("hypotheses/service.md"), "service").unwrap();
    fs::create_dir_all(dir.path().join("knowledge/L1")).unwrap();
    fs::write(dir.path().join("knowledge/L1/service.md"), "verified").unwrap();
    fs::create_dir_all(dir.path().join("knowledge/L2")).unwrap();
    fs::write(dir.path().join("knowledge/L2/service.md"), "validated").unwrap();
    let mut engine = Engine::open(config).unwrap();

    validated(&mut engine, "Vendor SDK", "research");
    validated(&mut engine, "Billing Service", "internal");
    let linked = run(
        &mut engine,
        "link",
        Role::Abductor,
        json!({"source_id": "vendor-sdk", "relation_type": "componentOf", "target_id": "billing-service"}),
    );
    assert_eq!(linked["created"], true);

    let walk = [
        ("ABDUCTION", Role::Abductor, json!({"uri": "notes/problem.md"})),
        ("DEDUCTION", Role::Deductor, json!({"uri": "hypotheses"})),
        ("INDUCTION", Role::Inductor, json!({"uri": "knowledge/L1/service.md"})),
        ("DECISION", Role::Decider, json!({"uri": "knowledge/L2/service.md"})),
    ];
    for (target, role, anchor) in walk {
        let result = run(&mut engine, "transition", role, json!({"target": target, "anchor": anchor}));
        assert_eq!(result["to"], target);
    }
    engine
}

#[test]
fn test_phase_walk_and_operation_gate() {
    let dir = TempDir::new().unwrap();
    let mut engine = billing_at_decision(&dir, EngineConfig::in_memory(dir.path()));

    let err = run_err(
        &mut engine,
        "transition",
        Role::Decider,
        json!({"target": "OPERATION", "anchor": {"holon_id": "billing-service"}}),
    );
    match err {
        EngineError::Threshold { holon_id, score, weakest_link, .. } => {
            assert_eq!(holon_id, "billing-service");
            assert!((score - 0.6).abs() < 1e-9);
            assert_eq!(weakest_link.as_deref(), Some("vendor-sdk"));
        }
        other => panic!("expected threshold error, got {:?}", other),
    }

    let status = run(&mut engine, "status", Role::Observer, json!({}));
    assert_eq!(status["phase"], "DECISION");
    assert_eq!(status["active_role"], "Decider");

    let reset = run(&mut engine, "reset", Role::Maintainer, json!({"reason": "rethink vendor"}));
    assert_eq!(reset["previous_phase"], "DECISION");
    assert_eq!(reset["reason"], "rethink vendor");

    let status = run(&mut engine, "status", Role::Observer, json!({}));
    assert_eq!(status["phase"], "IDLE");
    assert_eq!(status["active_role"], Value::Null);
}

#[test]
fn test_context_threshold_from_config() {
    let dir = TempDir::new().unwrap();
    let mut config = EngineConfig::in_memory(dir.path());
    config.workflow.thresholds.insert("default".to_string(), 0.5);
    let mut engine = billing_at_decision(&dir, config);

    let result = run(
        &mut engine,
        "transition",
        Role::Decider,
        json!({"target": "OPERATION", "anchor": {"holon_id": "billing-service"}}),
    );
    assert_eq!(result["to"], "OPERATION");
    assert!((result["report"]["final_score"].as_f64().unwrap() - 0.6).abs() < 1e-9);

    let status = run(&mut engine, "status", Role::Observer, json!({}));
    assert_eq!(status["phase"], "OPERATION");
    assert_eq!(status["threshold"], 0.5);
}

#[test]
fn test_operation_gate_on_unknown_holon_is_not_found() {
    let dir = TempDir::new().unwrap();
    let mut engine = billing_at_decision(&dir, EngineConfig::in_memory(dir.path()));

    let err = run_err(
        &mut engine,
        "transition",
        Role::Decider,
        json!({"target": "OPERATION", "anchor": {"holon_id": "ghost"}}),
    );
    assert!(matches!(err, EngineError::NotFound { kind: "holon", ref id } if id == "ghost"), "{:?}", err);

    let status = run(&mut engine, "status", Role::Observer, json!({}));
    assert_eq!(status["phase"], "DECISION");
}

#[test]
fn test_self_link_is_invalid_even_for_unknown_holon() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);

    let err = run_err(
        &mut engine,
        "link",
        Role::Abductor,
        json!({"source_id": "x", "relation_type": "dependsOn", "target_id": "x"}),
    );
    assert!(matches!(err, EngineError::Validation { .. }), "{:?}", err);
}

#[test]
fn test_transition_requires_the_expected_artifact() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    run(&mut engine, "transition", Role::Abductor, json!({"target": "ABDUCTION", "anchor": {"uri": "x"}}));

    let err = run_err(
        &mut engine,
        "transition",
        Role::Deductor,
        json!({"target": "DEDUCTION", "anchor": {"uri": "missing-dir"}}),
    );
    assert_eq!(err.category(), "state");

    let status = run(&mut engine, "status", Role::Observer, json!({}));
    assert_eq!(status["phase"], "ABDUCTION");
}

#[test]
fn test_decay_waiver_and_deprecation() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    run(&mut engine, "propose", Role::Abductor, json!({"title": "Pool Size", "content": "32 connections"}));
    run(&mut engine, "verify", Role::Deductor, json!({"holon_id": "pool-size", "verdict": "PASS"}));
    let tested = run(
        &mut engine,
        "test",
        Role::Inductor,
        json!({
            "holon_id": "pool-size",
            "verdict": "PASS",
            "content": "soak test",
            "evidence_type": "internal",
            "valid_until": "2023-11-20"
        }),
    );
    let evidence_id = tested["evidence_id"].as_str().unwrap().to_string();

    let later = NOW + 7 * DAY;
    let observer = engine.assignment(Role::Observer, "session-2");

    let report = engine.invoke_at("check_decay", &observer, json!({}), later).unwrap().value;
    assert_eq!(report["stale"][0]["holon_id"], "pool-size");
    assert_eq!(report["stale"][0]["evidence"][0]["evidence_id"], evidence_id.as_str());

    let score = engine
        .invoke_at("calculate_r", &observer, json!({"holon_id": "pool-size"}), later)
        .unwrap()
        .value;
    assert!((score["final_score"].as_f64().unwrap() - 0.1).abs() < 1e-9);

    let err = engine
        .invoke_at(
            "waive",
            &observer,
            json!({"evidence_id": evidence_id, "until": "2030-01-01", "rationale": ""}),
            later,
        )
        .unwrap_err();
    assert_eq!(err.category(), "validation");

    let waiver = engine
        .invoke_at(
            "waive",
            &observer,
            json!({"evidence_id": evidence_id, "until": "2030-01-01", "rationale": "re-run after upgrade"}),
            later,
        )
        .unwrap()
        .value;
    assert_eq!(waiver["waived_by"], "Observer");

    let report = engine.invoke_at("check_decay", &observer, json!({}), later).unwrap().value;
    assert_eq!(report["stale"], json!([]));
    let score = engine
        .invoke_at("calculate_r", &observer, json!({"holon_id": "pool-size"}), later)
        .unwrap()
        .value;
    assert_eq!(score["final_score"], 1.0);

    let deprecated = engine
        .invoke_at("deprecate", &observer, json!({"holon_id": "pool-size"}), later)
        .unwrap()
        .value;
    assert_eq!(deprecated["from"], "L2");
    assert_eq!(deprecated["to"], "L1");
    assert_eq!(engine.get_holon("pool-size").unwrap().layer, Layer::L1);
    assert_eq!(engine.janitor().metrics().total_deprecated(), 1);
}

#[test]
fn test_refresh_scores_is_maintainer_only() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    validated(&mut engine, "Queue Depth", "external");

    let err = run_err(&mut engine, "refresh_scores", Role::Observer, json!({}));
    assert_eq!(err.category(), "state");

    let report = run(&mut engine, "refresh_scores", Role::Maintainer, json!(null));
    assert_eq!(report["scored"], 1);
    assert!((engine.get_holon("queue-depth").unwrap().cached_score - 0.9).abs() < 1e-9);
}

#[test]
fn test_search_and_audit_tree() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    validated(&mut engine, "Retry Policy", "internal");
    run(
        &mut engine,
        "propose",
        Role::Abductor,
        json!({"title": "Backoff Jitter", "content": "Randomize retry delays", "depends_on": ["retry-policy"]}),
    );

    let found = run(&mut engine, "search", Role::Observer, json!({"query": "retry delays"}));
    assert_eq!(found["fallback"], false);
    assert_eq!(found["hits"][0]["id"], "backoff-jitter");

    let found = run(&mut engine, "search", Role::Observer, json!({"query": "load test", "scope": "evidence"}));
    assert!(found["count"].as_u64().unwrap() >= 1);

    let tree = run(&mut engine, "audit_tree", Role::Observer, json!({"holon_id": "backoff-jitter"}));
    assert_eq!(tree["holon_id"], "backoff-jitter");
    assert_eq!(tree["components"][0]["holon_id"], "retry-policy");
    assert_eq!(tree["components"][0]["score"], 1.0);
}

#[test]
fn test_link_cycle_is_skipped_with_warning() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    run(&mut engine, "propose", Role::Abductor, json!({"title": "Parser", "content": "body"}));
    run(&mut engine, "propose", Role::Abductor, json!({"title": "Lexer", "content": "body"}));
    run(
        &mut engine,
        "link",
        Role::Abductor,
        json!({"source_id": "lexer", "relation_type": "componentOf", "target_id": "parser"}),
    );

    let caller = engine.assignment(Role::Abductor, "session-1");
    let outcome = engine
        .invoke_at(
            "link",
            &caller,
            json!({"source_id": "parser", "relation_type": "componentOf", "target_id": "lexer"}),
            NOW,
        )
        .unwrap();
    assert_eq!(outcome.value["created"], false);
    assert!(matches!(
        outcome.warnings.as_slice(),
        [IntegrityWarning::RelationSkippedCycle { .. }]
    ));

    let log = engine.store().recent_audit_log(1).unwrap();
    assert_eq!(log[0].operation, "link");
    assert_eq!(log[0].result, AuditResult::Success);
    assert!(log[0].details.is_some());
}

#[test]
fn test_contexts_are_isolated() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    let other = assay_domain::RoleAssignment::new(Role::Abductor, "session-9", "payments");

    engine
        .invoke_at("transition", &other, json!({"target": "ABDUCTION", "anchor": {"uri": "x"}}), NOW)
        .unwrap();

    let status = run(&mut engine, "status", Role::Observer, json!({}));
    assert_eq!(status["context_id"], "default");
    assert_eq!(status["phase"], "IDLE");

    let observer = assay_domain::RoleAssignment::new(Role::Observer, "session-9", "payments");
    let status = engine.invoke_at("status", &observer, json!({}), NOW).unwrap().value;
    assert_eq!(status["phase"], "ABDUCTION");
}
