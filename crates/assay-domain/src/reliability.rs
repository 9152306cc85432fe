//! Reliability computation
//!
//! Implements the weakest-link (WLNK) calculus: a holon is never more
//! reliable than its weakest piece of evidence or its weakest dependency.
//!
//! 1. Self score: minimum over evidence of the verdict score less the
//!    evidence-type congruence penalty; expired, unwaived evidence scores 0.1.
//! 2. Dependency score: minimum over dependencies of their final score less
//!    the edge congruence penalty.
//! 3. Final score: the smaller of the two (self alone without dependencies).

use crate::relation::congruence_penalty;
use crate::traits::HolonGraph;
use serde::Serialize;
use std::collections::HashSet;

/// Score an expired, unwaived evidence item collapses to
pub const DECAYED_SCORE: f64 = 0.1;

/// Reliability lost by one decayed evidence item
pub const DECAY_PENALTY: f64 = 0.9;

/// Score returned for a holon already visited in the current computation
pub const CYCLE_NEUTRAL_SCORE: f64 = 1.0;

/// Diagnostic report for one holon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReliabilityReport {
    /// Holon the report describes
    pub holon_id: String,

    /// Final reliability in [0.0, 1.0]
    pub final_score: f64,

    /// Score from the holon's own evidence
    pub self_score: f64,

    /// Dependency that produced the minimum dependency score
    pub weakest_link: Option<String>,

    /// Total reliability lost to decayed evidence
    pub decay_penalty: f64,

    /// Explanations, in the order they were applied
    pub factors: Vec<String>,

    /// Holons (this one or any dependency) whose score cache could not be written
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncached: Vec<String>,
}

impl ReliabilityReport {
    fn cycle(holon_id: &str) -> Self {
        Self {
            holon_id: holon_id.to_string(),
            final_score: CYCLE_NEUTRAL_SCORE,
            self_score: CYCLE_NEUTRAL_SCORE,
            weakest_link: None,
            decay_penalty: 0.0,
            factors: vec!["Cycle detected, skipping re-evaluation".to_string()],
            uncached: Vec::new(),
        }
    }

    /// Whether every score computed along the way reached the cache
    pub fn cache_persisted(&self) -> bool {
        self.uncached.is_empty()
    }
}

/// Compute the reliability of `holon_id` at time `now`
///
/// Every holon reached is computed at most once; a revisit contributes the
/// neutral [`CYCLE_NEUTRAL_SCORE`]. Each computed score is written to the
/// graph's cache; cache failures are recorded in
/// [`ReliabilityReport::uncached`] and never fail the computation.
/// Read failures propagate.
pub fn compute_reliability<G: HolonGraph>(
    graph: &mut G,
    holon_id: &str,
    now: u64,
) -> Result<ReliabilityReport, G::Error> {
    let mut visited = HashSet::new();
    compute_with_visited(graph, holon_id, now, &mut visited)
}

fn compute_with_visited<G: HolonGraph>(
    graph: &mut G,
    holon_id: &str,
    now: u64,
    visited: &mut HashSet<String>,
) -> Result<ReliabilityReport, G::Error> {
    if !visited.insert(holon_id.to_string()) {
        return Ok(ReliabilityReport::cycle(holon_id));
    }

    let mut factors = Vec::new();
    let mut uncached = Vec::new();
    let (self_score, decay_penalty) = self_score(graph, holon_id, now, &mut factors)?;

    // Collected up front so recursion does not interleave with the edge read
    let dependencies: Vec<(String, u8)> = graph
        .get_dependencies(holon_id)?
        .iter()
        .filter_map(|edge| {
            edge.dependency_pair()
                .map(|(_, dependency)| (dependency.to_string(), edge.congruence_level))
        })
        .collect();

    let mut weakest: Option<(String, f64)> = None;
    for (dependency, level) in dependencies {
        let report = compute_with_visited(graph, &dependency, now, visited)?;
        uncached.extend(report.uncached);

        let penalty = congruence_penalty(level);
        let effective = (report.final_score - penalty).max(0.0);
        if penalty > 0.0 {
            factors.push(format!("CL{} penalty {:.1} applied for {}", level, penalty, dependency));
        }

        if weakest.as_ref().is_none_or(|(_, score)| effective < *score) {
            weakest = Some((dependency, effective));
        }
    }

    let final_score = match &weakest {
        Some((_, dependency_score)) => self_score.min(*dependency_score),
        None => self_score,
    };

    if graph.cache_reliability(holon_id, final_score).is_err() {
        factors.push("Warning: cache update failed".to_string());
        uncached.push(holon_id.to_string());
    }

    Ok(ReliabilityReport {
        holon_id: holon_id.to_string(),
        final_score,
        self_score,
        weakest_link: weakest.map(|(id, _)| id),
        decay_penalty,
        factors,
        uncached,
    })
}

/// Weakest evidence score and accumulated decay penalty
fn self_score<G: HolonGraph>(
    graph: &G,
    holon_id: &str,
    now: u64,
    factors: &mut Vec<String>,
) -> Result<(f64, f64), G::Error> {
    let evidence = graph.get_evidence(holon_id)?;
    if evidence.is_empty() {
        factors.push("No evidence found (L0)".to_string());
        return Ok((0.0, 0.0));
    }

    let mut minimum = f64::INFINITY;
    let mut decay_penalty = 0.0;

    for item in &evidence {
        let penalty = item.evidence_type.congruence_penalty();
        let mut score = (item.verdict.base_score() - penalty).max(0.0);
        if penalty > 0.0 {
            factors.push(format!(
                "{} evidence congruence penalty {:.1} applied",
                item.evidence_type, penalty
            ));
        }

        if item.is_expired(now) {
            if graph.get_active_waiver_for_evidence(&item.id, now)?.is_some() {
                factors.push(format!("Evidence {} expired but waived", item.id));
            } else {
                factors.push(format!("Evidence {} expired (decay applied)", item.id));
                score = DECAYED_SCORE;
                decay_penalty += DECAY_PENALTY;
            }
        }

        minimum = minimum.min(score);
    }

    Ok((minimum, decay_penalty))
}


#[cfg(test)]
mod proptests {
    use super::tests::MockGraph;
    use super::*;
    use crate::{Relation, RelationType};
    use proptest::prelude::*;

    const NOW: u64 = 1_700_000_000;

    fn verdict() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("pass"), Just("degrade"), Just("fail"), Just("refine")]
    }

    fn evidence_type() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("internal"), Just("external"), Just("research"), Just("audit_report")]
    }

    proptest! {
        /// Property: scores stay in [0, 1] and final never exceeds self
        #[test]
        fn test_final_bounded_by_self(
            items in prop::collection::vec((evidence_type(), verdict(), any::<bool>()), 0..6),
        ) {
            let mut graph = MockGraph::default();
            for (kind, verdict, expired) in &items {
                let until = if *expired { Some(NOW - 1) } else { None };
                graph.evidence("h", kind, verdict, until);
            }

            let report = compute_reliability(&mut graph, "h", NOW).unwrap();
            prop_assert!((0.0..=1.0).contains(&report.final_score));
            prop_assert!(report.final_score <= report.self_score);
        }

        /// Property: final never exceeds any penalized dependency score
        #[test]
        fn test_final_bounded_by_dependencies(
            root in verdict(),
            deps in prop::collection::vec((evidence_type(), verdict(), 0i64..=3), 1..5),
        ) {
            let mut graph = MockGraph::default();
            graph.evidence("root", "internal", root, None);
            for (i, (kind, verdict, level)) in deps.iter().enumerate() {
                let id = format!("dep{}", i);
                graph.evidence(&id, kind, verdict, None);
                graph.relate(Relation::new("root".into(), RelationType::DependsOn, id, *level, 0));
            }

            let report = compute_reliability(&mut graph, "root", NOW).unwrap();
            for (i, (_, _, level)) in deps.iter().enumerate() {
                let dep_score = graph.cache[&format!("dep{}", i)];
                let effective = (dep_score - congruence_penalty(*level as u8)).max(0.0);
                prop_assert!(report.final_score <= effective + 1e-9);
            }
            prop_assert!(report.weakest_link.is_some());
        }

        /// Property: arbitrary graphs, cycles included, always terminate in range
        #[test]
        fn test_random_graph_terminates(
            edges in prop::collection::vec((0usize..6, 0usize..6, 0i64..=3), 0..15),
        ) {
            let mut graph = MockGraph::default();
            for i in 0..6 {
                graph.evidence(&format!("n{}", i), "internal", "pass", None);
            }
            for (a, b, level) in edges {
                graph.relate(Relation::new(format!("n{}", a), RelationType::DependsOn, format!("n{}", b), level, 0));
            }

            let report = compute_reliability(&mut graph, "n0", NOW).unwrap();
            prop_assert!((0.0..=1.0).contains(&report.final_score));
        }
    }
}
