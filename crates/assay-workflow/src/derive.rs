//! Informational phase inferred from knowledge counts
//!
//! Used for status display only. Nothing in the transition path consults it.

use assay_domain::{Layer, Phase};
use std::collections::BTreeMap;

/// Active holon counts of one bounded context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerCensus {
    /// Unverified hypotheses
    pub l0: u64,
    /// Logically verified
    pub l1: u64,
    /// Empirically validated
    pub l2: u64,
    /// Whether any L2 holon carries an audit report
    pub audited_l2: bool,
}

impl LayerCensus {
    /// Build a census from per-layer counts; DRR and invalid holons are ignored
    pub fn from_counts(counts: &BTreeMap<Layer, u64>, audited_l2: bool) -> Self {
        let count = |layer| counts.get(&layer).copied().unwrap_or(0);
        Self {
            l0: count(Layer::L0),
            l1: count(Layer::L1),
            l2: count(Layer::L2),
            audited_l2,
        }
    }
}

/// Most advanced phase the current data suggests
pub fn derive_phase(census: &LayerCensus) -> Phase {
    if census.l2 > 0 && census.audited_l2 {
        Phase::Audit
    } else if census.l2 > 0 {
        Phase::Induction
    } else if census.l1 > 0 {
        Phase::Deduction
    } else if census.l0 > 0 {
        Phase::Abduction
    } else {
        Phase::Idle
    }
}
