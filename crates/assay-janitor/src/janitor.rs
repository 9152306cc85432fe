//! Score refresh, freshness reporting, waivers and deprecation

use crate::{JanitorConfig, JanitorError, JanitorMetrics};
use assay_domain::traits::{HolonQuery, HolonStore};
use assay_domain::{compute_reliability, new_record_id, Layer, Waiver};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::time::Instant;

const SECS_PER_DAY: u64 = 86_400;

/// Score differences smaller than this are not reported as changes
const SCORE_EPSILON: f64 = 1e-9;

fn store_err(e: impl Display) -> JanitorError {
    JanitorError::Store(e.to_string())
}

/// A cached score that moved during a refresh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreChange {
    /// Holon rescored
    pub holon_id: String,
    /// Cached score before the sweep
    pub before: f64,
    /// Freshly computed score
    pub after: f64,
}

/// Outcome of one refresh sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    /// Holons scored
    pub scored: usize,
    /// Scores that moved
    pub changed: Vec<ScoreChange>,
    /// Holons whose new score could not be cached
    pub uncached: Vec<String>,
}

/// One expired, un-waived evidence item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaleEvidence {
    /// Evidence id
    pub evidence_id: String,
    /// Evidence type
    pub evidence_type: String,
    /// When it expired (Unix seconds)
    pub expired_at: u64,
    /// Whole days since expiry
    pub days_overdue: u64,
}

/// A holon carrying expired evidence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaleHolon {
    /// Holon id
    pub holon_id: String,
    /// Title (the id when the holon is missing)
    pub title: String,
    /// Current layer, if the holon exists
    pub layer: Option<Layer>,
    /// Its expired evidence
    pub evidence: Vec<StaleEvidence>,
}

/// An active waiver
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaiverStatus {
    /// Waiver id
    pub waiver_id: String,
    /// Evidence covered
    pub evidence_id: String,
    /// Who issued it
    pub waived_by: String,
    /// End of the waiver (Unix seconds)
    pub waived_until: u64,
    /// Whole days left
    pub days_left: u64,
    /// Why the risk was accepted
    pub rationale: String,
    /// Ends within the configured warning window
    pub expiring_soon: bool,
}

/// Evidence freshness at a point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FreshnessReport {
    /// Holons with expired, un-waived evidence, by holon id
    pub stale: Vec<StaleHolon>,
    /// Waivers active at report time
    pub waivers: Vec<WaiverStatus>,
}

impl FreshnessReport {
    /// No expired evidence and no waiver about to lapse
    pub fn is_clean(&self) -> bool {
        self.stale.is_empty() && !self.waivers.iter().any(|w| w.expiring_soon)
    }

    /// Waivers ending within the warning window
    pub fn expiring_waivers(&self) -> impl Iterator<Item = &WaiverStatus> {
        self.waivers.iter().filter(|w| w.expiring_soon)
    }
}

/// Maintenance operations over the holon graph
///
/// Everything runs synchronously when called; nothing is scheduled.
///
/// # Examples
///
/// ```no_run
/// use assay_janitor::Janitor;
/// use assay_store::SqliteStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut store = SqliteStore::new(".assay/assay.db")?;
/// let mut janitor = Janitor::default_config();
///
/// let report = janitor.refresh_scores(&mut store, 1_700_000_000)?;
/// println!("Rescored {} holons", report.scored);
/// println!("{}", janitor.metrics().summary());
/// # Ok(())
/// # }
/// ```
pub struct Janitor {
    config: JanitorConfig,
    metrics: JanitorMetrics,
}

impl Janitor {
    /// Create a new Janitor with the given configuration
    pub fn new(config: JanitorConfig) -> Self {
        Self {
            config,
            metrics: JanitorMetrics::new(),
        }
    }

    /// Create a Janitor with default configuration
    pub fn default_config() -> Self {
        Self::new(JanitorConfig::default())
    }

    /// Get a reference to the current metrics
    pub fn metrics(&self) -> &JanitorMetrics {
        &self.metrics
    }

    /// Reset metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Recompute and cache the score of every holon, once each
    ///
    /// Each holon gets its own top-level computation, so a holon reached
    /// through several parents is still scored on its own terms.
    pub fn refresh_scores<S>(&mut self, store: &mut S, now: u64) -> Result<SweepReport, JanitorError>
    where
        S: HolonStore,
        S::Error: Display,
    {
        let start = Instant::now();
        let holons = store.list_holons(&HolonQuery::default()).map_err(store_err)?;
        let mut report = SweepReport::default();

        for holon in holons {
            let computed = compute_reliability(store, &holon.id, now).map_err(store_err)?;
            report.scored += 1;

            if !computed.cache_persisted() {
                for id in computed.uncached {
                    if !report.uncached.contains(&id) {
                        report.uncached.push(id);
                    }
                }
            }

            if (computed.final_score - holon.cached_score).abs() > SCORE_EPSILON {
                if self.config.log_score_changes {
                    tracing::info!(
                        holon = %holon.id,
                        before = holon.cached_score,
                        after = computed.final_score,
                        "Reliability changed"
                    );
                }
                report.changed.push(ScoreChange {
                    holon_id: holon.id,
                    before: holon.cached_score,
                    after: computed.final_score,
                });
            }
        }

        for id in &report.uncached {
            tracing::warn!(holon = %id, "Score cache write failed during refresh");
        }

        self.metrics.holons_scored += report.scored;
        self.metrics.scores_changed += report.changed.len();
        self.metrics.cache_failures += report.uncached.len();
        self.metrics.record_sweep();
        self.metrics.total_runtime_ms += start.elapsed().as_millis() as u64;

        tracing::debug!(scored = report.scored, changed = report.changed.len(), "Refresh sweep complete");
        Ok(report)
    }

    /// Report expired, un-waived evidence and the state of active waivers
    ///
    /// Expiry is judged against `now`; nothing is modified.
    pub fn freshness_report<S>(&self, store: &S, now: u64) -> Result<FreshnessReport, JanitorError>
    where
        S: HolonStore,
        S::Error: Display,
    {
        let mut by_holon: BTreeMap<String, Vec<StaleEvidence>> = BTreeMap::new();

        for evidence in store.list_evidence_expiring_before(now).map_err(store_err)? {
            let Some(expired_at) = evidence.valid_until.filter(|_| evidence.is_expired(now)) else {
                continue;
            };
            let waived = store
                .get_active_waiver_for_evidence(&evidence.id, now)
                .map_err(store_err)?
                .is_some();
            if waived {
                continue;
            }
            by_holon.entry(evidence.holon_id.clone()).or_default().push(StaleEvidence {
                evidence_id: evidence.id,
                evidence_type: evidence.evidence_type.as_str().to_string(),
                expired_at,
                days_overdue: (now - expired_at) / SECS_PER_DAY,
            });
        }

        let mut stale = Vec::with_capacity(by_holon.len());
        for (holon_id, evidence) in by_holon {
            let holon = store.find_holon(&holon_id).map_err(store_err)?;
            stale.push(StaleHolon {
                title: holon.as_ref().map_or_else(|| holon_id.clone(), |h| h.title.clone()),
                layer: holon.map(|h| h.layer),
                holon_id,
                evidence,
            });
        }

        let warn_before = now.saturating_add(self.config.expiry_warning_secs());
        let waivers = store
            .list_active_waivers(now)
            .map_err(store_err)?
            .into_iter()
            .map(|w| WaiverStatus {
                days_left: w.waived_until.saturating_sub(now) / SECS_PER_DAY,
                expiring_soon: w.waived_until <= warn_before,
                waiver_id: w.id,
                evidence_id: w.evidence_id,
                waived_by: w.waived_by,
                waived_until: w.waived_until,
                rationale: w.rationale,
            })
            .collect();

        Ok(FreshnessReport { stale, waivers })
    }

    /// Suspend decay of one evidence item until `until`
    pub fn waive<S>(
        &mut self,
        store: &mut S,
        evidence_id: &str,
        waived_by: &str,
        until: u64,
        rationale: &str,
        now: u64,
    ) -> Result<Waiver, JanitorError>
    where
        S: HolonStore,
        S::Error: Display,
    {
        if rationale.trim().is_empty() {
            return Err(JanitorError::InvalidWaiver("a rationale is required".to_string()));
        }
        if until <= now {
            return Err(JanitorError::InvalidWaiver(
                "the waiver must end in the future".to_string(),
            ));
        }
        if store.get_evidence_by_id(evidence_id).map_err(store_err)?.is_none() {
            return Err(JanitorError::NotFound {
                kind: "evidence",
                id: evidence_id.to_string(),
            });
        }

        let waiver = Waiver {
            id: new_record_id(),
            evidence_id: evidence_id.to_string(),
            waived_by: waived_by.to_string(),
            waived_until: until,
            rationale: rationale.to_string(),
            created_at: now,
        };
        store.create_waiver(waiver.clone()).map_err(store_err)?;
        self.metrics.waivers_issued += 1;

        tracing::info!(evidence = %evidence_id, until, by = %waived_by, "Waiver issued");
        Ok(waiver)
    }

    /// Move a holon down one layer (L2 → L1, L1 → L0)
    ///
    /// Returns the layers left and entered.
    pub fn deprecate<S>(
        &mut self,
        store: &mut S,
        holon_id: &str,
        now: u64,
    ) -> Result<(Layer, Layer), JanitorError>
    where
        S: HolonStore,
        S::Error: Display,
    {
        let holon = store
            .find_holon(holon_id)
            .map_err(store_err)?
            .ok_or_else(|| JanitorError::NotFound {
                kind: "holon",
                id: holon_id.to_string(),
            })?;

        let target = holon.layer.previous().ok_or_else(|| {
            JanitorError::InvalidTransition(format!(
                "holon '{}' is in {}; only L2 and L1 holons can be deprecated",
                holon_id, holon.layer
            ))
        })?;

        store
            .update_holon_layer(holon_id, target, now)
            .map_err(store_err)?;
        self.metrics.record_deprecation(holon.layer);

        tracing::info!(holon = %holon_id, from = %holon.layer, to = %target, "Holon deprecated");
        Ok((holon.layer, target))
    }
}
