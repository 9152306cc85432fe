//! Metrics collection for Janitor operations

use assay_domain::Layer;
use std::collections::HashMap;

/// Metrics collected during Janitor operations
#[derive(Debug, Clone, Default)]
pub struct JanitorMetrics {
    /// Holons scored across all sweeps
    pub holons_scored: usize,

    /// Scores that differed from the cached value
    pub scores_changed: usize,

    /// Scores that could not be written to the cache
    pub cache_failures: usize,

    /// Waivers issued
    pub waivers_issued: usize,

    /// Holons demoted, keyed by the layer they left
    pub deprecated: HashMap<Layer, usize>,

    /// Total sweep iterations completed
    pub sweep_count: usize,

    /// Total sweep runtime in milliseconds
    pub total_runtime_ms: u64,
}

impl JanitorMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a deprecation from `from`
    pub fn record_deprecation(&mut self, from: Layer) {
        *self.deprecated.entry(from).or_insert(0) += 1;
    }

    /// Record a sweep cycle completion
    pub fn record_sweep(&mut self) {
        self.sweep_count += 1;
    }

    /// Total deprecations across all layers
    pub fn total_deprecated(&self) -> usize {
        self.deprecated.values().sum()
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Janitor Metrics Summary".to_string(),
            "======================".to_string(),
            format!("Sweep cycles: {}", self.sweep_count),
            format!("Total runtime: {}ms", self.total_runtime_ms),
            format!("Holons scored: {}", self.holons_scored),
            format!("Scores changed: {}", self.scores_changed),
            format!("Cache failures: {}", self.cache_failures),
            format!("Waivers issued: {}", self.waivers_issued),
        ];

        if !self.deprecated.is_empty() {
            lines.push(String::new());
            lines.push("Deprecations from layer:".to_string());
            let mut layers: Vec<_> = self.deprecated.iter().collect();
            layers.sort();
            for (layer, count) in layers {
                lines.push(format!("  {}: {}", layer, count));
            }
            lines.push(format!("  Total: {}", self.total_deprecated()));
        }

        lines.join("\n")
    }
}
