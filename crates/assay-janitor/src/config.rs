//! Configuration for Janitor operations

use serde::{Deserialize, Serialize};

const SECS_PER_DAY: u64 = 86_400;

/// Configuration for the Janitor
///
/// # Examples
///
/// ```
/// use assay_janitor::JanitorConfig;
///
/// let config = JanitorConfig::default();
/// assert_eq!(config.expiry_warning_days, 30);
/// assert_eq!(config.expiry_warning_secs(), 30 * 86_400);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JanitorConfig {
    /// Waivers ending within this many days are flagged in the freshness report
    /// Default: 30
    pub expiry_warning_days: u64,

    /// Log every holon whose score changes during a refresh sweep
    /// Default: true
    pub log_score_changes: bool,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            expiry_warning_days: 30,
            log_score_changes: true,
        }
    }
}

impl JanitorConfig {
    /// Warning window in seconds
    pub fn expiry_warning_secs(&self) -> u64 {
        self.expiry_warning_days.saturating_mul(SECS_PER_DAY)
    }
}
