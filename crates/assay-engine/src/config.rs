//! Engine configuration loaded from TOML
//!
//! Every section is optional; a missing file or section means defaults.

use assay_domain::DEFAULT_ASSURANCE_THRESHOLD;
use assay_gatekeeper::GatekeeperConfig;
use assay_janitor::JanitorConfig;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted key of the offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Top-level engine configuration
///
/// # Examples
///
/// ```
/// use assay_engine::EngineConfig;
///
/// let config = EngineConfig::from_toml_str(r#"
///     [workflow]
///     default_threshold = 0.9
///
///     [gatekeeper]
///     enforce_phase_gates = true
/// "#).unwrap();
///
/// assert_eq!(config.workflow.default_threshold, 0.9);
/// assert!(config.gatekeeper.enforce_phase_gates);
/// assert_eq!(config.evidence.validity_days, 90);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// `[store]`
    pub store: StoreSettings,
    /// `[workflow]`
    pub workflow: WorkflowSettings,
    /// `[evidence]`
    pub evidence: EvidenceSettings,
    /// `[gatekeeper]`
    pub gatekeeper: GatekeeperConfig,
    /// `[janitor]`
    pub janitor: JanitorConfig,
}

/// Where the holon graph lives
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// SQLite database file (`:memory:` for a throwaway store)
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".assay/assay.db"),
        }
    }
}

/// Phase machine settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    /// Directory that evidence anchor URIs are resolved against
    pub root: PathBuf,

    /// Assurance threshold for contexts with no stored threshold
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,

    /// Context used when the caller names none
    #[serde(default = "default_context")]
    pub default_context: String,

    /// `[workflow.thresholds]`: per-context overrides of the assurance threshold
    pub thresholds: BTreeMap<String, f64>,
}

impl WorkflowSettings {
    /// Configured override for `context_id`, if any
    pub fn threshold_override(&self, context_id: &str) -> Option<f64> {
        self.thresholds.get(context_id).copied()
    }

    /// Threshold a new context starts with
    pub fn threshold_for(&self, context_id: &str) -> f64 {
        self.threshold_override(context_id).unwrap_or(self.default_threshold)
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".assay"),
            default_threshold: default_threshold(),
            default_context: default_context(),
            thresholds: BTreeMap::new(),
        }
    }
}

/// Evidence defaults
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EvidenceSettings {
    /// Validity window for new evidence recorded without an expiry
    #[serde(default = "default_validity_days")]
    pub validity_days: u64,
}

impl Default for EvidenceSettings {
    fn default() -> Self {
        Self {
            validity_days: default_validity_days(),
        }
    }
}

impl EvidenceSettings {
    /// Validity window in seconds
    pub fn validity_secs(&self) -> u64 {
        self.validity_days.saturating_mul(86_400)
    }
}

fn default_threshold() -> f64 {
    DEFAULT_ASSURANCE_THRESHOLD
}

fn default_context() -> String {
    "default".to_string()
}

/// Default validity: 90 days
fn default_validity_days() -> u64 {
    90
}

impl EngineConfig {
    /// Load configuration from a TOML file, or defaults if it does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with an in-memory store, for tests and scratch use
    pub fn in_memory(root: impl Into<PathBuf>) -> Self {
        Self {
            store: StoreSettings {
                path: PathBuf::from(":memory:"),
            },
            workflow: WorkflowSettings {
                root: root.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.workflow.default_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "workflow.default_threshold",
                reason: format!("{} is outside (0, 1]", threshold),
            });
        }
        for (context, threshold) in &self.workflow.thresholds {
            if !(*threshold > 0.0 && *threshold <= 1.0) {
                return Err(ConfigError::InvalidValue {
                    field: "workflow.thresholds",
                    reason: format!("{} for context '{}' is outside (0, 1]", threshold, context),
                });
            }
        }
        if self.workflow.default_context.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "workflow.default_context",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.store.path, PathBuf::from(".assay/assay.db"));
        assert_eq!(config.workflow.default_threshold, 0.8);
        assert_eq!(config.workflow.default_context, "default");
        assert_eq!(config.evidence.validity_days, 90);
        assert!(!config.gatekeeper.enforce_phase_gates);
        assert_eq!(config.janitor.expiry_warning_days, 30);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = EngineConfig::from_toml_str(
            r#"
            [store]
            path = ":memory:"

            [workflow]
            root = "/srv/project/.assay"

            [janitor]
            expiry_warning_days = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.store.path, PathBuf::from(":memory:"));
        assert_eq!(config.workflow.root, PathBuf::from("/srv/project/.assay"));
        assert_eq!(config.workflow.default_threshold, 0.8);
        assert_eq!(config.janitor.expiry_warning_days, 7);
        assert!(config.janitor.log_score_changes);
    }

    #[test]
    fn test_threshold_out_of_range() {
        let err = EngineConfig::from_toml_str("[workflow]\ndefault_threshold = 1.5").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "workflow.default_threshold", .. }
        ));

        assert!(EngineConfig::from_toml_str("[workflow]\ndefault_threshold = 0.0").is_err());
    }

    #[test]
    fn test_context_thresholds() {
        let config = EngineConfig::from_toml_str(
            r#"
            [workflow]
            default_threshold = 0.9

            [workflow.thresholds]
            spike = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.workflow.threshold_override("spike"), Some(0.5));
        assert_eq!(config.workflow.threshold_for("spike"), 0.5);
        assert_eq!(config.workflow.threshold_for("payments"), 0.9);

        let err = EngineConfig::from_toml_str("[workflow.thresholds]\nspike = 2.0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "workflow.thresholds", .. }));
    }

    #[test]
    fn test_bad_toml() {
        let err = EngineConfig::from_toml_str("[workflow\nroot = 1").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let config = EngineConfig::load("/nonexistent/assay.toml").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[evidence]\nvalidity_days = 30").unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.evidence.validity_days, 30);
        assert_eq!(config.evidence.validity_secs(), 30 * 86_400);
    }
}
