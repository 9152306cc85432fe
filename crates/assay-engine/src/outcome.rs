//! Successful results with non-fatal diagnostics attached

use serde::Serialize;
use std::fmt;

/// A problem that did not stop the operation
///
/// Cache and index maintenance, optional relations and the audit trail are
/// best-effort; their failures are surfaced here rather than as errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityWarning {
    /// A computed score could not be written to the holon's cache
    CacheWriteFailed {
        /// Holon whose cache is stale
        holon_id: String,
    },

    /// A relation was not created because it would close a dependency cycle
    RelationSkippedCycle {
        /// Proposed source
        source_id: String,
        /// Proposed target
        target_id: String,
        /// Proposed type
        relation_type: String,
    },

    /// A relation could not be written
    RelationFailed {
        /// Proposed source
        source_id: String,
        /// Proposed target
        target_id: String,
        /// Proposed type
        relation_type: String,
        /// Store error text
        reason: String,
    },

    /// An optional reference points at a record that does not exist
    MissingReference {
        /// Record kind
        record_kind: String,
        /// Missing id
        id: String,
        /// What was skipped because of it
        skipped: String,
    },

    /// A follow-up layer change could not be applied
    PromotionFailed {
        /// Holon left in its old layer
        holon_id: String,
        /// Store error text
        reason: String,
    },

    /// The audit row for the operation could not be written
    AuditLogFailed {
        /// Store error text
        reason: String,
    },
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityWarning::CacheWriteFailed { holon_id } => {
                write!(f, "score cache for {} could not be updated", holon_id)
            }
            IntegrityWarning::RelationSkippedCycle {
                source_id,
                target_id,
                relation_type,
            } => write!(
                f,
                "{} {} {} skipped: it would create a dependency cycle",
                source_id, relation_type, target_id
            ),
            IntegrityWarning::RelationFailed {
                source_id,
                target_id,
                relation_type,
                reason,
            } => write!(
                f,
                "{} {} {} not created: {}",
                source_id, relation_type, target_id, reason
            ),
            IntegrityWarning::MissingReference { record_kind, id, skipped } => {
                write!(f, "{} '{}' not found, skipped {}", record_kind, id, skipped)
            }
            IntegrityWarning::PromotionFailed { holon_id, reason } => {
                write!(f, "{} could not be promoted: {}", holon_id, reason)
            }
            IntegrityWarning::AuditLogFailed { reason } => {
                write!(f, "audit log entry not written: {}", reason)
            }
        }
    }
}

/// Result of an operation plus any warnings raised along the way
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    /// The operation's result
    pub value: T,
    /// Non-fatal problems, in the order they occurred
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<IntegrityWarning>,
}

impl<T> Outcome<T> {
    /// A result with no warnings
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    /// Whether any warning was raised
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Transform the value, keeping the warnings
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}
