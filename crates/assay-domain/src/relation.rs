//! Relation module - directed, typed edges between holons

use std::fmt;

/// Default congruence level for new relations
pub const DEFAULT_CONGRUENCE: u8 = 3;

/// Highest congruence level
pub const MAX_CONGRUENCE: u8 = 3;

/// Type of relation between holons
///
/// Only [`RelationType::ComponentOf`] and [`RelationType::DependsOn`]
/// propagate reliability; the rest are informational.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelationType {
    /// Source is a part of target (target relies on source)
    ComponentOf,

    /// Source relies on target
    DependsOn,

    /// Source is an alternative grouped under target
    MemberOf,

    /// Decision selects target
    Selects,

    /// Decision rejects target
    Rejects,

    /// Source decision was replaced by target
    SupersededBy,

    /// Any other relation type
    Other(String),
}

impl RelationType {
    /// Stored form
    pub fn as_str(&self) -> &str {
        match self {
            RelationType::ComponentOf => "componentOf",
            RelationType::DependsOn => "dependsOn",
            RelationType::MemberOf => "memberOf",
            RelationType::Selects => "selects",
            RelationType::Rejects => "rejects",
            RelationType::SupersededBy => "supersededBy",
            RelationType::Other(s) => s,
        }
    }

    /// Parse a relation type (case-insensitive for the known names)
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "componentof" => RelationType::ComponentOf,
            "dependson" => RelationType::DependsOn,
            "memberof" => RelationType::MemberOf,
            "selects" => RelationType::Selects,
            "rejects" => RelationType::Rejects,
            "supersededby" => RelationType::SupersededBy,
            _ => RelationType::Other(s.to_string()),
        }
    }

    /// Whether edges of this type carry reliability
    pub fn propagates_reliability(&self) -> bool {
        matches!(self, RelationType::ComponentOf | RelationType::DependsOn)
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed relation between two holons
///
/// At most one relation exists per (source, target, type) triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Source holon ID
    pub source_id: String,

    /// Target holon ID
    pub target_id: String,

    /// Type of relation
    pub relation_type: RelationType,

    /// Congruence level [0, 3]
    pub congruence_level: u8,

    /// When this relation was established
    pub created_at: u64,
}

impl Relation {
    /// Create a new relation, clamping the congruence level into range
    pub fn new(
        source_id: String,
        relation_type: RelationType,
        target_id: String,
        congruence_level: i64,
        created_at: u64,
    ) -> Self {
        Self {
            source_id,
            target_id,
            relation_type,
            congruence_level: clamp_congruence(congruence_level),
            created_at,
        }
    }

    /// Whether source and target are the same holon
    pub fn is_self_relation(&self) -> bool {
        self.source_id == self.target_id
    }

    /// For reliability-carrying edges, the (dependent, dependency) pair
    ///
    /// `a componentOf b` makes `b` depend on `a`; `a dependsOn b` makes `a`
    /// depend on `b`. Informational edges return `None`.
    pub fn dependency_pair(&self) -> Option<(&str, &str)> {
        match self.relation_type {
            RelationType::ComponentOf => Some((self.target_id.as_str(), self.source_id.as_str())),
            RelationType::DependsOn => Some((self.source_id.as_str(), self.target_id.as_str())),
            _ => None,
        }
    }
}

/// Out-of-range congruence levels fall back to the default rather than failing
pub fn clamp_congruence(level: i64) -> u8 {
    if (0..=MAX_CONGRUENCE as i64).contains(&level) {
        level as u8
    } else {
        DEFAULT_CONGRUENCE
    }
}

/// Penalty applied to a dependency's score for the edge's congruence level
pub fn congruence_penalty(level: u8) -> f64 {
    match level {
        3 => 0.0,
        2 => 0.1,
        1 => 0.4,
        _ => 0.9,
    }
}
