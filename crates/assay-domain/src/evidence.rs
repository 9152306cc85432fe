//! Evidence and waiver records

use std::fmt;

/// Outcome recorded by a piece of evidence
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The check passed
    Pass,

    /// The check passed with reservations
    Degrade,

    /// The check failed
    Fail,

    /// Any other recorded verdict (scores as a failure)
    Other(String),
}

impl Verdict {
    /// Parse a verdict (case-insensitive); unknown values are kept verbatim
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "pass" => Verdict::Pass,
            "degrade" => Verdict::Degrade,
            "fail" => Verdict::Fail,
            _ => Verdict::Other(s.to_string()),
        }
    }

    /// Stored form
    pub fn as_str(&self) -> &str {
        match self {
            Verdict::Pass => "pass",
            Verdict::Degrade => "degrade",
            Verdict::Fail => "fail",
            Verdict::Other(s) => s,
        }
    }

    /// Base reliability contributed by this verdict
    pub fn base_score(&self) -> f64 {
        match self {
            Verdict::Pass => 1.0,
            Verdict::Degrade => 0.5,
            Verdict::Fail | Verdict::Other(_) => 0.0,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a piece of evidence came from
///
/// The source determines how congruent the evidence is with the holon's own
/// context, and therefore how much it is discounted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EvidenceType {
    /// Produced inside this context (CL3)
    Internal,

    /// Produced in a similar, external context (CL2)
    External,

    /// Taken from research in a different context (CL1)
    Research,

    /// An auditor's report (CL3)
    AuditReport,

    /// Free-form type (verification, implementation, ...)
    Other(String),
}

impl EvidenceType {
    /// Parse an evidence type (case-insensitive); unknown values are kept verbatim
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "internal" => EvidenceType::Internal,
            "external" => EvidenceType::External,
            "research" => EvidenceType::Research,
            "audit_report" => EvidenceType::AuditReport,
            _ => EvidenceType::Other(s.to_string()),
        }
    }

    /// Stored form
    pub fn as_str(&self) -> &str {
        match self {
            EvidenceType::Internal => "internal",
            EvidenceType::External => "external",
            EvidenceType::Research => "research",
            EvidenceType::AuditReport => "audit_report",
            EvidenceType::Other(s) => s,
        }
    }

    /// Congruence penalty subtracted from the verdict score
    pub fn congruence_penalty(&self) -> f64 {
        match self {
            EvidenceType::Internal | EvidenceType::AuditReport => 0.0,
            EvidenceType::External => 0.1,
            EvidenceType::Research => 0.4,
            EvidenceType::Other(_) => 0.0,
        }
    }
}

impl fmt::Display for EvidenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable observation attached to exactly one holon
///
/// Evidence is append-only: corrections are recorded as new evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    /// Record identifier
    pub id: String,

    /// Owning holon
    pub holon_id: String,

    /// Source type
    pub evidence_type: EvidenceType,

    /// Observation text (indexed for search)
    pub content: String,

    /// Recorded verdict
    pub verdict: Verdict,

    /// Assurance-level label (e.g. "L1", "L2")
    pub assurance_level: Option<String>,

    /// Pointer to the artifact grounding the observation
    pub carrier_ref: Option<String>,

    /// Expiry (Unix seconds); `None` never expires
    pub valid_until: Option<u64>,

    /// Creation timestamp (Unix seconds)
    pub created_at: u64,
}

impl Evidence {
    /// Whether the validity window has elapsed at `now`
    ///
    /// Waivers are not considered here; see [`Waiver::is_active`].
    pub fn is_expired(&self, now: u64) -> bool {
        matches!(self.valid_until, Some(until) if now > until)
    }
}

/// A time-boxed suspension of decay for one evidence item
#[derive(Debug, Clone, PartialEq)]
pub struct Waiver {
    /// Record identifier
    pub id: String,

    /// Evidence the waiver covers
    pub evidence_id: String,

    /// Who issued the waiver
    pub waived_by: String,

    /// End of the waiver (Unix seconds)
    pub waived_until: u64,

    /// Why the risk was accepted
    pub rationale: String,

    /// Creation timestamp (Unix seconds)
    pub created_at: u64,
}

impl Waiver {
    /// A waiver is active strictly before its end
    pub fn is_active(&self, now: u64) -> bool {
        now < self.waived_until
    }
}

/// Resolution state of a decision record
///
/// A decision is open until a resolution evidence row is attached to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionStatus {
    /// No resolution recorded
    Open,
    /// Carried out
    Implemented,
    /// Dropped without replacement
    Abandoned,
    /// Replaced by a newer decision
    Superseded,
}

impl DecisionStatus {
    /// Evidence types that close a decision
    pub const RESOLUTION_TYPES: [&'static str; 3] = ["implementation", "abandonment", "supersession"];

    /// Parse a status (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Some(DecisionStatus::Open),
            "implemented" => Some(DecisionStatus::Implemented),
            "abandoned" => Some(DecisionStatus::Abandoned),
            "superseded" => Some(DecisionStatus::Superseded),
            _ => None,
        }
    }

    /// Stored form
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::Open => "open",
            DecisionStatus::Implemented => "implemented",
            DecisionStatus::Abandoned => "abandoned",
            DecisionStatus::Superseded => "superseded",
        }
    }

    /// Evidence type recording this resolution (`None` for open)
    pub fn evidence_type(&self) -> Option<&'static str> {
        match self {
            DecisionStatus::Open => None,
            DecisionStatus::Implemented => Some("implementation"),
            DecisionStatus::Abandoned => Some("abandonment"),
            DecisionStatus::Superseded => Some("supersession"),
        }
    }

    /// Status implied by a resolution evidence type
    pub fn from_evidence_type(evidence_type: &str) -> Option<Self> {
        match evidence_type {
            "implementation" => Some(DecisionStatus::Implemented),
            "abandonment" => Some(DecisionStatus::Abandoned),
            "supersession" => Some(DecisionStatus::Superseded),
            _ => None,
        }
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for DecisionStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
