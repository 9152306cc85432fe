//! Semantic preconditions checked before an operation mutates anything
//!
//! Each check returns the values the operation needs next (the parsed
//! verdict, the loaded holon) so callers never re-validate.

use crate::{GatekeeperConfig, GatekeeperError};
use assay_domain::traits::{HolonQuery, HolonStore};
use assay_domain::{Holon, HolonKind, Layer};
use std::fmt;

/// Verdict given to `verify` and `test`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckVerdict {
    /// The hypothesis holds
    Pass,
    /// The hypothesis is disproved
    Fail,
    /// The hypothesis needs rework
    Refine,
}

impl CheckVerdict {
    /// Parse a verdict (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PASS" => Some(CheckVerdict::Pass),
            "FAIL" => Some(CheckVerdict::Fail),
            "REFINE" => Some(CheckVerdict::Refine),
            _ => None,
        }
    }

    /// Canonical form
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckVerdict::Pass => "PASS",
            CheckVerdict::Fail => "FAIL",
            CheckVerdict::Refine => "REFINE",
        }
    }

    /// Form stored on evidence rows
    pub fn evidence_verdict(&self) -> &'static str {
        match self {
            CheckVerdict::Pass => "pass",
            CheckVerdict::Fail => "fail",
            CheckVerdict::Refine => "refine",
        }
    }
}

impl fmt::Display for CheckVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn failed(
    operation: &'static str,
    condition: impl Into<String>,
    suggestion: impl Into<String>,
) -> GatekeeperError {
    GatekeeperError::Precondition {
        operation,
        condition: condition.into(),
        suggestion: suggestion.into(),
    }
}

fn require(
    operation: &'static str,
    field: &str,
    value: &str,
) -> Result<(), GatekeeperError> {
    if value.trim().is_empty() {
        Err(failed(
            operation,
            format!("{} is required", field),
            format!("Provide a non-empty {}", field),
        ))
    } else {
        Ok(())
    }
}

fn parse_verdict(operation: &'static str, verdict: &str) -> Result<CheckVerdict, GatekeeperError> {
    CheckVerdict::parse(verdict).ok_or_else(|| {
        failed(
            operation,
            format!("invalid verdict '{}'", verdict),
            "Use PASS, FAIL or REFINE",
        )
    })
}

fn load_holon<S>(store: &S, operation: &'static str, holon_id: &str) -> Result<Holon, GatekeeperError>
where
    S: HolonStore,
    S::Error: fmt::Display,
{
    require(operation, "holon id", holon_id)?;
    store
        .find_holon(holon_id)
        .map_err(|e| GatekeeperError::Store(format!("Failed to load holon: {}", e)))?
        .ok_or_else(|| GatekeeperError::NotFound {
            kind: "holon",
            id: holon_id.to_string(),
        })
}

/// `search`: a query is required
pub fn check_search(query: &str) -> Result<(), GatekeeperError> {
    require("search", "query", query)
}

/// `propose`: title, content and a known kind are required
pub fn check_propose(title: &str, content: &str, kind: &str) -> Result<HolonKind, GatekeeperError> {
    require("propose", "title", title)?;
    require("propose", "content", content)?;
    HolonKind::parse(kind).ok_or_else(|| {
        failed(
            "propose",
            format!("invalid kind '{}'", kind),
            "Use 'system' for code or architecture, 'episteme' for process or documentation",
        )
    })
}

/// `verify`: the holon exists, is in L0, and the verdict is valid
pub fn check_verify<S>(
    store: &S,
    holon_id: &str,
    verdict: &str,
) -> Result<(Holon, CheckVerdict), GatekeeperError>
where
    S: HolonStore,
    S::Error: fmt::Display,
{
    let holon = load_holon(store, "verify", holon_id)?;
    if holon.layer != Layer::L0 {
        return Err(failed(
            "verify",
            format!("holon '{}' is in {}, expected L0", holon.id, holon.layer),
            "Only L0 hypotheses can be verified; propose a new hypothesis instead",
        ));
    }
    let verdict = parse_verdict("verify", verdict)?;
    Ok((holon, verdict))
}

/// `test`: the holon exists, has been verified (L1 or L2), and the verdict is valid
pub fn check_test<S>(
    store: &S,
    holon_id: &str,
    verdict: &str,
) -> Result<(Holon, CheckVerdict), GatekeeperError>
where
    S: HolonStore,
    S::Error: fmt::Display,
{
    let holon = load_holon(store, "test", holon_id)?;
    match holon.layer {
        Layer::L1 | Layer::L2 => {}
        Layer::L0 => {
            return Err(failed(
                "test",
                format!("holon '{}' is in L0 and has not been verified", holon.id),
                "Run verify on the hypothesis first",
            ))
        }
        other => {
            return Err(failed(
                "test",
                format!("holon '{}' is in {}, expected L1 or L2", holon.id, other),
                "Only verified hypotheses can be tested",
            ))
        }
    }
    let verdict = parse_verdict("test", verdict)?;
    Ok((holon, verdict))
}

/// `audit`: the holon exists and is in L2
pub fn check_audit<S>(store: &S, holon_id: &str) -> Result<Holon, GatekeeperError>
where
    S: HolonStore,
    S::Error: fmt::Display,
{
    let holon = load_holon(store, "audit", holon_id)?;
    if holon.layer != Layer::L2 {
        return Err(failed(
            "audit",
            format!("holon '{}' is in {}, expected L2", holon.id, holon.layer),
            "Only validated (L2) hypotheses can be audited; run test first",
        ));
    }
    Ok(holon)
}

/// `decide`: winner and title are given, the winner exists, and (unless
/// configured otherwise) the context holds at least one L2 holon
pub fn check_decide<S>(
    store: &S,
    config: &GatekeeperConfig,
    context_id: &str,
    winner_id: &str,
    title: &str,
) -> Result<Holon, GatekeeperError>
where
    S: HolonStore,
    S::Error: fmt::Display,
{
    require("decide", "winner id", winner_id)?;
    require("decide", "title", title)?;
    let winner = load_holon(store, "decide", winner_id)?;

    if config.require_l2_for_decide {
        let query = HolonQuery {
            limit: Some(1),
            ..HolonQuery::in_context(context_id).with_layer(Layer::L2)
        };
        let candidates = store
            .list_holons(&query)
            .map_err(|e| GatekeeperError::Store(format!("Failed to count L2 holons: {}", e)))?;
        if candidates.is_empty() {
            return Err(failed(
                "decide",
                format!("no L2 holons in context '{}'", context_id),
                "Validate at least one hypothesis to L2 before deciding",
            ));
        }
    }

    Ok(winner)
}

/// `calculate_r`: the holon exists
pub fn check_calculate_r<S>(store: &S, holon_id: &str) -> Result<Holon, GatekeeperError>
where
    S: HolonStore,
    S::Error: fmt::Display,
{
    load_holon(store, "calculate_r", holon_id)
}

/// `audit_tree`: a root holon id is required
pub fn check_audit_tree(holon_id: &str) -> Result<(), GatekeeperError> {
    require("audit_tree", "holon id", holon_id)
}
