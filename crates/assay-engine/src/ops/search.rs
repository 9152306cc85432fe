//! `search`: full-text search over holons and evidence

use super::OpContext;
use crate::EngineError;
use assay_domain::{DecisionStatus, Layer};
use assay_gatekeeper::preconditions;
use assay_store::{SearchHit, SearchQuery, SearchScope};
use serde::{Deserialize, Serialize};

/// Parameters for a search
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Text to look for
    pub query: String,
    /// `holons`, `evidence` or `all` (default)
    #[serde(default)]
    pub scope: String,
    /// Only holons in this layer
    #[serde(default)]
    pub layer: Option<String>,
    /// Only decisions with this resolution (`open`, `implemented`, ...)
    #[serde(default)]
    pub status: Option<String>,
    /// Maximum hits (default 10, at most 50)
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Result of a search
#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub count: usize,
    /// True when the phrase matched nothing and any-word matching was used
    pub fallback: bool,
}

fn parse_filter<T>(
    field: &str,
    value: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
    accepted: &str,
) -> Result<Option<T>, EngineError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => parse(raw).map(Some).ok_or_else(|| {
            EngineError::validation_with_hint(format!("invalid {} '{}'", field, raw), format!("Use one of: {}", accepted))
        }),
    }
}

/// Handle `search`
///
/// The query is matched as a phrase first; if that finds nothing, any
/// hit containing one of its words is returned instead.
pub(crate) fn handle_search(ctx: &mut OpContext<'_>, params: SearchParams) -> Result<SearchResult, EngineError> {
    preconditions::check_search(&params.query)?;

    let scope = SearchScope::parse(&params.scope).ok_or_else(|| {
        EngineError::validation_with_hint(
            format!("invalid scope '{}'", params.scope),
            "Use holons, evidence or all",
        )
    })?;
    let layer = parse_filter("layer", params.layer.as_deref(), Layer::parse, "L0, L1, L2, DRR, invalid")?;
    let status = parse_filter(
        "status",
        params.status.as_deref(),
        DecisionStatus::parse,
        "open, implemented, abandoned, superseded",
    )?;

    let query = SearchQuery {
        text: params.query.trim().to_string(),
        scope,
        layer,
        status,
        limit: params.limit.unwrap_or(0),
    };

    let mut hits = ctx.store.search(&query)?;
    let fallback = hits.is_empty();
    if fallback {
        hits = ctx.store.search_any(&query)?;
    }
    tracing::debug!(query = %query.text, hits = hits.len(), fallback, "Search finished");

    Ok(SearchResult {
        query: query.text,
        count: hits.len(),
        hits,
        fallback,
    })
}
