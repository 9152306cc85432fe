//! Full-text search over holons and evidence

use crate::{from_sql_time, parse_layer, SqliteStore, StoreError};
use assay_domain::{DecisionStatus, Layer};
use rusqlite::ToSql;
use serde::Serialize;
use std::collections::HashSet;

/// Results returned when no limit is given
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Hard cap on results per search
pub const MAX_SEARCH_LIMIT: usize = 50;

/// Maximum number of terms in an any-word query
const MAX_OR_TERMS: usize = 10;

/// Which indexes a search consults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    /// Holon titles and content
    Holons,
    /// Evidence content
    Evidence,
    /// Both (holons first)
    #[default]
    All,
}

impl SearchScope {
    /// Parse a scope; empty means [`SearchScope::All`]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Some(SearchScope::All),
            "holons" => Some(SearchScope::Holons),
            "evidence" => Some(SearchScope::Evidence),
            _ => None,
        }
    }

    fn includes_holons(&self) -> bool {
        matches!(self, SearchScope::Holons | SearchScope::All)
    }

    fn includes_evidence(&self) -> bool {
        matches!(self, SearchScope::Evidence | SearchScope::All)
    }
}

/// Search criteria
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Text to match
    pub text: String,

    /// Indexes to consult
    pub scope: SearchScope,

    /// Restrict holon hits to one layer
    pub layer: Option<Layer>,

    /// Restrict holon hits to decision records with this resolution
    ///
    /// Takes precedence over `layer`.
    pub status: Option<DecisionStatus>,

    /// Maximum results; 0 means [`DEFAULT_SEARCH_LIMIT`], capped at [`MAX_SEARCH_LIMIT`]
    pub limit: usize,
}

impl SearchQuery {
    /// Search everything for `text` with default limits
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    fn effective_limit(&self) -> usize {
        match self.limit {
            0 => DEFAULT_SEARCH_LIMIT,
            n => n.min(MAX_SEARCH_LIMIT),
        }
    }
}

/// What a hit points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchHitKind {
    /// A holon
    Holon,
    /// An evidence row
    Evidence,
}

/// One search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Holon or evidence id
    pub id: String,

    /// Hit kind
    pub kind: SearchHitKind,

    /// Holon title, or "<type> for <holon>" for evidence
    pub title: String,

    /// Highlighted excerpt
    pub snippet: String,

    /// Holon layer (holon hits only)
    pub layer: Option<Layer>,

    /// Holon scope (holon hits only)
    pub scope: Option<String>,

    /// Cached reliability (holon hits only)
    pub score: Option<f64>,

    /// Last update (Unix seconds)
    pub updated_at: u64,
}

impl SqliteStore {
    /// Phrase search across holons and/or evidence
    ///
    /// The whole text is matched as one phrase, so index operators in the
    /// input are treated literally. Reflects every committed write.
    pub fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, StoreError> {
        let Some(phrase) = phrase_query(&query.text) else {
            return Ok(Vec::new());
        };
        self.run_search(&phrase, query)
    }

    /// Any-word search: matches holons or evidence containing at least one
    /// word of three or more characters from `query.text`
    pub fn search_any(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, StoreError> {
        let Some(terms) = any_word_query(&query.text) else {
            return Ok(Vec::new());
        };
        self.run_search(&terms, query)
    }

    fn run_search(&self, fts_query: &str, query: &SearchQuery) -> Result<Vec<SearchHit>, StoreError> {
        let limit = query.effective_limit();
        let mut hits = Vec::new();

        if query.scope.includes_holons() {
            hits.extend(self.search_holons(fts_query, query, limit)?);
        }
        if query.scope.includes_evidence() {
            hits.extend(self.search_evidence(fts_query, limit)?);
        }

        hits.truncate(limit);
        Ok(hits)
    }

    fn search_holons(
        &self,
        fts_query: &str,
        query: &SearchQuery,
        limit: usize,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let mut sql = String::from(
            "SELECT h.id, h.title, h.layer, h.scope, h.cached_r_score, h.updated_at,
                    snippet(holons_fts, 2, '**', '**', '...', 32)
             FROM holons_fts
             JOIN holons h ON holons_fts.id = h.id
             WHERE holons_fts MATCH ?",
        );
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(fts_query.to_string())];

        match (query.status, query.layer) {
            (Some(DecisionStatus::Open), _) => {
                sql.push_str(
                    " AND h.layer = 'DRR'
                      AND NOT EXISTS (SELECT 1 FROM evidence e WHERE e.holon_id = h.id
                          AND e.type IN ('implementation', 'abandonment', 'supersession'))",
                );
            }
            (Some(status), _) => {
                sql.push_str(
                    " AND h.layer = 'DRR'
                      AND EXISTS (SELECT 1 FROM evidence e WHERE e.holon_id = h.id AND e.type = ?)",
                );
                params.push(Box::new(status.evidence_type().unwrap_or_default()));
            }
            (None, Some(layer)) => {
                sql.push_str(" AND h.layer = ?");
                params.push(Box::new(layer.as_str()));
            }
            (None, None) => {}
        }

        sql.push_str(" ORDER BY rank LIMIT ?");
        params.push(Box::new(limit as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let hits = stmt
            .query_map(&param_refs[..], |row| {
                let layer: String = row.get(2)?;
                Ok(SearchHit {
                    id: row.get(0)?,
                    kind: SearchHitKind::Holon,
                    title: row.get(1)?,
                    layer: Some(parse_layer(2, &layer)?),
                    scope: row.get(3)?,
                    score: Some(row.get(4)?),
                    updated_at: from_sql_time(row.get(5)?),
                    snippet: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hits)
    }

    fn search_evidence(&self, fts_query: &str, limit: usize) -> Result<Vec<SearchHit>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT e.id, e.holon_id, e.type, e.created_at,
                    snippet(evidence_fts, 1, '**', '**', '...', 32)
             FROM evidence_fts
             JOIN evidence e ON evidence_fts.id = e.id
             WHERE evidence_fts MATCH ?1
             ORDER BY rank
             LIMIT ?2",
        )?;
        let hits = stmt
            .query_map(rusqlite::params![fts_query, limit as i64], |row| {
                let holon_id: String = row.get(1)?;
                let evidence_type: String = row.get(2)?;
                Ok(SearchHit {
                    id: row.get(0)?,
                    kind: SearchHitKind::Evidence,
                    title: format!("{} for {}", evidence_type, holon_id),
                    layer: None,
                    scope: None,
                    score: None,
                    updated_at: from_sql_time(row.get(3)?),
                    snippet: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hits)
    }
}

/// Quote the whole text as a single FTS5 phrase
fn phrase_query(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(format!("\"{}\"", text.replace('"', "\"\"")))
}

/// OR together the distinct words of at least three characters
fn any_word_query(text: &str) -> Option<String> {
    let mut seen = HashSet::new();
    let terms: Vec<String> = text
        .split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| ".,;:!?\"'()[]{}".contains(c))
                .to_lowercase()
        })
        .filter(|word| word.chars().count() >= 3)
        .filter(|word| seen.insert(word.clone()))
        .take(MAX_OR_TERMS)
        .map(|word| format!("\"{}\"", word.replace('"', "\"\"")))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrase_query_escapes_quotes() {
        assert_eq!(phrase_query("  "), None);
        assert_eq!(phrase_query("redis-cache").as_deref(), Some("\"redis-cache\""));
        assert_eq!(phrase_query("say \"hi\"").as_deref(), Some("\"say \"\"hi\"\"\""));
    }

    #[test]
    fn test_any_word_query() {
        assert_eq!(
            any_word_query("Use Redis, or use Memcached!").as_deref(),
            Some("\"use\" OR \"redis\" OR \"memcached\"")
        );
        assert_eq!(any_word_query("a an of"), None);
    }

    #[test]
    fn test_any_word_query_caps_terms() {
        let text = (0..20).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ");
        let query = any_word_query(&text).unwrap();
        assert_eq!(query.matches(" OR ").count(), MAX_OR_TERMS - 1);
    }

    #[test]
    fn test_limit_normalization() {
        let mut query = SearchQuery::new("x");
        assert_eq!(query.effective_limit(), DEFAULT_SEARCH_LIMIT);
        query.limit = 500;
        assert_eq!(query.effective_limit(), MAX_SEARCH_LIMIT);
        query.limit = 3;
        assert_eq!(query.effective_limit(), 3);
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!(SearchScope::parse(""), Some(SearchScope::All));
        assert_eq!(SearchScope::parse("Evidence"), Some(SearchScope::Evidence));
        assert_eq!(SearchScope::parse("files"), None);
    }
}
