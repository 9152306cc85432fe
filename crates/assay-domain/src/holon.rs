//! Holon module - the tracked unit of knowledge or decision

use crate::Layer;
use std::fmt;

/// Kind of holon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HolonKind {
    /// A technical / system hypothesis
    System,

    /// A knowledge claim
    Episteme,
}

impl HolonKind {
    /// Get the kind name as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            HolonKind::System => "system",
            HolonKind::Episteme => "episteme",
        }
    }

    /// Parse a kind from its stored name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Some(HolonKind::System),
            "episteme" => Some(HolonKind::Episteme),
            _ => None,
        }
    }
}

impl fmt::Display for HolonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for HolonKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A holon - a hypothesis, evidence-bearing claim, or decision record
///
/// Only `layer` and `cached_score` change after creation. Holons are
/// never deleted; disproved ones move to [`Layer::Invalid`].
#[derive(Debug, Clone, PartialEq)]
pub struct Holon {
    /// Stable identifier, derived from the title (see [`slugify`])
    pub id: String,

    /// Kind (decision records carry none)
    pub kind: Option<HolonKind>,

    /// Current assurance layer
    pub layer: Layer,

    /// Human-readable title
    pub title: String,

    /// Body text
    pub content: String,

    /// Bounded context this holon belongs to
    pub context_id: String,

    /// Optional scope of applicability
    pub scope: Option<String>,

    /// Last computed reliability, always within [0.0, 1.0]
    pub cached_score: f64,

    /// Creation timestamp (Unix seconds)
    pub created_at: u64,

    /// Last update timestamp (Unix seconds)
    pub updated_at: u64,
}

impl Holon {
    /// Create a new holon with an empty score cache
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        kind: Option<HolonKind>,
        layer: Layer,
        title: String,
        content: String,
        context_id: String,
        scope: Option<String>,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            kind,
            layer,
            title,
            content,
            context_id,
            scope,
            cached_score: 0.0,
            created_at,
            updated_at: created_at,
        }
    }
}

/// Derive a stable holon id from a title
///
/// Lower-cases the title and collapses every run of non-alphanumeric
/// characters into a single `-`, trimming dashes at both ends.
///
/// # Examples
///
/// ```
/// use assay_domain::slugify;
///
/// assert_eq!(slugify("Use Redis for Caching!"), "use-redis-for-caching");
/// ```
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Generate a fresh record identifier (UUIDv7) for evidence, waivers and log rows
pub fn new_record_id() -> String {
    uuid::Uuid::now_v7().to_string()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: slugs never start or end with a dash and never contain "--"
        #[test]
        fn test_slug_shape(title in ".{0,64}") {
            let slug = slugify(&title);
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
            prop_assert!(slug.chars().all(|c| c == '-' || c.is_ascii_lowercase() || c.is_ascii_digit()));
        }

        /// Property: slugify is idempotent
        #[test]
        fn test_slug_idempotent(title in "[A-Za-z0-9 _.-]{0,40}") {
            let once = slugify(&title);
            prop_assert_eq!(slugify(&once), once.clone());
        }
    }
}
