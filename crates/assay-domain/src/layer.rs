//! Layer module - assurance tiers for holons

use std::fmt;

/// Assurance layer of a holon
///
/// Holons move upward as they are checked:
/// - L0: Unverified hypothesis
/// - L1: Logically checked (deduction passed)
/// - L2: Empirically validated (induction passed)
/// - Drr: Decision record
/// - Invalid: Disproved, retained for history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    /// Unverified
    L0,

    /// Logically checked
    L1,

    /// Empirically validated
    L2,

    /// Design rationale record (a decision)
    Drr,

    /// Disproved
    Invalid,
}

impl Layer {
    /// All layers, in storage order
    pub const ALL: [Layer; 5] = [Layer::L0, Layer::L1, Layer::L2, Layer::Drr, Layer::Invalid];

    /// Get the layer name as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::L0 => "L0",
            Layer::L1 => "L1",
            Layer::L2 => "L2",
            Layer::Drr => "DRR",
            Layer::Invalid => "invalid",
        }
    }

    /// Parse a layer from its stored name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "l0" => Some(Layer::L0),
            "l1" => Some(Layer::L1),
            "l2" => Some(Layer::L2),
            "drr" => Some(Layer::Drr),
            "invalid" => Some(Layer::Invalid),
            _ => None,
        }
    }

    /// Next layer on successful checking (for promotion)
    pub fn next(&self) -> Option<Self> {
        match self {
            Layer::L0 => Some(Layer::L1),
            Layer::L1 => Some(Layer::L2),
            Layer::L2 | Layer::Drr | Layer::Invalid => None,
        }
    }

    /// Previous layer (for deprecation after evidence decays)
    pub fn previous(&self) -> Option<Self> {
        match self {
            Layer::L2 => Some(Layer::L1),
            Layer::L1 => Some(Layer::L0),
            Layer::L0 | Layer::Drr | Layer::Invalid => None,
        }
    }

    /// Whether holons in this layer are still part of the live cycle
    pub fn is_active(&self) -> bool {
        matches!(self, Layer::L0 | Layer::L1 | Layer::L2)
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for Layer {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::str::FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid layer: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_promotion() {
        assert_eq!(Layer::L0.next(), Some(Layer::L1));
        assert_eq!(Layer::L1.next(), Some(Layer::L2));
        assert_eq!(Layer::L2.next(), None);
        assert_eq!(Layer::Invalid.next(), None);
    }

    #[test]
    fn test_layer_deprecation() {
        assert_eq!(Layer::L2.previous(), Some(Layer::L1));
        assert_eq!(Layer::L1.previous(), Some(Layer::L0));
        assert_eq!(Layer::L0.previous(), None);
        assert_eq!(Layer::Drr.previous(), None);
    }

    #[test]
    fn test_layer_parse() {
        for layer in Layer::ALL {
            assert_eq!(Layer::parse(layer.as_str()), Some(layer));
        }
        assert_eq!(Layer::parse("drr"), Some(Layer::Drr));
        assert_eq!(Layer::parse("L3"), None);
        assert!("bogus".parse::<Layer>().is_err());
    }
}
