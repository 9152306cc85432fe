//! Gatekeeper configuration

use serde::Deserialize;

/// Configuration for authorization rules
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GatekeeperConfig {
    /// Enforce the optional per-operation phase restrictions
    pub enforce_phase_gates: bool,

    /// Enforce the role column of the dispatch table
    pub enforce_roles: bool,

    /// A decision needs at least one L2 holon in its context
    pub require_l2_for_decide: bool,
}

impl Default for GatekeeperConfig {
    fn default() -> Self {
        Self {
            enforce_phase_gates: false,
            enforce_roles: true,
            require_l2_for_decide: true,
        }
    }
}

impl GatekeeperConfig {
    /// Create a permissive configuration (any role, any phase)
    pub fn permissive() -> Self {
        Self {
            enforce_phase_gates: false,
            enforce_roles: false,
            require_l2_for_decide: false,
        }
    }

    /// Create a strict configuration (all gates enabled)
    pub fn strict() -> Self {
        Self {
            enforce_phase_gates: true,
            enforce_roles: true,
            require_l2_for_decide: true,
        }
    }
}
