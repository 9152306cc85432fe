//! Assay Engine
//!
//! One synchronous entry point for the assurance workflow. Every operation
//! is looked up in the dispatch table, authorized against the caller's role
//! (and optionally the context's phase), executed against the holon store,
//! and recorded in the audit log.
//!
//! Operations:
//! - `propose`, `verify`, `test`, `audit` - move hypotheses through L0, L1, L2
//! - `decide`, `resolve` - decision records and their outcomes
//! - `link`, `calculate_r`, `audit_tree`, `search` - the holon graph
//! - `transition`, `status`, `reset` - the phase machine
//! - `check_decay`, `waive`, `deprecate`, `refresh_scores` - maintenance
//!
//! # Example
//!
//! ```
//! use assay_domain::Role;
//! use assay_engine::{Engine, EngineConfig};
//! use serde_json::json;
//!
//! let mut engine = Engine::open(EngineConfig::in_memory(".assay")).unwrap();
//! let abductor = engine.assignment(Role::Abductor, "session-1");
//!
//! let outcome = engine
//!     .invoke("propose", &abductor, json!({"title": "Use Redis", "content": "Cache sessions"}))
//!     .unwrap();
//! assert_eq!(outcome.value["holon_id"], "use-redis");
//!
//! let observer = engine.assignment(Role::Observer, "session-2");
//! let err = engine
//!     .invoke("verify", &observer, json!({"holon_id": "use-redis", "verdict": "PASS"}))
//!     .unwrap_err();
//! assert_eq!(err.category(), "state");
//! ```

pub mod config;
pub mod dates;
mod engine;
mod error;
pub mod ops;
mod outcome;
pub mod telemetry;

pub use config::{ConfigError, EngineConfig};
pub use engine::Engine;
pub use error::EngineError;
pub use outcome::{IntegrityWarning, Outcome};
