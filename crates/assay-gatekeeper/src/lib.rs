//! Assay Gatekeeper
//!
//! Decides whether a named operation may run before it touches the store.
//!
//! The Gatekeeper provides:
//! - A static dispatch table (operation name → required role, allowed phases)
//! - Per-operation semantic preconditions (holon exists, layer fits, verdict is valid)
//!
//! # Examples
//!
//! ```
//! use assay_domain::{Phase, Role};
//! use assay_gatekeeper::{Gatekeeper, GatekeeperConfig, Operation};
//!
//! let gatekeeper = Gatekeeper::new(GatekeeperConfig::default());
//!
//! let rule = gatekeeper.authorize("verify", Role::Deductor, Phase::Deduction).unwrap();
//! assert_eq!(rule.operation, Operation::Verify);
//!
//! assert!(gatekeeper.authorize("verify", Role::Abductor, Phase::Deduction).is_err());
//! ```

#![warn(missing_docs)]

mod config;
mod dispatch;
mod error;
pub mod preconditions;

pub use config::GatekeeperConfig;
pub use dispatch::{Gatekeeper, Operation, OperationRule, DISPATCH_TABLE};
pub use error::GatekeeperError;
pub use preconditions::CheckVerdict;
