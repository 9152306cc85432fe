//! Assay Janitor
//!
//! Maintenance operations for the holon graph.
//!
//! # Overview
//!
//! The Janitor is responsible for:
//! - **Score refresh**: recomputing every holon's cached reliability, once per holon
//! - **Freshness reporting**: finding expired, un-waived evidence and waivers about to lapse
//! - **Waivers**: time-boxed acceptance of stale evidence
//! - **Deprecation**: moving a holon down one layer after its evidence decayed
//!
//! Nothing here runs on a timer. Evidence staleness is discovered when a
//! report or score is computed, against the `now` the caller passes in.
//!
//! # Usage
//!
//! ```no_run
//! use assay_janitor::{Janitor, JanitorConfig};
//! use assay_store::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::new(".assay/assay.db")?;
//! let janitor = Janitor::new(JanitorConfig { expiry_warning_days: 14, ..Default::default() });
//!
//! let report = janitor.freshness_report(&store, 1_700_000_000)?;
//! for holon in &report.stale {
//!     println!("{}: {} expired item(s)", holon.title, holon.evidence.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [janitor]
//! expiry_warning_days = 30
//! log_score_changes = true
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod janitor;
mod metrics;

pub use config::JanitorConfig;
pub use error::JanitorError;
pub use janitor::{
    FreshnessReport, Janitor, ScoreChange, StaleEvidence, StaleHolon, SweepReport, WaiverStatus,
};
pub use metrics::JanitorMetrics;
