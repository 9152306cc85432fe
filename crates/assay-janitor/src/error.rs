//! Error types for Janitor operations

use thiserror::Error;

/// Errors that can occur during Janitor operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JanitorError {
    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(String),

    /// Referenced record does not exist
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind
        kind: &'static str,
        /// Missing id
        id: String,
    },

    /// Holon cannot be demoted from its layer
    #[error("Invalid layer transition: {0}")]
    InvalidTransition(String),

    /// Waiver request rejected
    #[error("Invalid waiver: {0}")]
    InvalidWaiver(String),
}
