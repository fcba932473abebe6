//! Error types for the wallboard platform

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WallboardError {
    #[error("agent not found")]
    NotFound,

    #[error("agent code already exists: {0}")]
    DuplicateCode(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("cannot change from {from} to {to}; valid transitions: {}", allowed.join(", "))]
    IllegalTransition {
        from: String,
        to: String,
        allowed: Vec<String>,
    },

    #[error("internal error: {0}")]
    Internal(String),
}
