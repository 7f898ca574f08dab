//! Error types for Interaction Flux

use thiserror::Error;

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Lookup failure: {0}")]
    LookupFailure(String),

    #[error("Sequence error: {0}")]
    SequenceError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ComputeError {
    pub(crate) fn unknown_user(user_id: &str) -> Self {
        ComputeError::LookupFailure(format!("Invalid user id: {user_id}"))
    }
}
