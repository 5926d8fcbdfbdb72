//! Checkpoint and store error types.

use crate::checkpoint::validate::CheckpointViolation;
use thiserror::Error;

/// Errors raised by a [`CheckpointStore`](crate::checkpoint::CheckpointStore)
/// backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid store key '{0}'")]
    InvalidKey(String),

    /// Backend-specific refusal, e.g. a storage quota.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Errors that can occur during checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Serialization to JSON failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Deserialization from JSON failed
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Checkpoint decoded but does not describe a consistent machine
    #[error("Checkpoint for '{kind}' failed validation with {} violation(s)", .violations.len())]
    Invalid {
        kind: String,
        violations: Vec<CheckpointViolation>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CheckpointError {
    /// Whether the stored record itself is unusable, as opposed to the
    /// store failing to hand it over.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            Self::DeserializationFailed(_) | Self::Invalid { .. }
        )
    }
}
