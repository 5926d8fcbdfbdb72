//! Session recovery errors.

use crate::builder::BuildError;
use crate::checkpoint::CheckpointError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecoveryError {
    /// The stored record was unusable and has been deleted.
    #[error("Discarded corrupt checkpoint for '{kind}': {source}")]
    Corrupt {
        kind: &'static str,
        #[source]
        source: CheckpointError,
    },

    /// The store could not be read or written.
    #[error("Checkpoint store unavailable for '{kind}': {source}")]
    Store {
        kind: &'static str,
        #[source]
        source: CheckpointError,
    },

    #[error(transparent)]
    Build(#[from] BuildError),
}
