//! Build errors for transition tables.

use thiserror::Error;

/// Errors that can occur when building a transition table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("No transitions defined. Add at least one edge")]
    EmptyTable,

    #[error("Duplicate edge for event '{event}' from state '{from}'")]
    DuplicateEdge { from: String, event: &'static str },
}
