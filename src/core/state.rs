//! Core State and Event traits.
//!
//! Every machine kind declares a closed enum of states and a closed enum of
//! events. Both traits are pure: they describe values, they never act.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Trait for state machine states.
///
/// A machine instance holds exactly one value of its state enum at a time,
/// so an undeclared state can never be observed.
///
/// # Example
///
/// ```rust
/// use waymark::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum UploadState {
///     Idle,
///     Uploading,
///     Done,
/// }
///
/// impl State for UploadState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Idle => "idle",
///             Self::Uploading => "uploading",
///             Self::Done => "done",
///         }
///     }
///
///     fn is_terminal(&self) -> bool {
///         matches!(self, Self::Done)
///     }
/// }
///
/// assert!(UploadState::Done.is_terminal());
/// ```
pub trait State: Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync {
    /// Name used in logs, diagnostics and persisted checkpoints.
    fn name(&self) -> &str;

    /// Check if this is a terminal state.
    ///
    /// Terminal states make no further progress without an explicit reset,
    /// so a checkpoint taken in one is never offered for resume.
    ///
    /// Default implementation returns `false`.
    fn is_terminal(&self) -> bool {
        false
    }

    /// Check if this is an error state.
    ///
    /// Default implementation returns `false`.
    fn is_error(&self) -> bool {
        false
    }
}

/// Trait for the closed event vocabulary of a machine kind.
///
/// The name is what transition tables are keyed on; any payload the event
/// carries is handed to the machine definition once the edge is accepted.
pub trait Event: Debug + Send {
    /// Stable event name, e.g. `"start"` or `"updateProgress"`.
    fn name(&self) -> &'static str;
}
