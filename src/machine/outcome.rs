//! Results of submitting an event to a machine.

use crate::core::State;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an event was not applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectionReason {
    /// The table declares no edge for `(state, event)`.
    NoEdge,
    /// The edge exists but its guard did not hold.
    GuardBlocked,
    /// A result for an attempt that has since been superseded.
    Stale,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoEdge => f.write_str("no edge"),
            Self::GuardBlocked => f.write_str("guard blocked"),
            Self::Stale => f.write_str("stale result"),
        }
    }
}

/// Diagnostic for an illegal transition: the rejected `(state, event)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedTransition {
    pub from: String,
    pub event: String,
    pub reason: RejectionReason,
}

impl fmt::Display for RejectedTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --{}--> rejected ({})", self.from, self.event, self.reason)
    }
}

/// Result of `transition(event)`.
///
/// Illegal transitions are ordinary values, never errors: double clicks and
/// racing callbacks produce them during normal use.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionOutcome<S: State> {
    state: S,
    changed: bool,
    rejection: Option<RejectedTransition>,
}

impl<S: State> TransitionOutcome<S> {
    pub(crate) fn accepted(state: S, changed: bool) -> Self {
        Self {
            state,
            changed,
            rejection: None,
        }
    }

    pub(crate) fn rejected(state: S, rejection: RejectedTransition) -> Self {
        Self {
            state,
            changed: false,
            rejection: Some(rejection),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.rejection.is_none()
    }

    /// The machine's state after the call.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Whether the state or the payload differs from before the call.
    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn rejection(&self) -> Option<&RejectedTransition> {
        self.rejection.as_ref()
    }
}
