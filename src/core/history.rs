//! Accepted-transition history.
//!
//! History lives only in memory. Checkpoints persist the latest snapshot,
//! never the path that led to it, so a restored machine starts with an
//! empty history.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Default number of transitions kept before the oldest are dropped.
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

/// Record of a single accepted transition.
///
/// # Example
///
/// ```rust
/// use waymark::core::{State, StateTransition};
/// use serde::{Deserialize, Serialize};
/// use chrono::Utc;
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Light {
///     Off,
///     On,
/// }
///
/// impl State for Light {
///     fn name(&self) -> &str {
///         match self {
///             Self::Off => "off",
///             Self::On => "on",
///         }
///     }
/// }
///
/// let transition = StateTransition {
///     from: Light::Off,
///     to: Light::On,
///     event: "toggle".to_string(),
///     timestamp: Utc::now(),
/// };
/// assert_eq!(transition.event, "toggle");
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<S: State> {
    /// The state being transitioned from
    pub from: S,
    /// The state being transitioned to
    pub to: S,
    /// Name of the event that caused the transition
    pub event: String,
    /// When the transition was applied
    pub timestamp: DateTime<Utc>,
}

/// Bounded, ordered history of accepted transitions.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateHistory<S: State> {
    transitions: VecDeque<StateTransition<S>>,
    limit: usize,
}

impl<S: State> Default for StateHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StateHistory<S> {
    /// Create a new empty history with the default limit.
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Create a new empty history that keeps at most `limit` transitions.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            transitions: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Append a transition, dropping the oldest once the limit is reached.
    pub fn record(&mut self, transition: StateTransition<S>) {
        if self.transitions.len() == self.limit {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    /// Get the path of states traversed.
    ///
    /// Returns the `from` state of the oldest kept transition followed by
    /// the `to` state of every transition.
    pub fn get_path(&self) -> Vec<&S> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(first) = self.transitions.front() {
            path.push(&first.from);
        }
        path.extend(self.transitions.iter().map(|t| &t.to));
        path
    }

    /// Time between the first and last kept transition.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.transitions.front()?, self.transitions.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    /// Iterate over kept transitions, oldest first.
    pub fn transitions(&self) -> impl Iterator<Item = &StateTransition<S>> {
        self.transitions.iter()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn last(&self) -> Option<&StateTransition<S>> {
        self.transitions.back()
    }
}
