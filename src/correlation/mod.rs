//! Correlation ids for asynchronous validation attempts.
//!
//! Validation calls an external collaborator with unbounded latency. Each
//! attempt is tagged with a fresh id; a result is only applied when its id
//! is still the latest one minted for that slot, so a slow superseded
//! attempt can never overwrite the outcome of a newer one. Attempts are not
//! cancelled, only superseded.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

/// Slot used for the onboarding preflight check.
pub const PREFLIGHT_SLOT: &str = "preflight";

/// Slot name for the validation of one wizard step.
pub fn wizard_step_slot(step: usize) -> String {
    format!("wizard-step-{step}")
}

/// Opaque token binding a validation request to its eventual result.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Latest outstanding attempt per validation slot.
#[derive(Debug, Default)]
pub struct CorrelationTracker {
    latest: HashMap<String, CorrelationId>,
}

impl CorrelationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new attempt for `slot`, superseding any earlier one.
    pub fn begin(&mut self, slot: impl Into<String>) -> CorrelationId {
        let id = CorrelationId::new();
        let slot = slot.into();
        debug!(slot = %slot, correlation_id = %id, "Began validation attempt");
        self.latest.insert(slot, id.clone());
        id
    }

    pub fn current(&self, slot: &str) -> Option<&CorrelationId> {
        self.latest.get(slot)
    }

    pub fn is_current(&self, slot: &str, id: &CorrelationId) -> bool {
        self.current(slot) == Some(id)
    }

    /// Hand back `result` only if `id` is the latest attempt for `slot`.
    ///
    /// Stale results are dropped silently: `None` is returned and nothing
    /// else happens.
    pub fn resolve<R>(&self, slot: &str, id: &CorrelationId, result: R) -> Option<R> {
        if self.is_current(slot, id) {
            Some(result)
        } else {
            debug!(slot, correlation_id = %id, "Dropped stale validation result");
            None
        }
    }

    /// Stop tracking `slot`; every outstanding result for it becomes stale.
    pub fn forget(&mut self, slot: &str) -> Option<CorrelationId> {
        self.latest.remove(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(CorrelationId::new(), CorrelationId::new());
    }

    #[test]
    fn superseded_attempt_is_dropped() {
        let mut tracker = CorrelationTracker::new();
        let id1 = tracker.begin(PREFLIGHT_SLOT);
        let id2 = tracker.begin(PREFLIGHT_SLOT);

        assert_eq!(tracker.resolve(PREFLIGHT_SLOT, &id1, "result A"), None);
        assert_eq!(
            tracker.resolve(PREFLIGHT_SLOT, &id2, "result B"),
            Some("result B")
        );
    }

    #[test]
    fn slots_are_independent() {
        let mut tracker = CorrelationTracker::new();
        let preflight = tracker.begin(PREFLIGHT_SLOT);
        let step = tracker.begin(wizard_step_slot(2));
        tracker.begin(wizard_step_slot(3));

        assert!(tracker.is_current(PREFLIGHT_SLOT, &preflight));
        assert!(tracker.is_current("wizard-step-2", &step));
        assert!(!tracker.is_current(PREFLIGHT_SLOT, &step));
    }

    #[test]
    fn unknown_slot_resolves_nothing() {
        let tracker = CorrelationTracker::new();
        assert_eq!(tracker.resolve("missing", &CorrelationId::new(), 1), None);
    }

    #[test]
    fn forget_makes_outstanding_results_stale() {
        let mut tracker = CorrelationTracker::new();
        let id = tracker.begin(PREFLIGHT_SLOT);

        assert_eq!(tracker.forget(PREFLIGHT_SLOT), Some(id.clone()));
        assert_eq!(tracker.resolve(PREFLIGHT_SLOT, &id, ()), None);
        assert!(tracker.current(PREFLIGHT_SLOT).is_none());
    }

    #[test]
    fn id_serializes_as_plain_string() {
        let id = CorrelationId::new();
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));

        let parsed: CorrelationId = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, id);
    }
}
