//! Autosave of machine snapshots.
//!
//! Two cadences feed the same single checkpoint slot:
//! - event-driven: right after every accepted transition that changed the
//!   state or payload
//! - interval-driven: every tick while the machine is not terminal, so
//!   edits that are not modeled as transitions are not lost
//!
//! Persistence is best-effort relative to the in-memory machine. A failed
//! write is reported and retried on the next tick; it never rolls back or
//! blocks a transition.

mod task;

pub use task::{AutosaveTask, SharedMachine};

use crate::checkpoint::{slot, Checkpoint, CheckpointError, CheckpointStore};
use crate::core::State;
use crate::machine::{GuardedStateMachine, MachineDefinition, TransitionOutcome};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

/// Default interval between timer-driven saves.
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Callback invoked with every failed write.
pub type FailureCallback = Box<dyn Fn(&CheckpointError) + Send + Sync>;

/// What caused a save.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveTrigger {
    Transition,
    Interval,
    Manual,
}

impl fmt::Display for SaveTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transition => f.write_str("transition"),
            Self::Interval => f.write_str("interval"),
            Self::Manual => f.write_str("manual"),
        }
    }
}

/// Counters describing an autosaver's activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AutosaveStats {
    pub saves: u64,
    pub failures: u64,
    pub last_saved_at: Option<DateTime<Utc>>,
    /// Set after a failed write, cleared by the next successful one.
    pub retry_pending: bool,
}

/// Writes snapshots of one machine kind into a checkpoint store.
pub struct Autosaver<M: MachineDefinition> {
    store: Arc<dyn CheckpointStore>,
    on_failure: Option<FailureCallback>,
    stats: Mutex<AutosaveStats>,
    _machine: PhantomData<fn() -> M>,
}

impl<M: MachineDefinition> Autosaver<M> {
    pub fn new(store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            store,
            on_failure: None,
            stats: Mutex::new(AutosaveStats::default()),
            _machine: PhantomData,
        }
    }

    /// Report failed writes to `callback` in addition to the log.
    pub fn on_failure<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CheckpointError) + Send + Sync + 'static,
    {
        self.on_failure = Some(Box::new(callback));
        self
    }

    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    pub fn stats(&self) -> AutosaveStats {
        *self.lock_stats()
    }

    /// Event-driven save. Only accepted transitions that changed something
    /// are written.
    pub fn after_transition(
        &self,
        machine: &GuardedStateMachine<M>,
        outcome: &TransitionOutcome<M::State>,
    ) -> Option<Checkpoint> {
        if !(outcome.is_accepted() && outcome.changed()) {
            return None;
        }
        self.persist(machine, SaveTrigger::Transition).ok()
    }

    /// Interval-driven save. Writes unconditionally while the machine is
    /// non-terminal, and once more after a failed write even if terminal.
    pub fn tick(&self, machine: &GuardedStateMachine<M>) -> Option<Checkpoint> {
        if machine.state().is_terminal() && !self.lock_stats().retry_pending {
            return None;
        }
        self.persist(machine, SaveTrigger::Interval).ok()
    }

    /// Save immediately, returning the failure instead of only reporting it.
    pub fn save_now(&self, machine: &GuardedStateMachine<M>) -> Result<Checkpoint, CheckpointError> {
        self.persist(machine, SaveTrigger::Manual)
    }

    fn persist(
        &self,
        machine: &GuardedStateMachine<M>,
        trigger: SaveTrigger,
    ) -> Result<Checkpoint, CheckpointError> {
        let mut stats = self.lock_stats();
        let saved_at = next_timestamp(stats.last_saved_at, Utc::now());

        let result = Checkpoint::capture(machine, saved_at)
            .and_then(|checkpoint| slot::save(self.store.as_ref(), &checkpoint).map(|()| checkpoint));

        match &result {
            Ok(_) => {
                stats.saves += 1;
                stats.last_saved_at = Some(saved_at);
                stats.retry_pending = false;
                debug!(machine = M::KIND, %trigger, %saved_at, "Autosaved checkpoint");
            }
            Err(err) => {
                stats.failures += 1;
                stats.retry_pending = true;
                drop(stats);
                warn!(machine = M::KIND, %trigger, error = %err, "Autosave failed; will retry on next tick");
                if let Some(callback) = &self.on_failure {
                    callback(err);
                }
            }
        }

        result
    }

    fn lock_stats(&self) -> MutexGuard<'_, AutosaveStats> {
        self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Strictly increasing save timestamps, even if the wall clock steps back.
fn next_timestamp(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match last {
        Some(last) if now <= last => last + ChronoDuration::milliseconds(1),
        _ => now,
    }
}
