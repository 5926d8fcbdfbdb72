//! Timer task driving interval saves.

use crate::autosave::Autosaver;
use crate::machine::{GuardedStateMachine, MachineDefinition};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// A machine shared between its owner and the autosave timer.
pub type SharedMachine<M> = Arc<Mutex<GuardedStateMachine<M>>>;

/// Scoped interval-save task.
///
/// The timer starts on construction and stops on [`stop`](Self::stop) or
/// when the handle is dropped, so a torn-down workflow never writes into
/// its slot again. Must be created inside a tokio runtime.
#[derive(Debug)]
pub struct AutosaveTask {
    handle: Option<JoinHandle<()>>,
}

impl AutosaveTask {
    pub fn spawn<M: MachineDefinition>(
        machine: SharedMachine<M>,
        autosaver: Arc<Autosaver<M>>,
        interval: Duration,
    ) -> Self {
        let period = interval.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let guard = machine.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                autosaver.tick(&guard);
                drop(guard);
            }
        });

        debug!(machine = M::KIND, interval_ms = whole_millis(period), "Started autosave timer");
        Self {
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Cancel the timer. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Stopped autosave timer");
        }
    }
}

/// Milliseconds in `period`, saturating at `u64::MAX`.
fn whole_millis(period: Duration) -> u64 {
    u64::try_from(period.as_millis()).unwrap_or(u64::MAX)
}

impl Drop for AutosaveTask {
    fn drop(&mut self) {
        self.stop();
    }
}
