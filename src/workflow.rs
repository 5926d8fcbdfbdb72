//! A machine wired to its checkpoint store.
//!
//! `Workflow` is constructed explicitly with the store it saves into, so
//! separate workflows (or tests) never share hidden state. Every accepted
//! change is saved; the optional timer covers edits between transitions.

use crate::autosave::{AutosaveStats, AutosaveTask, Autosaver, SharedMachine};
use crate::builder::BuildError;
use crate::checkpoint::{Checkpoint, CheckpointError, CheckpointStore};
use crate::config::EngineConfig;
use crate::machine::{GuardedStateMachine, MachineDefinition, MachineSnapshot, TransitionOutcome};
use crate::recovery::{RecoveryError, ResumeDecision, ResumePolicy, SessionRecovery};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::info;

pub struct Workflow<M: MachineDefinition> {
    machine: SharedMachine<M>,
    autosaver: Arc<Autosaver<M>>,
    policy: ResumePolicy,
    task: Option<AutosaveTask>,
}

impl<M: MachineDefinition> Workflow<M> {
    /// A workflow over a fresh machine saving into `store`.
    pub fn new(store: Arc<dyn CheckpointStore>) -> Result<Self, BuildError> {
        Ok(Self::with_autosaver(GuardedStateMachine::new()?, Autosaver::new(store)))
    }

    pub fn with_autosaver(machine: GuardedStateMachine<M>, autosaver: Autosaver<M>) -> Self {
        Self {
            machine: Arc::new(Mutex::new(machine)),
            autosaver: Arc::new(autosaver),
            policy: ResumePolicy::default(),
            task: None,
        }
    }

    /// Use the resume policy configured for this machine kind.
    pub fn configured(mut self, config: &EngineConfig) -> Self {
        self.policy = config.resume_policy(M::KIND);
        self
    }

    pub fn with_resume_policy(mut self, policy: ResumePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Submit an event and save the result if it changed anything.
    ///
    /// The outcome reflects the machine only; a failed save is reported
    /// through the autosaver and retried later.
    pub fn dispatch(&self, event: M::Event) -> TransitionOutcome<M::State> {
        let mut machine = self.lock();
        let outcome = machine.transition(event);
        self.autosaver.after_transition(&machine, &outcome);
        outcome
    }

    /// Read the machine under the lock.
    pub fn inspect<R>(&self, f: impl FnOnce(&GuardedStateMachine<M>) -> R) -> R {
        f(&*self.lock())
    }

    pub fn snapshot(&self) -> MachineSnapshot<M> {
        self.lock().snapshot()
    }

    pub fn save_now(&self) -> Result<Checkpoint, CheckpointError> {
        self.autosaver.save_now(&self.lock())
    }

    pub fn autosave_stats(&self) -> AutosaveStats {
        self.autosaver.stats()
    }

    /// Start the interval timer, replacing any running one. Requires a
    /// tokio runtime.
    pub fn start_autosave(&mut self, interval: Duration) {
        self.stop_autosave();
        self.task = Some(AutosaveTask::spawn(
            self.machine.clone(),
            self.autosaver.clone(),
            interval,
        ));
    }

    pub fn is_autosaving(&self) -> bool {
        self.task.as_ref().is_some_and(AutosaveTask::is_running)
    }

    pub fn stop_autosave(&mut self) {
        if let Some(mut task) = self.task.take() {
            task.stop();
        }
    }

    /// Stop the timer. Any state already saved stays in the store.
    pub fn teardown(&mut self) {
        self.stop_autosave();
        info!(machine = M::KIND, "Workflow torn down");
    }

    /// Recovery operations bound to this workflow's store and policy.
    pub fn recovery(&self) -> SessionRecovery<M> {
        SessionRecovery::new(self.autosaver.store().clone()).with_policy(self.policy)
    }

    pub fn check_for_resumable_session(&self) -> ResumeDecision {
        self.recovery().check_for_resumable_session()
    }

    /// Load the stored session into this workflow's machine.
    pub fn resume(&self) -> Result<Option<ResumeDecision>, RecoveryError> {
        self.recovery().restore_session(&mut self.lock())
    }

    /// Drop the stored session without touching the machine.
    pub fn discard(&self) -> Result<(), RecoveryError> {
        self.recovery().clear_session()
    }

    fn lock(&self) -> MutexGuard<'_, GuardedStateMachine<M>> {
        self.machine.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
