//! Session recovery.
//!
//! On startup the stored checkpoint of a machine kind is inspected and the
//! caller is told whether there is a session worth resuming. The caller
//! then either restores it into a machine or discards it.

pub mod error;

pub use error::RecoveryError;

use crate::checkpoint::{slot, Checkpoint, CheckpointError, CheckpointStore};
use crate::core::State;
use crate::machine::{GuardedStateMachine, MachineDefinition, MachineSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{info, warn};

/// Minimum step a checkpoint needs before it is offered for resume.
pub const DEFAULT_MIN_STEP: u32 = 1;

/// When a stored session counts as worth resuming.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePolicy {
    pub min_step: u32,
}

impl ResumePolicy {
    pub fn new(min_step: u32) -> Self {
        Self { min_step }
    }
}

impl Default for ResumePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_STEP)
    }
}

/// Why a session is or is not resumable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResumeVerdict {
    Resumable,
    NoCheckpoint,
    /// The store could not be read; the record, if any, is kept.
    Unreadable,
    /// The record was unusable and has been deleted.
    Corrupt,
    /// The stored session already reached a terminal state.
    Finished,
    /// The stored session has not passed the policy's minimum step.
    TooEarly,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeDecision {
    pub resumable: bool,
    pub verdict: ResumeVerdict,
    pub step: u32,
    pub saved_at: Option<DateTime<Utc>>,
    pub state: Option<String>,
}

impl ResumeDecision {
    fn without_checkpoint(verdict: ResumeVerdict) -> Self {
        Self {
            resumable: false,
            verdict,
            step: 0,
            saved_at: None,
            state: None,
        }
    }

    fn for_checkpoint(checkpoint: &Checkpoint, verdict: ResumeVerdict) -> Self {
        Self {
            resumable: verdict == ResumeVerdict::Resumable,
            verdict,
            step: checkpoint.step,
            saved_at: Some(checkpoint.saved_at),
            state: Some(checkpoint.state.clone()),
        }
    }
}

/// Resume-or-discard operations over the checkpoint slot of machine kind `M`.
pub struct SessionRecovery<M: MachineDefinition> {
    store: Arc<dyn CheckpointStore>,
    policy: ResumePolicy,
    _machine: PhantomData<fn() -> M>,
}

impl<M: MachineDefinition> SessionRecovery<M> {
    pub fn new(store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            store,
            policy: ResumePolicy::default(),
            _machine: PhantomData,
        }
    }

    pub fn with_policy(mut self, policy: ResumePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ResumePolicy {
        self.policy
    }

    /// Decide whether the stored session is worth offering for resume.
    ///
    /// Never fails: a missing or unreadable slot is simply not resumable,
    /// and a corrupt record is deleted before reporting.
    pub fn check_for_resumable_session(&self) -> ResumeDecision {
        let decision = match self.load_valid() {
            Ok(Some((checkpoint, snapshot))) => self.decide(&checkpoint, &snapshot),
            Ok(None) => ResumeDecision::without_checkpoint(ResumeVerdict::NoCheckpoint),
            Err(RecoveryError::Corrupt { .. }) => {
                ResumeDecision::without_checkpoint(ResumeVerdict::Corrupt)
            }
            Err(_) => ResumeDecision::without_checkpoint(ResumeVerdict::Unreadable),
        };

        info!(
            machine = M::KIND,
            resumable = decision.resumable,
            verdict = ?decision.verdict,
            step = decision.step,
            "Checked for resumable session"
        );
        decision
    }

    /// Load the stored snapshot into `machine`, bypassing its table.
    ///
    /// Any valid checkpoint is restored, even one the policy would not
    /// offer. Returns `Ok(None)` and leaves `machine` untouched when the
    /// slot is empty.
    pub fn restore_session(
        &self,
        machine: &mut GuardedStateMachine<M>,
    ) -> Result<Option<ResumeDecision>, RecoveryError> {
        let Some((checkpoint, snapshot)) = self.load_valid()? else {
            return Ok(None);
        };
        let decision = self.decide(&checkpoint, &snapshot);
        machine.restore(snapshot);
        Ok(Some(decision))
    }

    /// Build a new machine from the stored snapshot.
    pub fn restore_fresh(&self) -> Result<Option<GuardedStateMachine<M>>, RecoveryError> {
        let mut machine = GuardedStateMachine::new()?;
        Ok(self
            .restore_session(&mut machine)?
            .map(|_| machine))
    }

    /// Discard the stored session. Clearing an empty slot succeeds.
    pub fn clear_session(&self) -> Result<(), RecoveryError> {
        slot::clear(self.store.as_ref(), M::KIND).map_err(|source| RecoveryError::Store {
            kind: M::KIND,
            source,
        })?;
        info!(machine = M::KIND, "Cleared stored session");
        Ok(())
    }

    fn decide(&self, checkpoint: &Checkpoint, snapshot: &MachineSnapshot<M>) -> ResumeDecision {
        let verdict = if snapshot.state.is_terminal() {
            ResumeVerdict::Finished
        } else if checkpoint.step < self.policy.min_step {
            ResumeVerdict::TooEarly
        } else {
            ResumeVerdict::Resumable
        };
        ResumeDecision::for_checkpoint(checkpoint, verdict)
    }

    fn load_valid(&self) -> Result<Option<(Checkpoint, MachineSnapshot<M>)>, RecoveryError> {
        let checkpoint = match slot::load(self.store.as_ref(), M::KIND) {
            Ok(Some(checkpoint)) => checkpoint,
            Ok(None) => return Ok(None),
            Err(err) if err.is_corrupt() => return Err(self.discard(err)),
            Err(source) => {
                warn!(machine = M::KIND, error = %source, "Could not read checkpoint");
                return Err(RecoveryError::Store {
                    kind: M::KIND,
                    source,
                });
            }
        };

        match checkpoint.rehydrate::<M>() {
            Ok(snapshot) => Ok(Some((checkpoint, snapshot))),
            Err(err) => Err(self.discard(err)),
        }
    }

    fn discard(&self, source: CheckpointError) -> RecoveryError {
        warn!(machine = M::KIND, error = %source, "Discarding corrupt checkpoint");
        if let Err(err) = slot::clear(self.store.as_ref(), M::KIND) {
            warn!(machine = M::KIND, error = %err, "Failed to clear corrupt checkpoint");
        }
        RecoveryError::Corrupt {
            kind: M::KIND,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{MemoryStore, StoreError};
    use crate::machines::{
        JobEvent, JobMachine, StepVerdict, WizardEvent, WizardMachine, WizardState,
    };

    fn save<M: MachineDefinition>(store: &MemoryStore, machine: &GuardedStateMachine<M>) {
        slot::save(store, &Checkpoint::capture(machine, Utc::now()).unwrap()).unwrap();
    }

    fn wizard_at_step_two() -> GuardedStateMachine<WizardMachine> {
        let mut wizard = GuardedStateMachine::<WizardMachine>::new().unwrap();
        wizard.transition(WizardEvent::field("title", "Spring launch"));
        for step in 0..2 {
            wizard.transition(WizardEvent::SetStepValidity {
                step,
                verdict: StepVerdict::valid(),
            });
            assert!(wizard.transition(WizardEvent::Advance).is_accepted());
        }
        wizard.transition(WizardEvent::field("script", "Intro paragraph"));
        assert_eq!(wizard.step(), 2);
        wizard
    }

    struct UnreadableStore;

    impl CheckpointStore for UnreadableStore {
        fn put(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Ok(())
        }

        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Backend("storage disabled".to_string()))
        }

        fn clear(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn resume_wizard_after_reload() {
        let store = Arc::new(MemoryStore::new());
        let before = wizard_at_step_two();
        save(&store, &before);

        // a new session starts with a fresh machine
        let recovery = SessionRecovery::<WizardMachine>::new(store.clone());
        let decision = recovery.check_for_resumable_session();
        assert!(decision.resumable);
        assert_eq!(decision.verdict, ResumeVerdict::Resumable);
        assert_eq!(decision.step, 2);
        assert_eq!(decision.state.as_deref(), Some("draft"));
        assert!(decision.saved_at.is_some());

        let mut after = GuardedStateMachine::<WizardMachine>::new().unwrap();
        recovery.restore_session(&mut after).unwrap().unwrap();
        assert_eq!(after.snapshot(), before.snapshot());
        assert_eq!(after.payload().form["script"], "Intro paragraph");
        assert!(after.history().is_empty());
    }

    #[test]
    fn discard_clears_the_slot() {
        let store = Arc::new(MemoryStore::new());
        save(&store, &wizard_at_step_two());

        let recovery = SessionRecovery::<WizardMachine>::new(store.clone());
        recovery.clear_session().unwrap();

        let decision = recovery.check_for_resumable_session();
        assert!(!decision.resumable);
        assert_eq!(decision.verdict, ResumeVerdict::NoCheckpoint);
        assert!(store.is_empty());
    }

    #[test]
    fn clear_session_is_idempotent() {
        let recovery = SessionRecovery::<JobMachine>::new(Arc::new(MemoryStore::new()));
        recovery.clear_session().unwrap();
        recovery.clear_session().unwrap();
    }

    #[test]
    fn step_below_policy_is_not_offered() {
        let store = Arc::new(MemoryStore::new());
        let wizard = GuardedStateMachine::<WizardMachine>::new().unwrap();
        save(&store, &wizard);

        let recovery = SessionRecovery::<WizardMachine>::new(store.clone());
        let decision = recovery.check_for_resumable_session();
        assert!(!decision.resumable);
        assert_eq!(decision.verdict, ResumeVerdict::TooEarly);
        assert_eq!(store.len(), 1);

        let lenient = SessionRecovery::<WizardMachine>::new(store).with_policy(ResumePolicy::new(0));
        assert!(lenient.check_for_resumable_session().resumable);
    }

    #[test]
    fn terminal_session_is_not_offered() {
        let store = Arc::new(MemoryStore::new());
        let mut job = GuardedStateMachine::<JobMachine>::new().unwrap();
        job.transition(JobEvent::start("job-1"));
        job.transition(JobEvent::Complete { message: None });
        save(&store, &job);

        let decision = SessionRecovery::<JobMachine>::new(store).check_for_resumable_session();
        assert!(!decision.resumable);
        assert_eq!(decision.verdict, ResumeVerdict::Finished);
        assert_eq!(decision.step, 100);
    }

    #[test]
    fn corrupt_record_is_cleared() {
        let store = Arc::new(MemoryStore::new());
        store.put(&slot::key_for("wizard"), "{\"version\":1").unwrap();

        let recovery = SessionRecovery::<WizardMachine>::new(store.clone());
        let decision = recovery.check_for_resumable_session();
        assert_eq!(decision.verdict, ResumeVerdict::Corrupt);
        assert!(!decision.resumable);
        assert!(store.is_empty());
    }

    #[test]
    fn mismatched_kind_is_cleared_on_restore() {
        let store = Arc::new(MemoryStore::new());
        let job = GuardedStateMachine::<JobMachine>::new().unwrap();
        let mut checkpoint = Checkpoint::capture(&job, Utc::now()).unwrap();
        checkpoint.machine_kind = "wizard".to_string();
        slot::save(store.as_ref(), &checkpoint).unwrap();

        let mut wizard = GuardedStateMachine::<WizardMachine>::new().unwrap();
        let err = SessionRecovery::<WizardMachine>::new(store.clone())
            .restore_session(&mut wizard)
            .unwrap_err();

        assert!(matches!(err, RecoveryError::Corrupt { kind: "wizard", .. }));
        assert_eq!(wizard.state(), &WizardState::Draft);
        assert!(store.is_empty());
    }

    #[test]
    fn unreadable_store_is_not_resumable() {
        let recovery = SessionRecovery::<JobMachine>::new(Arc::new(UnreadableStore));

        let decision = recovery.check_for_resumable_session();
        assert_eq!(decision.verdict, ResumeVerdict::Unreadable);

        let mut job = GuardedStateMachine::<JobMachine>::new().unwrap();
        assert!(matches!(
            recovery.restore_session(&mut job),
            Err(RecoveryError::Store { .. })
        ));
    }

    #[test]
    fn restore_from_empty_slot_is_none() {
        let recovery = SessionRecovery::<JobMachine>::new(Arc::new(MemoryStore::new()));
        assert!(recovery.restore_fresh().unwrap().is_none());
    }

    #[test]
    fn restore_fresh_builds_equal_machine() {
        let store = Arc::new(MemoryStore::new());
        let before = wizard_at_step_two();
        save(&store, &before);

        let restored = SessionRecovery::<WizardMachine>::new(store)
            .restore_fresh()
            .unwrap()
            .unwrap();
        assert_eq!(restored.snapshot(), before.snapshot());
        assert_eq!(restored.step(), before.step());
    }
}
