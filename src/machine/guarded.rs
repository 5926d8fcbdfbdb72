//! The guarded state machine.

use crate::builder::BuildError;
use crate::core::{Event, State, StateHistory, StateTransition};
use crate::machine::{
    MachineDefinition, RejectedTransition, RejectionReason, TransitionOutcome, TransitionTable,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Observable `(state, payload)` pair of a machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<S, P> {
    pub state: S,
    pub payload: P,
}

/// Snapshot type of a given machine kind.
pub type MachineSnapshot<M> =
    Snapshot<<M as MachineDefinition>::State, <M as MachineDefinition>::Payload>;

/// A machine instance: current state, payload, and the kind's table.
///
/// Every instance owns its payload; nothing is shared by reference across
/// machines.
pub struct GuardedStateMachine<M: MachineDefinition> {
    state: M::State,
    payload: M::Payload,
    table: TransitionTable<M>,
    history: StateHistory<M::State>,
    last_rejection: Option<RejectedTransition>,
}

impl<M: MachineDefinition> GuardedStateMachine<M> {
    /// Create a machine in the kind's initial state and payload.
    pub fn new() -> Result<Self, BuildError> {
        Self::with_payload(M::initial_payload())
    }

    /// Create a machine in the initial state with a caller-supplied payload.
    pub fn with_payload(payload: M::Payload) -> Result<Self, BuildError> {
        Ok(Self {
            state: M::initial_state(),
            payload,
            table: M::table()?,
            history: StateHistory::new(),
            last_rejection: None,
        })
    }

    /// Submit an event.
    ///
    /// When `(state, event)` is declared and its guard holds, the payload
    /// delta is applied and the machine moves to the target state.
    /// Otherwise nothing changes and the rejected pair is reported.
    pub fn transition(&mut self, event: M::Event) -> TransitionOutcome<M::State> {
        let event_name = event.name();
        let target = self
            .table
            .lookup(&self.state, &self.payload, &event)
            .map(|edge| edge.to.clone());

        let target = match target {
            Ok(target) => target,
            Err(RejectionReason::GuardBlocked) if M::is_stale(&self.payload, &event) => {
                return self.reject(event_name, RejectionReason::Stale)
            }
            Err(reason) => return self.reject(event_name, reason),
        };

        let from = self.state.clone();
        let before = self.payload.clone();
        M::apply(&mut self.payload, &from, &target, event);
        let changed = from != target || before != self.payload;

        debug!(
            machine = M::KIND,
            from = from.name(),
            to = target.name(),
            event = event_name,
            changed,
            "Applied transition"
        );

        self.history.record(StateTransition {
            from,
            to: target.clone(),
            event: event_name.to_string(),
            timestamp: Utc::now(),
        });
        self.state = target;
        self.last_rejection = None;

        TransitionOutcome::accepted(self.state.clone(), changed)
    }

    fn reject(
        &mut self,
        event_name: &'static str,
        reason: RejectionReason,
    ) -> TransitionOutcome<M::State> {
        if reason == RejectionReason::Stale {
            debug!(
                machine = M::KIND,
                from = self.state.name(),
                event = event_name,
                "Dropped stale result"
            );
        } else {
            warn!(
                machine = M::KIND,
                from = self.state.name(),
                event = event_name,
                %reason,
                "Rejected illegal transition"
            );
        }

        let rejection = RejectedTransition {
            from: self.state.name().to_string(),
            event: event_name.to_string(),
            reason,
        };
        self.last_rejection = Some(rejection.clone());
        TransitionOutcome::rejected(self.state.clone(), rejection)
    }

    /// Whether `event` would be accepted right now (pure).
    pub fn can(&self, event: &M::Event) -> bool {
        self.table.allows(&self.state, &self.payload, event)
    }

    /// Event names declared from the current state.
    pub fn available_events(&self) -> Vec<&'static str> {
        self.table.events_from(&self.state).collect()
    }

    pub fn state(&self) -> &M::State {
        &self.state
    }

    pub fn payload(&self) -> &M::Payload {
        &self.payload
    }

    pub fn step(&self) -> u32 {
        M::step(&self.state, &self.payload)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn history(&self) -> &StateHistory<M::State> {
        &self.history
    }

    /// The most recent rejection, cleared by the next accepted transition.
    pub fn last_rejection(&self) -> Option<&RejectedTransition> {
        self.last_rejection.as_ref()
    }

    pub fn table(&self) -> &TransitionTable<M> {
        &self.table
    }

    pub fn snapshot(&self) -> MachineSnapshot<M> {
        Snapshot {
            state: self.state.clone(),
            payload: self.payload.clone(),
        }
    }

    /// Load a snapshot directly, bypassing the transition table.
    ///
    /// Restoration is not a sequence of events: the history that produced
    /// the snapshot is gone, so the in-memory history starts over.
    pub fn restore(&mut self, snapshot: MachineSnapshot<M>) {
        info!(
            machine = M::KIND,
            state = snapshot.state.name(),
            step = M::step(&snapshot.state, &snapshot.payload),
            "Restored machine from snapshot"
        );
        self.state = snapshot.state;
        self.payload = snapshot.payload;
        self.history = StateHistory::new();
        self.last_rejection = None;
    }
}
