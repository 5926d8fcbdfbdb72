//! Machine kind definitions.

use crate::builder::BuildError;
use crate::core::{Event, State};
use crate::machine::TransitionTable;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Binds together everything that makes up one machine kind.
///
/// The definition is pure: `apply` mutates only the payload it is handed,
/// and it is called only after the table has accepted the event, so it
/// never needs to fail.
pub trait MachineDefinition: Sized + Send + Sync + 'static {
    /// Stable name of the machine kind, used as the checkpoint slot.
    const KIND: &'static str;

    type State: State;
    type Event: Event;
    /// Data carried alongside the state. Must round-trip through JSON.
    type Payload: Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync;

    fn initial_state() -> Self::State;

    fn initial_payload() -> Self::Payload;

    /// The static transition table for this kind.
    fn table() -> Result<TransitionTable<Self>, BuildError>;

    /// Apply the payload delta carried by an accepted event.
    fn apply(payload: &mut Self::Payload, from: &Self::State, to: &Self::State, event: Self::Event);

    /// Progress indicator recorded in checkpoints and consulted by
    /// resume policies.
    fn step(state: &Self::State, payload: &Self::Payload) -> u32;

    /// Whether `event` answers an attempt other than the one the payload
    /// is waiting for. Such events are dropped quietly instead of being
    /// reported as illegal.
    fn is_stale(_payload: &Self::Payload, _event: &Self::Event) -> bool {
        false
    }

    /// Payload invariants a loaded snapshot must satisfy before a machine
    /// is rehydrated from it. Each entry describes one broken invariant.
    ///
    /// Default implementation accepts every payload.
    fn invariant_violations(_state: &Self::State, _payload: &Self::Payload) -> Vec<String> {
        Vec::new()
    }
}
