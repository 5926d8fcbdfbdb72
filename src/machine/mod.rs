//! Guarded finite state machines.
//!
//! A machine kind is described by a [`MachineDefinition`]: its states, its
//! closed event vocabulary, its payload and its [`TransitionTable`]. A
//! [`GuardedStateMachine`] instance consults the table on every event and
//! rejects anything the table does not declare, leaving state untouched.

mod definition;
mod guarded;
mod outcome;
mod table;

pub use definition::MachineDefinition;
pub use guarded::{GuardedStateMachine, MachineSnapshot, Snapshot};
pub use outcome::{RejectedTransition, RejectionReason, TransitionOutcome};
pub use table::{TransitionEdge, TransitionTable};
