//! Core state machine vocabulary.
//!
//! This module contains the pure pieces every machine kind is built from:
//! - State and Event traits
//! - Guard predicates for transition control
//! - Bounded in-memory history of accepted transitions
//!
//! Nothing in here performs I/O.

mod guard;
mod history;
mod state;

pub use guard::Guard;
pub use history::{StateHistory, StateTransition, DEFAULT_HISTORY_LIMIT};
pub use state::{Event, State};
