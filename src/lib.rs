//! Waymark: guarded state machines with durable checkpoints
//!
//! Long-running, multi-step workflows (a background job, an onboarding
//! preflight, a content wizard) are modeled as explicit state machines whose
//! transition tables reject anything they do not declare. Every accepted
//! change is checkpointed to a key-value store so an interrupted session can
//! be resumed later.
//!
//! # Core Concepts
//!
//! - **Machine kinds**: a [`MachineDefinition`] declares states, events,
//!   payload and a guarded [`TransitionTable`]
//! - **Checkpoints**: one JSON snapshot slot per machine kind in a
//!   [`CheckpointStore`]
//! - **Autosave**: saves after every accepted change plus on an interval
//! - **Recovery**: decide on startup whether a stored session is worth
//!   resuming, then restore or discard it
//! - **Correlation**: drop validation results that were superseded by a
//!   newer attempt
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use waymark::checkpoint::MemoryStore;
//! use waymark::machines::{JobEvent, JobMachine, JobState};
//! use waymark::Workflow;
//!
//! let store = Arc::new(MemoryStore::new());
//! let workflow = Workflow::<JobMachine>::new(store.clone()).unwrap();
//!
//! assert!(workflow.dispatch(JobEvent::start("render-42")).is_accepted());
//! assert!(!workflow.dispatch(JobEvent::Reset).is_accepted());
//! workflow.dispatch(JobEvent::progress(60.0));
//!
//! // a later session picks up where this one stopped
//! let resumed = Workflow::<JobMachine>::new(store).unwrap();
//! assert!(resumed.check_for_resumable_session().resumable);
//! resumed.resume().unwrap();
//! assert_eq!(resumed.inspect(|job| job.state().clone()), JobState::Running);
//! ```

pub mod autosave;
pub mod builder;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod correlation;
pub mod machine;
pub mod machines;
pub mod recovery;
pub mod workflow;

// Re-export commonly used types
pub use autosave::{AutosaveTask, Autosaver};
pub use builder::{BuildError, TransitionTableBuilder};
pub use checkpoint::{Checkpoint, CheckpointError, CheckpointStore, FileStore, MemoryStore};
pub use config::{ConfigError, EngineConfig};
pub use crate::core::{Event, Guard, State, StateHistory, StateTransition};
pub use correlation::{CorrelationId, CorrelationTracker};
pub use machine::{GuardedStateMachine, MachineDefinition, TransitionOutcome, TransitionTable};
pub use recovery::{RecoveryError, ResumeDecision, ResumePolicy, SessionRecovery};
pub use workflow::Workflow;
