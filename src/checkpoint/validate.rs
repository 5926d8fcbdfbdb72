//! Validation of loaded checkpoints before rehydration.
//!
//! Uses Stillwater's `Validation` to report every problem with a record in
//! one pass instead of stopping at the first.

use crate::checkpoint::{Checkpoint, CHECKPOINT_VERSION};
use crate::machine::MachineDefinition;
use serde_json::Value;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// One reason a checkpoint cannot be rehydrated.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CheckpointViolation {
    #[error("Checkpoint belongs to '{found}', expected '{expected}'")]
    KindMismatch { expected: String, found: String },

    #[error("Unsupported checkpoint version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Unknown state '{state}'")]
    UnknownState { state: String },

    #[error("Payload does not match the machine kind: {reason}")]
    MalformedPayload { reason: String },

    #[error("Recorded step {recorded} differs from derived step {derived}")]
    StepMismatch { recorded: u32, derived: u32 },

    #[error("Payload invariant broken: {message}")]
    Invariant { message: String },
}

type Check = Validation<(), NonEmptyVec<CheckpointViolation>>;

fn require(ok: bool, violation: impl FnOnce() -> CheckpointViolation) -> Check {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(violation())
    }
}

/// Check a checkpoint against machine kind `M`, accumulating ALL violations.
pub fn validate_checkpoint<M: MachineDefinition>(
    checkpoint: &Checkpoint,
) -> Validation<(), NonEmptyVec<CheckpointViolation>> {
    let mut checks: Vec<Check> = Vec::new();

    checks.push(require(checkpoint.machine_kind == M::KIND, || {
        CheckpointViolation::KindMismatch {
            expected: M::KIND.to_string(),
            found: checkpoint.machine_kind.clone(),
        }
    }));

    checks.push(require(checkpoint.version == CHECKPOINT_VERSION, || {
        CheckpointViolation::UnsupportedVersion {
            found: checkpoint.version,
            supported: CHECKPOINT_VERSION,
        }
    }));

    let state = serde_json::from_value::<M::State>(Value::String(checkpoint.state.clone()));
    checks.push(require(state.is_ok(), || CheckpointViolation::UnknownState {
        state: checkpoint.state.clone(),
    }));

    let payload = serde_json::from_value::<M::Payload>(checkpoint.payload.clone());
    if let Err(err) = &payload {
        checks.push(Validation::fail(CheckpointViolation::MalformedPayload {
            reason: err.to_string(),
        }));
    }

    if let (Ok(state), Ok(payload)) = (&state, &payload) {
        let derived = M::step(state, payload);
        checks.push(require(derived == checkpoint.step, || {
            CheckpointViolation::StepMismatch {
                recorded: checkpoint.step,
                derived,
            }
        }));

        for message in M::invariant_violations(state, payload) {
            checks.push(Validation::fail(CheckpointViolation::Invariant { message }));
        }
    }

    Validation::all_vec(checks).map(|_| ())
}
