//! Durable checkpoints of machine snapshots.
//!
//! A checkpoint is the serialized `(state, payload, step)` of one machine
//! plus the time it was taken. Each machine kind owns exactly one live
//! checkpoint slot: saving overwrites, it never appends.
//!
//! Persisted shape:
//!
//! ```json
//! {
//!   "version": 1,
//!   "machineKind": "wizard",
//!   "state": "draft",
//!   "payload": { "step": 2, "stepCount": 5, "steps": [], "form": {} },
//!   "step": 2,
//!   "savedAt": "2024-05-01T10:00:00Z"
//! }
//! ```

use crate::core::State;
use crate::machine::{GuardedStateMachine, MachineDefinition, MachineSnapshot, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stillwater::validation::Validation;

pub mod error;
pub mod slot;
pub mod store;
pub mod validate;

pub use error::{CheckpointError, StoreError};
pub use store::{CheckpointStore, FileStore, MemoryStore};
pub use validate::{validate_checkpoint, CheckpointViolation};

/// Version identifier for checkpoint format
pub const CHECKPOINT_VERSION: u32 = 1;

fn default_version() -> u32 {
    CHECKPOINT_VERSION
}

/// Serializable snapshot of one machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Checkpoint format version
    #[serde(default = "default_version")]
    pub version: u32,

    pub machine_kind: String,

    /// Name of the active state
    pub state: String,

    pub payload: Value,

    /// Progress indicator derived from the snapshot
    pub step: u32,

    pub saved_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Capture the current snapshot of `machine`.
    pub fn capture<M: MachineDefinition>(
        machine: &GuardedStateMachine<M>,
        saved_at: DateTime<Utc>,
    ) -> Result<Self, CheckpointError> {
        Self::from_snapshot::<M>(&machine.snapshot(), saved_at)
    }

    pub fn from_snapshot<M: MachineDefinition>(
        snapshot: &MachineSnapshot<M>,
        saved_at: DateTime<Utc>,
    ) -> Result<Self, CheckpointError> {
        let payload = serde_json::to_value(&snapshot.payload)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))?;

        Ok(Self {
            version: CHECKPOINT_VERSION,
            machine_kind: M::KIND.to_string(),
            state: snapshot.state.name().to_string(),
            payload,
            step: M::step(&snapshot.state, &snapshot.payload),
            saved_at,
        })
    }

    /// Turn the record back into a snapshot of machine kind `M`.
    ///
    /// Every violation found is reported at once; a record that fails is
    /// never partially applied.
    pub fn rehydrate<M: MachineDefinition>(&self) -> Result<MachineSnapshot<M>, CheckpointError> {
        if let Validation::Failure(errors) = validate_checkpoint::<M>(self) {
            return Err(CheckpointError::Invalid {
                kind: self.machine_kind.clone(),
                violations: errors.iter().cloned().collect(),
            });
        }

        let deserialize = |e: serde_json::Error| CheckpointError::DeserializationFailed(e.to_string());
        let state = serde_json::from_value(Value::String(self.state.clone())).map_err(deserialize)?;
        let payload = serde_json::from_value(self.payload.clone()).map_err(deserialize)?;
        Ok(Snapshot { state, payload })
    }

    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string(self).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        serde_json::from_str(json).map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))
    }
}
