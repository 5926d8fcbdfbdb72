//! The single live checkpoint slot of each machine kind.

use crate::checkpoint::{Checkpoint, CheckpointError, CheckpointStore};
use tracing::debug;

/// Prefix of every key the engine writes.
pub const KEY_PREFIX: &str = "waymark.checkpoint.";

/// Store key of the slot for machine kind `kind`.
pub fn key_for(kind: &str) -> String {
    format!("{KEY_PREFIX}{kind}")
}

/// Overwrite the slot of `checkpoint.machine_kind`.
pub fn save(store: &dyn CheckpointStore, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
    let key = key_for(&checkpoint.machine_kind);
    store.put(&key, &checkpoint.to_json()?)?;
    debug!(key = %key, step = checkpoint.step, state = %checkpoint.state, "Saved checkpoint");
    Ok(())
}

/// Read the slot for `kind`.
///
/// `Ok(None)` means no checkpoint; undecodable records are
/// `Err(DeserializationFailed)` so callers can tell them apart.
pub fn load(store: &dyn CheckpointStore, kind: &str) -> Result<Option<Checkpoint>, CheckpointError> {
    store
        .get(&key_for(kind))?
        .map(|json| Checkpoint::from_json(&json))
        .transpose()
}

/// Delete the slot for `kind`. Clearing an empty slot succeeds.
pub fn clear(store: &dyn CheckpointStore, kind: &str) -> Result<(), CheckpointError> {
    store.clear(&key_for(kind))?;
    Ok(())
}
