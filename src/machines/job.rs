//! Single-job lifecycle machine.
//!
//! One job at a time per instance: `start` is rejected while a job is
//! running, there is no queue.

use crate::builder::{BuildError, TransitionTableBuilder};
use crate::core::Event;
use crate::machine::{MachineDefinition, TransitionTable};
use crate::state_enum;
use serde::{Deserialize, Serialize};

state_enum! {
    /// Lifecycle of a single job.
    pub enum JobState {
        Idle => "idle",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
    terminal: [Completed, Failed]
    error: [Failed]
}

#[derive(Clone, Debug, PartialEq)]
pub enum JobEvent {
    Start { job_id: String },
    /// Progress in percent. Values outside `[0, 100]` are clamped.
    UpdateProgress { progress: f64 },
    Complete { message: Option<String> },
    Fail { message: String },
    Reset,
}

impl JobEvent {
    pub fn start(job_id: impl Into<String>) -> Self {
        Self::Start {
            job_id: job_id.into(),
        }
    }

    pub fn progress(progress: f64) -> Self {
        Self::UpdateProgress { progress }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail {
            message: message.into(),
        }
    }
}

impl Event for JobEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::UpdateProgress { .. } => "updateProgress",
            Self::Complete { .. } => "complete",
            Self::Fail { .. } => "fail",
            Self::Reset => "reset",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    pub job_id: Option<String>,
    /// Percent complete, always within `[0, 100]`.
    pub progress: f64,
    pub message: Option<String>,
}

pub struct JobMachine;

impl MachineDefinition for JobMachine {
    const KIND: &'static str = "job";
    type State = JobState;
    type Event = JobEvent;
    type Payload = JobPayload;

    fn initial_state() -> JobState {
        JobState::Idle
    }

    fn initial_payload() -> JobPayload {
        JobPayload::default()
    }

    fn table() -> Result<TransitionTable<Self>, BuildError> {
        use JobState::*;

        TransitionTableBuilder::new()
            .edges_from([Idle, Completed, Failed], "start", Running)
            .edge(Running, "updateProgress", Running)
            .edge(Running, "complete", Completed)
            .edge(Running, "fail", Failed)
            .edges_from([Completed, Failed], "reset", Idle)
            .build()
    }

    fn apply(payload: &mut JobPayload, _from: &JobState, _to: &JobState, event: JobEvent) {
        match event {
            JobEvent::Start { job_id } => {
                *payload = JobPayload {
                    job_id: Some(job_id),
                    progress: 0.0,
                    message: None,
                };
            }
            JobEvent::UpdateProgress { progress } => {
                payload.progress = advance_progress(payload.progress, progress);
            }
            JobEvent::Complete { message } => {
                payload.progress = 100.0;
                payload.message = message;
            }
            JobEvent::Fail { message } => {
                payload.message = Some(message);
            }
            JobEvent::Reset => *payload = JobPayload::default(),
        }
    }

    fn step(_state: &JobState, payload: &JobPayload) -> u32 {
        // progress is clamped to [0, 100] on every write
        payload.progress.floor() as u32
    }

    fn invariant_violations(state: &JobState, payload: &JobPayload) -> Vec<String> {
        let mut violations = Vec::new();
        if !(0.0..=100.0).contains(&payload.progress) {
            violations.push(format!("progress {} outside [0, 100]", payload.progress));
        }
        if *state == JobState::Running && payload.job_id.is_none() {
            violations.push("running job has no job id".to_string());
        }
        violations
    }
}

/// Progress never regresses and never leaves `[0, 100]`.
fn advance_progress(current: f64, reported: f64) -> f64 {
    if !reported.is_finite() {
        return current;
    }
    current.max(reported.clamp(0.0, 100.0))
}
