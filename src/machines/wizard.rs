//! Multi-step creation wizard.
//!
//! The wizard is a `(step, per-step verdicts)` pair rather than a rich
//! enum. Verdicts come from form-level validators and are stored as given.

use crate::builder::{BuildError, TransitionTableBuilder};
use crate::core::Event;
use crate::machine::{MachineDefinition, TransitionTable};
use crate::state_enum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Step count used by [`WizardMachine::initial_payload`].
pub const DEFAULT_STEP_COUNT: usize = 5;

state_enum! {
    pub enum WizardState {
        Draft => "draft",
        Submitted => "submitted",
    }
    terminal: [Submitted]
}

/// Validation verdict for one wizard step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepVerdict {
    pub is_valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl StepVerdict {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid<I, T>(errors: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            is_valid: false,
            errors: errors.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardPayload {
    pub step: usize,
    pub step_count: usize,
    pub steps: Vec<StepVerdict>,
    /// Form data as entered; plain JSON so it survives checkpoints as is.
    pub form: Map<String, Value>,
}

impl WizardPayload {
    /// A fresh draft with `step_count` unvalidated steps (at least one).
    pub fn new(step_count: usize) -> Self {
        let step_count = step_count.max(1);
        Self {
            step: 0,
            step_count,
            steps: vec![StepVerdict::default(); step_count],
            form: Map::new(),
        }
    }

    pub fn current_verdict(&self) -> Option<&StepVerdict> {
        self.steps.get(self.step)
    }

    pub fn is_last_step(&self) -> bool {
        self.step + 1 == self.step_count
    }

    pub fn all_steps_valid(&self) -> bool {
        self.steps.iter().all(|verdict| verdict.is_valid)
    }

    fn can_advance(&self) -> bool {
        !self.is_last_step() && self.current_verdict().is_some_and(|v| v.is_valid)
    }
}

impl Default for WizardPayload {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_COUNT)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum WizardEvent {
    Advance,
    Retreat,
    SetStepValidity { step: usize, verdict: StepVerdict },
    UpdateField { key: String, value: Value },
    Submit,
}

impl WizardEvent {
    pub fn field(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::UpdateField {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Event for WizardEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Advance => "advance",
            Self::Retreat => "retreat",
            Self::SetStepValidity { .. } => "setStepValidity",
            Self::UpdateField { .. } => "updateField",
            Self::Submit => "submit",
        }
    }
}

pub struct WizardMachine;

impl MachineDefinition for WizardMachine {
    const KIND: &'static str = "wizard";
    type State = WizardState;
    type Event = WizardEvent;
    type Payload = WizardPayload;

    fn initial_state() -> WizardState {
        WizardState::Draft
    }

    fn initial_payload() -> WizardPayload {
        WizardPayload::default()
    }

    fn table() -> Result<TransitionTable<Self>, BuildError> {
        use WizardState::*;

        TransitionTableBuilder::new()
            .guarded(Draft, "advance", Draft, |p: &WizardPayload, _| p.can_advance())
            .guarded(Draft, "retreat", Draft, |p: &WizardPayload, _| p.step > 0)
            .guarded(Draft, "setStepValidity", Draft, |p: &WizardPayload, e| {
                matches!(e, WizardEvent::SetStepValidity { step, .. } if *step < p.step_count)
            })
            .edge(Draft, "updateField", Draft)
            .guarded(Draft, "submit", Submitted, |p: &WizardPayload, _| {
                p.is_last_step() && p.all_steps_valid()
            })
            .build()
    }

    fn apply(payload: &mut WizardPayload, _from: &WizardState, _to: &WizardState, event: WizardEvent) {
        match event {
            WizardEvent::Advance => payload.step += 1,
            WizardEvent::Retreat => payload.step = payload.step.saturating_sub(1),
            WizardEvent::SetStepValidity { step, verdict } => {
                if let Some(slot) = payload.steps.get_mut(step) {
                    *slot = verdict;
                }
            }
            WizardEvent::UpdateField { key, value } => {
                payload.form.insert(key, value);
            }
            WizardEvent::Submit => {}
        }
    }

    fn step(_state: &WizardState, payload: &WizardPayload) -> u32 {
        u32::try_from(payload.step).unwrap_or(u32::MAX)
    }

    fn invariant_violations(_state: &WizardState, payload: &WizardPayload) -> Vec<String> {
        let mut violations = Vec::new();
        if payload.steps.len() != payload.step_count {
            violations.push(format!(
                "{} verdicts for {} steps",
                payload.steps.len(),
                payload.step_count
            ));
        }
        if payload.step >= payload.step_count {
            violations.push(format!(
                "step {} out of range for {} steps",
                payload.step, payload.step_count
            ));
        }
        violations
    }
}
