//! Onboarding machine: preflight validation, retries and install actions.

use crate::builder::{BuildError, TransitionTableBuilder};
use crate::core::Event;
use crate::correlation::CorrelationId;
use crate::machine::{MachineDefinition, TransitionTable};
use crate::state_enum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

state_enum! {
    pub enum OnboardingState {
        Idle => "idle",
        Validating => "validating",
        Valid => "valid",
        Invalid => "invalid",
        Installing => "installing",
        Installed => "installed",
        Ready => "ready",
    }
    terminal: [Ready]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pass,
    Warn,
    Fail,
}

/// One named stage of a preflight report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    pub name: String,
    pub status: StageStatus,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

impl StageResult {
    pub fn new(name: impl Into<String>, status: StageStatus, required: bool) -> Self {
        Self {
            name: name.into(),
            status,
            required,
            hints: Vec::new(),
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }
}

/// Structured result returned by the preflight collaborator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PreflightReport {
    pub stages: Vec<StageResult>,
}

impl PreflightReport {
    pub fn new(stages: Vec<StageResult>) -> Self {
        Self { stages }
    }
}

/// Names of required stages whose status is not `pass`, in report order.
pub fn failed_required_stages(report: &PreflightReport) -> Vec<String> {
    report
        .stages
        .iter()
        .filter(|stage| stage.required && stage.status != StageStatus::Pass)
        .map(|stage| stage.name.clone())
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub enum OnboardingEvent {
    BeginValidation {
        correlation_id: CorrelationId,
    },
    Succeed {
        report: PreflightReport,
        correlation_id: CorrelationId,
    },
    Fail {
        report: PreflightReport,
        correlation_id: CorrelationId,
    },
    MarkReady,
    BeginInstall {
        item: String,
    },
    InstallOk {
        item: String,
    },
    InstallFail {
        item: String,
        error: String,
    },
    Reset,
}

impl Event for OnboardingEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::BeginValidation { .. } => "beginValidation",
            Self::Succeed { .. } => "succeed",
            Self::Fail { .. } => "fail",
            Self::MarkReady => "markReady",
            Self::BeginInstall { .. } => "beginInstall",
            Self::InstallOk { .. } => "installOk",
            Self::InstallFail { .. } => "installFail",
            Self::Reset => "reset",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingPayload {
    pub report: Option<PreflightReport>,
    /// Id of the validation attempt whose result is awaited or applied.
    pub correlation_id: Option<CorrelationId>,
    pub installing: Option<String>,
    /// Install outcome per item: `true` installed, `false` failed.
    pub installed: BTreeMap<String, bool>,
    pub last_install_error: Option<String>,
}

impl OnboardingPayload {
    /// Required stages of the latest report that did not pass.
    pub fn failed_stages(&self) -> Vec<String> {
        self.report
            .as_ref()
            .map(failed_required_stages)
            .unwrap_or_default()
    }
}

pub struct OnboardingMachine;

fn matches_attempt(payload: &OnboardingPayload, event: &OnboardingEvent) -> bool {
    match event {
        OnboardingEvent::Succeed { correlation_id, .. }
        | OnboardingEvent::Fail { correlation_id, .. } => {
            payload.correlation_id.as_ref() == Some(correlation_id)
        }
        _ => false,
    }
}

fn matches_install(payload: &OnboardingPayload, event: &OnboardingEvent) -> bool {
    match event {
        OnboardingEvent::InstallOk { item } | OnboardingEvent::InstallFail { item, .. } => {
            payload.installing.as_ref() == Some(item)
        }
        _ => false,
    }
}

impl MachineDefinition for OnboardingMachine {
    const KIND: &'static str = "onboarding";
    type State = OnboardingState;
    type Event = OnboardingEvent;
    type Payload = OnboardingPayload;

    fn initial_state() -> OnboardingState {
        OnboardingState::Idle
    }

    fn initial_payload() -> OnboardingPayload {
        OnboardingPayload::default()
    }

    fn table() -> Result<TransitionTable<Self>, BuildError> {
        use OnboardingState::*;

        TransitionTableBuilder::new()
            // a retry while validating supersedes the in-flight attempt
            .edges_from(
                [Idle, Validating, Valid, Invalid, Installed],
                "beginValidation",
                Validating,
            )
            .guarded(Validating, "succeed", Valid, matches_attempt)
            .guarded(Validating, "fail", Invalid, matches_attempt)
            .edges_from([Valid, Ready], "markReady", Ready)
            .edges_from([Idle, Invalid, Installing, Installed], "beginInstall", Installing)
            .guarded(Installing, "installOk", Installed, matches_install)
            .guarded(Installing, "installFail", Idle, matches_install)
            .edges_from([Validating, Installing, Ready], "reset", Idle)
            .build()
    }

    fn apply(
        payload: &mut OnboardingPayload,
        _from: &OnboardingState,
        _to: &OnboardingState,
        event: OnboardingEvent,
    ) {
        match event {
            OnboardingEvent::BeginValidation { correlation_id } => {
                payload.correlation_id = Some(correlation_id);
            }
            OnboardingEvent::Succeed { report, .. } | OnboardingEvent::Fail { report, .. } => {
                payload.report = Some(report);
            }
            OnboardingEvent::MarkReady => {}
            OnboardingEvent::BeginInstall { item } => {
                payload.installing = Some(item);
                payload.last_install_error = None;
            }
            OnboardingEvent::InstallOk { item } => {
                payload.installing = None;
                payload.installed.insert(item, true);
            }
            OnboardingEvent::InstallFail { item, error } => {
                payload.installing = None;
                payload.installed.insert(item, false);
                payload.last_install_error = Some(error);
            }
            OnboardingEvent::Reset => *payload = OnboardingPayload::default(),
        }
    }

    fn is_stale(payload: &OnboardingPayload, event: &OnboardingEvent) -> bool {
        match event {
            OnboardingEvent::Succeed { .. } | OnboardingEvent::Fail { .. } => {
                !matches_attempt(payload, event)
            }
            OnboardingEvent::InstallOk { .. } | OnboardingEvent::InstallFail { .. } => {
                !matches_install(payload, event)
            }
            _ => false,
        }
    }

    fn step(state: &OnboardingState, _payload: &OnboardingPayload) -> u32 {
        match state {
            OnboardingState::Idle => 0,
            OnboardingState::Validating | OnboardingState::Installing => 1,
            OnboardingState::Valid | OnboardingState::Invalid | OnboardingState::Installed => 2,
            OnboardingState::Ready => 3,
        }
    }

    fn invariant_violations(state: &OnboardingState, payload: &OnboardingPayload) -> Vec<String> {
        let mut violations = Vec::new();
        if *state == OnboardingState::Validating && payload.correlation_id.is_none() {
            violations.push("validating without a correlation id".to_string());
        }
        if *state == OnboardingState::Installing && payload.installing.is_none() {
            violations.push("installing without an item".to_string());
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{GuardedStateMachine, RejectionReason};

    fn machine() -> GuardedStateMachine<OnboardingMachine> {
        GuardedStateMachine::new().unwrap()
    }

    fn failing_report() -> PreflightReport {
        PreflightReport::new(vec![
            StageResult::new("ffmpeg", StageStatus::Fail, true).with_hint("install ffmpeg"),
            StageResult::new("gpu", StageStatus::Warn, false),
            StageResult::new("disk", StageStatus::Warn, true),
            StageResult::new("network", StageStatus::Pass, true),
        ])
    }

    fn passing_report() -> PreflightReport {
        PreflightReport::new(vec![
            StageResult::new("ffmpeg", StageStatus::Pass, true),
            StageResult::new("gpu", StageStatus::Warn, false),
        ])
    }

    #[test]
    fn failed_required_stages_skips_optional_and_passing() {
        assert_eq!(
            failed_required_stages(&failing_report()),
            vec!["ffmpeg".to_string(), "disk".to_string()]
        );
        assert!(failed_required_stages(&passing_report()).is_empty());
        assert!(failed_required_stages(&PreflightReport::default()).is_empty());
    }

    #[test]
    fn validation_retry_scenario() {
        let mut flow = machine();
        let a1 = CorrelationId::new();

        flow.transition(OnboardingEvent::BeginValidation {
            correlation_id: a1.clone(),
        });
        assert_eq!(flow.state(), &OnboardingState::Validating);

        flow.transition(OnboardingEvent::Fail {
            report: failing_report(),
            correlation_id: a1,
        });
        assert_eq!(flow.state(), &OnboardingState::Invalid);
        assert_eq!(flow.payload().failed_stages(), vec!["ffmpeg", "disk"]);

        let a2 = CorrelationId::new();
        flow.transition(OnboardingEvent::BeginValidation {
            correlation_id: a2.clone(),
        });
        flow.transition(OnboardingEvent::Succeed {
            report: passing_report(),
            correlation_id: a2,
        });
        assert_eq!(flow.state(), &OnboardingState::Valid);
        assert!(flow.payload().failed_stages().is_empty());
        assert_eq!(flow.payload().report, Some(passing_report()));

        assert!(flow.transition(OnboardingEvent::MarkReady).is_accepted());
        assert_eq!(flow.state(), &OnboardingState::Ready);
        assert!(flow.is_terminal());
        assert_eq!(flow.step(), 3);
    }

    #[test]
    fn result_for_superseded_attempt_is_blocked() {
        let mut flow = machine();
        let stale = CorrelationId::new();
        let fresh = CorrelationId::new();

        flow.transition(OnboardingEvent::BeginValidation {
            correlation_id: stale.clone(),
        });
        flow.transition(OnboardingEvent::Fail {
            report: failing_report(),
            correlation_id: stale.clone(),
        });
        flow.transition(OnboardingEvent::BeginValidation {
            correlation_id: fresh,
        });

        let outcome = flow.transition(OnboardingEvent::Succeed {
            report: passing_report(),
            correlation_id: stale,
        });

        assert_eq!(
            outcome.rejection().map(|r| r.reason),
            Some(RejectionReason::Stale)
        );
        assert_eq!(flow.state(), &OnboardingState::Validating);
        assert_eq!(flow.payload().failed_stages(), vec!["ffmpeg", "disk"]);
    }

    #[test]
    fn mark_ready_requires_valid() {
        let mut flow = machine();
        assert!(!flow.transition(OnboardingEvent::MarkReady).is_accepted());

        let id = CorrelationId::new();
        flow.transition(OnboardingEvent::BeginValidation {
            correlation_id: id.clone(),
        });
        flow.transition(OnboardingEvent::Fail {
            report: failing_report(),
            correlation_id: id,
        });
        assert!(!flow.transition(OnboardingEvent::MarkReady).is_accepted());
        assert_eq!(flow.state(), &OnboardingState::Invalid);
    }

    #[test]
    fn install_success_records_flag() {
        let mut flow = machine();

        flow.transition(OnboardingEvent::BeginInstall {
            item: "ffmpeg".to_string(),
        });
        assert_eq!(flow.state(), &OnboardingState::Installing);
        assert_eq!(flow.payload().installing.as_deref(), Some("ffmpeg"));

        flow.transition(OnboardingEvent::InstallOk {
            item: "ffmpeg".to_string(),
        });
        assert_eq!(flow.state(), &OnboardingState::Installed);
        assert_eq!(flow.payload().installed.get("ffmpeg"), Some(&true));
        assert!(flow.payload().installing.is_none());

        let revalidate = flow.transition(OnboardingEvent::BeginValidation {
            correlation_id: CorrelationId::new(),
        });
        assert!(revalidate.is_accepted());
    }

    #[test]
    fn install_failure_returns_to_idle() {
        let mut flow = machine();
        flow.transition(OnboardingEvent::BeginInstall {
            item: "ffmpeg".to_string(),
        });

        flow.transition(OnboardingEvent::InstallFail {
            item: "ffmpeg".to_string(),
            error: "permission denied".to_string(),
        });

        assert_eq!(flow.state(), &OnboardingState::Idle);
        assert_eq!(flow.payload().installed.get("ffmpeg"), Some(&false));
        assert_eq!(
            flow.payload().last_install_error.as_deref(),
            Some("permission denied")
        );
    }

    #[test]
    fn install_result_for_other_item_is_blocked() {
        let mut flow = machine();
        flow.transition(OnboardingEvent::BeginInstall {
            item: "ffmpeg".to_string(),
        });

        let outcome = flow.transition(OnboardingEvent::InstallOk {
            item: "python".to_string(),
        });

        assert!(!outcome.is_accepted());
        assert_eq!(flow.state(), &OnboardingState::Installing);
        assert!(flow.payload().installed.is_empty());
    }

    #[test]
    fn cannot_install_while_validating() {
        let mut flow = machine();
        flow.transition(OnboardingEvent::BeginValidation {
            correlation_id: CorrelationId::new(),
        });

        let outcome = flow.transition(OnboardingEvent::BeginInstall {
            item: "ffmpeg".to_string(),
        });

        assert_eq!(
            outcome.rejection().map(|r| r.reason),
            Some(RejectionReason::NoEdge)
        );
    }

    #[test]
    fn retry_while_validating_supersedes_attempt() {
        let mut flow = machine();
        let a1 = CorrelationId::new();
        let a2 = CorrelationId::new();

        flow.transition(OnboardingEvent::BeginValidation {
            correlation_id: a1.clone(),
        });
        let retry = flow.transition(OnboardingEvent::BeginValidation {
            correlation_id: a2.clone(),
        });
        assert!(retry.is_accepted());
        assert_eq!(flow.payload().correlation_id.as_ref(), Some(&a2));

        let late = flow.transition(OnboardingEvent::Fail {
            report: failing_report(),
            correlation_id: a1,
        });
        assert_eq!(late.rejection().map(|r| r.reason), Some(RejectionReason::Stale));

        flow.transition(OnboardingEvent::Succeed {
            report: passing_report(),
            correlation_id: a2,
        });
        assert_eq!(flow.state(), &OnboardingState::Valid);
    }

    #[test]
    fn install_can_be_restarted_or_abandoned() {
        let mut flow = machine();
        flow.transition(OnboardingEvent::BeginInstall {
            item: "ffmpeg".to_string(),
        });

        let restart = flow.transition(OnboardingEvent::BeginInstall {
            item: "python".to_string(),
        });
        assert!(restart.is_accepted());
        assert_eq!(flow.payload().installing.as_deref(), Some("python"));

        let late = flow.transition(OnboardingEvent::InstallOk {
            item: "ffmpeg".to_string(),
        });
        assert_eq!(late.rejection().map(|r| r.reason), Some(RejectionReason::Stale));

        assert!(flow.transition(OnboardingEvent::Reset).is_accepted());
        assert_eq!(flow.state(), &OnboardingState::Idle);
        assert!(flow.payload().installing.is_none());
    }

    #[test]
    fn reset_abandons_validation() {
        let mut flow = machine();
        flow.transition(OnboardingEvent::BeginValidation {
            correlation_id: CorrelationId::new(),
        });

        assert!(flow.transition(OnboardingEvent::Reset).is_accepted());
        assert_eq!(flow.state(), &OnboardingState::Idle);
        assert!(flow.payload().correlation_id.is_none());
    }

    #[test]
    fn failed_stages_are_derived_from_report() {
        let mut payload = OnboardingPayload::default();
        assert!(payload.failed_stages().is_empty());

        payload.report = Some(failing_report());
        assert_eq!(payload.failed_stages(), vec!["ffmpeg", "disk"]);
    }

    #[test]
    fn report_round_trips_through_json() {
        let json = serde_json::to_value(failing_report()).unwrap();
        assert_eq!(json["stages"][0]["status"], "fail");
        assert_eq!(json["stages"][0]["hints"][0], "install ffmpeg");

        let parsed: PreflightReport = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, failing_report());
    }
}
