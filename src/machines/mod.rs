//! The three machine kinds shipped with the crate.

pub mod job;
pub mod onboarding;
pub mod wizard;

pub use job::{JobEvent, JobMachine, JobPayload, JobState};
pub use onboarding::{
    failed_required_stages, OnboardingEvent, OnboardingMachine, OnboardingPayload,
    OnboardingState, PreflightReport, StageResult, StageStatus,
};
pub use wizard::{StepVerdict, WizardEvent, WizardMachine, WizardPayload, WizardState};
