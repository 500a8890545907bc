//! Aggregate results reported back to the UI.

use super::intent::Step;
use crate::error::Failure;
use crate::stats::DashboardStats;
use crate::types::{EntityType, RecordId};

/// Whether an entity type has a mutation in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Submitting,
}

/// Terminal state of one intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeState {
    Success,
    /// The primary step took effect but a later step did not
    PartialSuccess,
    /// The first step failed; nothing changed remotely
    Failed,
}

/// What happened to one step
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    Done,
    Skipped,
    Failed(Failure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub step: Step,
    pub result: StepResult,
}

impl StepReport {
    pub fn done(step: Step) -> Self {
        Self {
            step,
            result: StepResult::Done,
        }
    }

    pub fn skipped(step: Step) -> Self {
        Self {
            step,
            result: StepResult::Skipped,
        }
    }

    pub fn failed(step: Step, failure: Failure) -> Self {
        Self {
            step,
            result: StepResult::Failed(failure),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.result, StepResult::Done)
    }
}

/// Result of a submitted intent
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    pub entity: EntityType,
    pub state: OutcomeState,
    pub steps: Vec<StepReport>,
    /// Human-readable summary for the notification
    pub message: String,
    /// The failure that stopped the intent, if any
    pub failure: Option<Failure>,
    /// Identity of the affected record after the intent (may differ from the
    /// requested one after a role change)
    pub record_id: Option<RecordId>,
    /// Set when the follow-up list refresh failed; the cache keeps its
    /// previous contents
    pub refresh_failure: Option<Failure>,
    /// Dashboard statistics reloaded after the change took effect
    pub stats: Option<DashboardStats>,
}

impl MutationOutcome {
    pub fn is_success(&self) -> bool {
        self.state == OutcomeState::Success
    }

    pub fn is_failed(&self) -> bool {
        self.state == OutcomeState::Failed
    }

    /// Steps that were attempted, in order
    pub fn attempted(&self) -> impl Iterator<Item = Step> + '_ {
        self.steps
            .iter()
            .filter(|s| !matches!(s.result, StepResult::Skipped))
            .map(|s| s.step)
    }

    /// Whether the UI must send the session back through login
    pub fn requires_login(&self) -> bool {
        self.failure
            .iter()
            .chain(self.refresh_failure.iter())
            .any(Failure::requires_login)
    }
}
