use crate::permission::{GrantToken, RequestCode, StepId};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pending,
    StepDenied,
    AllGranted,
    Aborted,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::AllGranted | Self::Aborted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineAction {
    Deny,
    Retry,
    Complete,
    Abort,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{0} permission was denied")]
    GrantDenied(StepId),
    #[error("no pending request matches result code {code}")]
    NoMatchingPendingRequest { code: RequestCode },
    #[error("{step} needs platform level {required}, running on {actual}")]
    UnsupportedPlatformVersion {
        step: StepId,
        required: u32,
        actual: u32,
    },
    #[error("cannot {action:?} while {from:?}")]
    InvalidTransition { from: Outcome, action: PipelineAction },
    #[error("pipeline has already been started")]
    AlreadyStarted,
    #[error("pipeline has not been started")]
    NotStarted,
}

/// Live state of one pipeline run.
#[derive(Debug)]
pub struct PipelineState {
    pub(crate) run_id: Uuid,
    pub(crate) current_step_index: usize,
    pub(crate) outcome: Outcome,
    pub(crate) awaiting: Option<RequestCode>,
    pub(crate) last_result_payload: Option<GrantToken>,
    pub(crate) skipped: Vec<StepId>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            current_step_index: 0,
            outcome: Outcome::Pending,
            awaiting: None,
            last_result_payload: None,
            skipped: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn awaiting(&self) -> Option<RequestCode> {
        self.awaiting
    }

    pub fn holds_token(&self) -> bool {
        self.last_result_payload.is_some()
    }

    /// Steps passed over because the platform is too old for them.
    pub fn skipped(&self) -> &[StepId] {
        &self.skipped
    }

    pub(crate) fn transition(
        &mut self,
        allowed: &[Outcome],
        to: Outcome,
        action: PipelineAction,
    ) -> Result<(), PipelineError> {
        if allowed.contains(&self.outcome) {
            self.outcome = to;
            Ok(())
        } else {
            Err(PipelineError::InvalidTransition {
                from: self.outcome,
                action,
            })
        }
    }

    pub(crate) fn deny(&mut self) -> Result<(), PipelineError> {
        self.transition(&[Outcome::Pending], Outcome::StepDenied, PipelineAction::Deny)
    }

    pub(crate) fn retry(&mut self) -> Result<(), PipelineError> {
        self.transition(&[Outcome::StepDenied], Outcome::Pending, PipelineAction::Retry)
    }

    pub(crate) fn complete(&mut self) -> Result<(), PipelineError> {
        self.transition(
            &[Outcome::Pending],
            Outcome::AllGranted,
            PipelineAction::Complete,
        )
    }

    pub(crate) fn abort(&mut self) -> Result<(), PipelineError> {
        self.transition(&[Outcome::StepDenied], Outcome::Aborted, PipelineAction::Abort)
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}
