//! Sequential authorization pipeline.
//!
//! Walks an ordered list of [`PermissionStep`]s. Each step that is not
//! already granted issues exactly one external request and suspends the run
//! until the matching [`GrantResult`] is fed back through
//! [`AuthorizationPipeline::handle_result`]. A denial parks the run in
//! [`Outcome::StepDenied`] until the owner answers the prompt with
//! [`AuthorizationPipeline::retry`] or [`AuthorizationPipeline::abort`].
//!
//! There is no timeout: a request the host never answers leaves the run
//! waiting forever.

pub mod state;

use crate::permission::{GrantResult, GrantToken, PermissionStep, RequestCode, StepId, StepResolution};
use serde::Serialize;
use tracing::{debug, info, warn};

pub use state::{Outcome, PipelineAction, PipelineError, PipelineState};

pub type CompleteCallback = Box<dyn FnOnce(Option<GrantToken>) + Send>;
pub type AbortCallback = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeniedPrompt {
    pub step: StepId,
    pub message: String,
}

/// What the owner has to do next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Progress {
    /// An external request is out; feed its result back when it arrives.
    AwaitingResult { step: StepId, code: RequestCode },
    /// Show the prompt, then call `retry` or `abort`.
    Denied(DeniedPrompt),
    Completed,
    Aborted,
    /// The result did not belong to this run and was dropped.
    Ignored,
}

pub struct AuthorizationPipeline {
    steps: Vec<Box<dyn PermissionStep>>,
    platform_level: u32,
    state: Option<PipelineState>,
    on_complete: Option<CompleteCallback>,
    on_abort: Option<AbortCallback>,
}

impl AuthorizationPipeline {
    pub fn new(steps: Vec<Box<dyn PermissionStep>>, platform_level: u32) -> Self {
        Self {
            steps,
            platform_level,
            state: None,
            on_complete: None,
            on_abort: None,
        }
    }

    /// Begin the run. `on_complete` receives the token of the last
    /// token-producing step; exactly one of the two callbacks fires.
    pub fn start(
        &mut self,
        on_complete: impl FnOnce(Option<GrantToken>) + Send + 'static,
        on_abort: impl FnOnce() + Send + 'static,
    ) -> Result<Progress, PipelineError> {
        if self.state.is_some() {
            return Err(PipelineError::AlreadyStarted);
        }
        let state = PipelineState::new();
        info!(run_id = %state.run_id, steps = self.steps.len(), "authorization pipeline started");
        self.state = Some(state);
        self.on_complete = Some(Box::new(on_complete));
        self.on_abort = Some(Box::new(on_abort));
        self.advance()
    }

    pub fn state(&self) -> Option<&PipelineState> {
        self.state.as_ref()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.state.as_ref().map(|state| state.outcome)
    }

    pub fn current_step(&self) -> Option<StepId> {
        let state = self.state.as_ref()?;
        self.steps.get(state.current_step_index).map(|step| step.id())
    }

    /// Route one event from the shared result channel.
    ///
    /// Results for codes nobody is waiting on are expected (the channel is
    /// shared with unrelated requests) and come back as
    /// [`Progress::Ignored`].
    pub fn handle_result(&mut self, result: GrantResult) -> Result<Progress, PipelineError> {
        let index = match self.match_pending(result.code) {
            Ok(index) => index,
            Err(err) => {
                warn!(%err, "ignoring grant result");
                return Ok(Progress::Ignored);
            }
        };

        let step = &self.steps[index];
        let resolution = step.interpret(result);
        let state = self.state.as_mut().ok_or(PipelineError::NotStarted)?;
        state.awaiting = None;

        match resolution {
            StepResolution::Granted(token) => {
                info!(step = %step.id(), "permission granted");
                if let Some(token) = token {
                    state.last_result_payload = Some(token);
                }
                state.current_step_index += 1;
                self.advance()
            }
            StepResolution::Denied => self.deny(),
        }
    }

    /// Re-issue the request for the step that was just denied.
    pub fn retry(&mut self) -> Result<Progress, PipelineError> {
        let state = self.state.as_mut().ok_or(PipelineError::NotStarted)?;
        state.retry()?;
        debug!(step_index = state.current_step_index, "retrying denied step");
        self.request_current()
    }

    /// Give up on the whole run. Only valid while a denial prompt is open.
    pub fn abort(&mut self) -> Result<Progress, PipelineError> {
        let state = self.state.as_mut().ok_or(PipelineError::NotStarted)?;
        state.abort()?;
        state.awaiting = None;
        state.last_result_payload = None;
        info!(run_id = %state.run_id, "authorization pipeline aborted");
        if let Some(on_abort) = self.on_abort.take() {
            on_abort();
        }
        self.on_complete = None;
        Ok(Progress::Aborted)
    }

    fn match_pending(&self, code: RequestCode) -> Result<usize, PipelineError> {
        let state = self.state.as_ref().ok_or(PipelineError::NotStarted)?;
        match (state.outcome, state.awaiting) {
            (Outcome::Pending, Some(awaiting)) if awaiting == code => {
                Ok(state.current_step_index)
            }
            _ => Err(PipelineError::NoMatchingPendingRequest { code }),
        }
    }

    /// Move forward from the current index until a step needs the user or
    /// the list is exhausted.
    fn advance(&mut self) -> Result<Progress, PipelineError> {
        loop {
            let state = self.state.as_mut().ok_or(PipelineError::NotStarted)?;
            let Some(step) = self.steps.get(state.current_step_index) else {
                return self.complete();
            };

            if let Some(required) = step.min_platform_level() {
                if self.platform_level < required {
                    let err = PipelineError::UnsupportedPlatformVersion {
                        step: step.id(),
                        required,
                        actual: self.platform_level,
                    };
                    info!(%err, "skipping step");
                    state.skipped.push(step.id());
                    state.current_step_index += 1;
                    continue;
                }
            }

            if step.check_granted() {
                debug!(step = %step.id(), "already granted");
                state.current_step_index += 1;
                continue;
            }

            return self.request_current();
        }
    }

    fn request_current(&mut self) -> Result<Progress, PipelineError> {
        let state = self.state.as_mut().ok_or(PipelineError::NotStarted)?;
        let step = &self.steps[state.current_step_index];
        let code = step.request_code();

        match step.request_grant() {
            Ok(()) => {
                debug!(step = %step.id(), %code, "grant requested");
                state.awaiting = Some(code);
                Ok(Progress::AwaitingResult {
                    step: step.id(),
                    code,
                })
            }
            Err(err) => {
                warn!(%err, "grant request failed to launch");
                self.deny()
            }
        }
    }

    fn deny(&mut self) -> Result<Progress, PipelineError> {
        let state = self.state.as_mut().ok_or(PipelineError::NotStarted)?;
        state.deny()?;
        let step = &self.steps[state.current_step_index];
        warn!(err = %PipelineError::GrantDenied(step.id()), "waiting for retry or abort");
        Ok(Progress::Denied(DeniedPrompt {
            step: step.id(),
            message: step.denied_message().to_string(),
        }))
    }

    fn complete(&mut self) -> Result<Progress, PipelineError> {
        let state = self.state.as_mut().ok_or(PipelineError::NotStarted)?;
        state.complete()?;
        let token = state.last_result_payload.take();
        info!(run_id = %state.run_id, has_token = token.is_some(), "all permissions granted");
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(token);
        }
        self.on_abort = None;
        Ok(Progress::Completed)
    }
}
