//! Background capture-and-translate service control.
//!
//! [`ServiceController`] is the single place that knows whether the
//! service runs. It receives the grant token from a finished authorization
//! run and moves it into the service.

pub mod flow;

use crate::permission::GrantToken;
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info, warn};

pub use flow::{FlowError, FlowState, TranslationFlow};

/// The long-running capture service.
pub trait CaptureService: Send {
    /// On failure the token comes back inside [`StartFailure`].
    fn start(&mut self, token: GrantToken) -> Result<(), StartFailure>;

    fn is_running(&self) -> bool;

    /// Stop and hand the grant back, if the service still holds it.
    fn stop(&mut self) -> Option<GrantToken>;
}

#[derive(Debug, thiserror::Error)]
#[error("capture service failed to start: {reason}")]
pub struct StartFailure {
    pub reason: String,
    pub token: GrantToken,
}

impl StartFailure {
    pub fn new(reason: impl Into<String>, token: GrantToken) -> Self {
        Self {
            reason: reason.into(),
            token,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("authorization finished without a screen capture grant")]
    MissingGrantToken,
    #[error("no capture grant was kept from the previous run")]
    NoKeptGrant,
    #[error("capture service failed to start: {0}")]
    StartFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    NotRunning,
    Running,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub state: ServiceState,
    pub started_at: Option<String>,
    pub has_kept_grant: bool,
    pub last_error: Option<String>,
    pub flow: FlowState,
}

pub struct ServiceController<S: CaptureService> {
    service: S,
    state: ServiceState,
    started_at: Option<DateTime<Local>>,
    keep_grant: bool,
    kept_grant: Option<GrantToken>,
    last_error: Option<ServiceError>,
    flow: TranslationFlow,
}

impl<S: CaptureService> ServiceController<S> {
    pub fn new(service: S, keep_grant: bool) -> Self {
        Self {
            service,
            state: ServiceState::NotRunning,
            started_at: None,
            keep_grant,
            kept_grant: None,
            last_error: None,
            flow: TranslationFlow::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == ServiceState::Running
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Start the service with the token from a finished pipeline run.
    /// Already running: the new token is dropped and nothing changes.
    pub fn on_pipeline_complete(
        &mut self,
        token: Option<GrantToken>,
    ) -> Result<ServiceState, ServiceError> {
        if self.is_running() {
            debug!("capture service already running, ignoring start");
            return Ok(self.state);
        }
        let result = self.start_with(token);
        self.last_error = result.as_ref().err().cloned();
        result
    }

    fn start_with(&mut self, token: Option<GrantToken>) -> Result<ServiceState, ServiceError> {
        let token = token.ok_or(ServiceError::MissingGrantToken)?;
        let token_id = token.id();
        if let Err(failure) = self.service.start(token) {
            warn!(%failure, %token_id, "capture service did not start");
            if self.keep_grant {
                self.kept_grant = Some(failure.token);
            }
            return Err(ServiceError::StartFailed(failure.reason));
        }

        self.state = ServiceState::Running;
        self.started_at = Some(Local::now());
        self.kept_grant = None;
        info!(%token_id, "capture service started");
        Ok(self.state)
    }

    /// Start again with the grant kept from the last stop.
    pub fn restart_with_kept_grant(&mut self) -> Result<ServiceState, ServiceError> {
        if self.is_running() {
            return Ok(self.state);
        }
        let token = self.kept_grant.take().ok_or(ServiceError::NoKeptGrant)?;
        self.on_pipeline_complete(Some(token))
    }

    pub fn stop(&mut self) -> ServiceState {
        if !self.is_running() {
            debug!("capture service not running, ignoring stop");
            return self.state;
        }
        let returned = self.service.stop();
        self.kept_grant = if self.keep_grant { returned } else { None };

        self.state = ServiceState::NotRunning;
        self.started_at = None;
        self.flow.reset();
        info!(kept_grant = self.kept_grant.is_some(), "capture service stopped");
        self.state
    }

    /// Pick up a service that died on its own.
    pub fn refresh(&mut self) -> ServiceState {
        if self.is_running() && !self.service.is_running() {
            warn!("capture service exited unexpectedly");
            self.state = ServiceState::NotRunning;
            self.started_at = None;
            self.flow.reset();
        }
        self.state
    }

    /// Why the last start attempt failed. Cleared by a successful start.
    pub fn last_error(&self) -> Option<&ServiceError> {
        self.last_error.as_ref()
    }

    pub fn take_last_error(&mut self) -> Option<ServiceError> {
        self.last_error.take()
    }

    pub fn has_kept_grant(&self) -> bool {
        self.kept_grant.is_some()
    }

    pub fn flow(&self) -> &TranslationFlow {
        &self.flow
    }

    pub fn flow_mut(&mut self) -> &mut TranslationFlow {
        &mut self.flow
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            state: self.state,
            started_at: self.started_at.map(|at| at.to_rfc3339()),
            has_kept_grant: self.has_kept_grant(),
            last_error: self.last_error.as_ref().map(ToString::to_string),
            flow: self.flow.current(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;

    #[derive(Default)]
    pub struct FakeService {
        pub token: Option<GrantToken>,
        pub starts: usize,
        pub stops: usize,
        pub fail_start: bool,
        pub crashed: bool,
    }

    impl CaptureService for FakeService {
        fn start(&mut self, token: GrantToken) -> Result<(), StartFailure> {
            if self.fail_start {
                return Err(StartFailure::new("display unavailable", token));
            }
            self.starts += 1;
            self.token = Some(token);
            self.crashed = false;
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.token.is_some() && !self.crashed
        }

        fn stop(&mut self) -> Option<GrantToken> {
            self.stops += 1;
            self.token.take()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::FakeService;
    use super::*;

    fn token(data: &[u8]) -> Option<GrantToken> {
        Some(GrantToken::new(data.to_vec()))
    }

    #[test]
    fn start_moves_token_into_service() {
        let mut controller = ServiceController::new(FakeService::default(), false);
        let state = controller.on_pipeline_complete(token(b"T")).unwrap();
        assert_eq!(state, ServiceState::Running);
        assert!(controller.is_running());
        assert_eq!(controller.service.token.as_ref().map(|t| t.data()), Some(&b"T"[..]));
        assert!(controller.status().started_at.is_some());
    }

    #[test]
    fn start_while_running_is_noop() {
        let mut controller = ServiceController::new(FakeService::default(), false);
        controller.on_pipeline_complete(token(b"first")).unwrap();
        controller.on_pipeline_complete(token(b"second")).unwrap();
        assert_eq!(controller.service.starts, 1);
        assert_eq!(
            controller.service.token.as_ref().map(|t| t.data()),
            Some(&b"first"[..])
        );
    }

    #[test]
    fn stop_while_stopped_is_noop() {
        let mut controller = ServiceController::new(FakeService::default(), false);
        assert_eq!(controller.stop(), ServiceState::NotRunning);
        assert_eq!(controller.service.stops, 0);
    }

    #[test]
    fn missing_token_is_an_error() {
        let mut controller = ServiceController::new(FakeService::default(), false);
        let err = controller.on_pipeline_complete(None).unwrap_err();
        assert!(matches!(err, ServiceError::MissingGrantToken));
        assert!(!controller.is_running());
    }

    #[test]
    fn failed_start_stays_stopped() {
        let service = FakeService {
            fail_start: true,
            ..FakeService::default()
        };
        let mut controller = ServiceController::new(service, false);
        assert!(controller.on_pipeline_complete(token(b"T")).is_err());
        assert_eq!(controller.state(), ServiceState::NotRunning);
        assert!(matches!(controller.last_error(), Some(ServiceError::StartFailed(_))));
        assert!(controller.status().last_error.is_some());
        assert!(!controller.has_kept_grant());
    }

    #[test]
    fn failed_restart_keeps_grant() {
        let mut controller = ServiceController::new(FakeService::default(), true);
        controller.on_pipeline_complete(token(b"T")).unwrap();
        controller.stop();

        controller.service.fail_start = true;
        assert!(matches!(
            controller.restart_with_kept_grant().unwrap_err(),
            ServiceError::StartFailed(_)
        ));
        assert!(controller.has_kept_grant());

        controller.service.fail_start = false;
        assert_eq!(controller.restart_with_kept_grant().unwrap(), ServiceState::Running);
        assert_eq!(
            controller.service.token.as_ref().map(|t| t.data()),
            Some(&b"T"[..])
        );
        assert!(controller.last_error().is_none());
    }

    #[test]
    fn failed_first_start_is_kept_for_retry() {
        let service = FakeService {
            fail_start: true,
            ..FakeService::default()
        };
        let mut controller = ServiceController::new(service, true);
        assert!(controller.on_pipeline_complete(token(b"T")).is_err());
        assert!(controller.has_kept_grant());
    }

    #[test]
    fn kept_grant_allows_restart() {
        let mut controller = ServiceController::new(FakeService::default(), true);
        controller.on_pipeline_complete(token(b"T")).unwrap();
        controller.stop();
        assert!(controller.has_kept_grant());

        assert_eq!(controller.restart_with_kept_grant().unwrap(), ServiceState::Running);
        assert_eq!(controller.service.starts, 2);
        assert!(!controller.has_kept_grant());
    }

    #[test]
    fn grant_released_when_not_kept() {
        let mut controller = ServiceController::new(FakeService::default(), false);
        controller.on_pipeline_complete(token(b"T")).unwrap();
        controller.stop();
        assert!(!controller.has_kept_grant());
        assert!(matches!(
            controller.restart_with_kept_grant().unwrap_err(),
            ServiceError::NoKeptGrant
        ));
    }

    #[test]
    fn stop_resets_flow() {
        let mut controller = ServiceController::new(FakeService::default(), false);
        controller.on_pipeline_complete(token(b"T")).unwrap();
        controller.flow_mut().change(FlowState::ScreenCircling).unwrap();
        controller.stop();
        assert_eq!(controller.flow().current(), FlowState::Idle);
    }

    #[test]
    fn refresh_notices_dead_service() {
        let mut controller = ServiceController::new(FakeService::default(), false);
        controller.on_pipeline_complete(token(b"T")).unwrap();
        controller.service.crashed = true;
        assert_eq!(controller.refresh(), ServiceState::NotRunning);
        assert!(!controller.is_running());
    }
}
