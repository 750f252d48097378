pub mod locale;
pub mod logging;
pub mod overlay;
pub mod permission;
pub mod pipeline;
pub mod service;
pub mod settings;

#[cfg(feature = "desktop")]
pub mod desktop;

#[cfg(test)]
mod testing;

use permission::{default_steps, GrantResult, PermissionPlatform, StoragePermission};
use pipeline::{AuthorizationPipeline, PipelineError, Progress};
use serde::Serialize;
use service::{CaptureService, ServiceController, ServiceError, ServiceState, ServiceStatus};
use settings::AppSettings;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, Serialize, Default)]
pub struct PermissionStatus {
    pub draw_overlay: bool,
    pub storage: bool,
    pub platform_level: u32,
}

pub fn check_permissions(platform: &dyn PermissionPlatform) -> PermissionStatus {
    PermissionStatus {
        draw_overlay: platform.can_draw_overlays(),
        storage: StoragePermission::ALL
            .iter()
            .all(|permission| platform.has_storage_access(*permission)),
        platform_level: platform.platform_level(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("service controller lock poisoned")]
    LockPoisoned,
    #[error("authorization finished but the capture service did not start")]
    ServiceNotStarted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    Stopped,
    Launching(Progress),
}

/// Entry point of the app: runs authorization and hands the result to the
/// capture service.
pub struct Launcher<S: CaptureService + 'static> {
    platform: Arc<dyn PermissionPlatform>,
    controller: Arc<Mutex<ServiceController<S>>>,
    pipeline: Option<AuthorizationPipeline>,
}

impl<S: CaptureService + 'static> Launcher<S> {
    pub fn new(platform: Arc<dyn PermissionPlatform>, service: S, settings: &AppSettings) -> Self {
        Self {
            platform,
            controller: Arc::new(Mutex::new(ServiceController::new(
                service,
                settings.keep_capture_grant,
            ))),
            pipeline: None,
        }
    }

    /// Start a fresh authorization run. Fails while another run is still
    /// waiting on the user.
    pub fn launch(&mut self) -> Result<Progress, LaunchError> {
        if let Some(outcome) = self.pipeline.as_ref().and_then(|p| p.outcome()) {
            if !outcome.is_terminal() {
                return Err(PipelineError::AlreadyStarted.into());
            }
        }

        let steps = default_steps(Arc::clone(&self.platform));
        let mut pipeline = AuthorizationPipeline::new(steps, self.platform.platform_level());
        let controller = Arc::clone(&self.controller);
        let progress = pipeline.start(
            move |token| match controller.lock() {
                Ok(mut controller) => {
                    if let Err(err) = controller.on_pipeline_complete(token) {
                        error!(%err, "could not start capture service");
                    }
                }
                Err(_) => error!("service controller lock poisoned"),
            },
            || info!("authorization aborted by user"),
        )?;
        self.pipeline = Some(pipeline);
        self.finish(progress)
    }

    /// Feed one event from the host's result channel.
    pub fn handle_result(&mut self, result: GrantResult) -> Result<Progress, LaunchError> {
        let progress = match self.pipeline.as_mut() {
            Some(pipeline) => pipeline.handle_result(result)?,
            None => {
                warn!(code = %result.code, "grant result with no authorization run");
                Progress::Ignored
            }
        };
        self.finish(progress)
    }

    pub fn retry(&mut self) -> Result<Progress, LaunchError> {
        let pipeline = self.pipeline.as_mut().ok_or(PipelineError::NotStarted)?;
        let progress = pipeline.retry()?;
        self.finish(progress)
    }

    pub fn abort(&mut self) -> Result<Progress, LaunchError> {
        let pipeline = self.pipeline.as_mut().ok_or(PipelineError::NotStarted)?;
        Ok(pipeline.abort()?)
    }

    /// Stop the service when it runs, otherwise start authorization.
    pub fn toggle(&mut self) -> Result<Toggle, LaunchError> {
        if self.is_service_running()? {
            self.stop_service()?;
            Ok(Toggle::Stopped)
        } else {
            Ok(Toggle::Launching(self.launch()?))
        }
    }

    pub fn stop_service(&self) -> Result<ServiceState, LaunchError> {
        self.with_controller(|controller| controller.stop())
    }

    /// Restart from the grant kept at the last stop, skipping authorization.
    pub fn resume_with_kept_grant(&self) -> Result<ServiceState, LaunchError> {
        self.with_controller(|controller| controller.restart_with_kept_grant())?
            .map_err(LaunchError::from)
    }

    pub fn is_service_running(&self) -> Result<bool, LaunchError> {
        self.with_controller(|controller| controller.refresh() == ServiceState::Running)
    }

    pub fn service_status(&self) -> Result<ServiceStatus, LaunchError> {
        self.with_controller(|controller| controller.status())
    }

    pub fn permission_status(&self) -> PermissionStatus {
        check_permissions(self.platform.as_ref())
    }

    pub fn pipeline(&self) -> Option<&AuthorizationPipeline> {
        self.pipeline.as_ref()
    }

    fn with_controller<R>(
        &self,
        f: impl FnOnce(&mut ServiceController<S>) -> R,
    ) -> Result<R, LaunchError> {
        let mut controller = self
            .controller
            .lock()
            .map_err(|_| LaunchError::LockPoisoned)?;
        Ok(f(&mut controller))
    }

    fn finish(&self, progress: Progress) -> Result<Progress, LaunchError> {
        if progress == Progress::Completed && !self.is_service_running()? {
            let cause = self.with_controller(|controller| controller.take_last_error())?;
            return Err(cause.map_or(LaunchError::ServiceNotStarted, LaunchError::Service));
        }
        Ok(progress)
    }
}
