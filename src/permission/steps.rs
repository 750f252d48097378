use super::{
    GrantResult, PermissionPlatform, PermissionStep, RequestCode, RequestError, ResultPayload,
    StepId, StepResolution, StoragePermission, RUNTIME_PERMISSION_LEVEL,
};
use std::sync::Arc;
use tracing::{debug, warn};

const DRAW_OVERLAY_DENIED: &str = "This app needs the [DrawOverlay] permission to run.";
const STORAGE_DENIED: &str = "This app needs the [Read/Write External Storage] permission to run.";
const SCREEN_CAPTURE_DENIED: &str = "Please grant the screenshot permission to use this service.";

/// The three mandatory steps, in the order they must be granted.
pub fn default_steps(platform: Arc<dyn PermissionPlatform>) -> Vec<Box<dyn PermissionStep>> {
    vec![
        Box::new(DrawOverlayStep::new(Arc::clone(&platform))),
        Box::new(StorageStep::new(Arc::clone(&platform))),
        Box::new(ScreenCaptureStep::new(platform)),
    ]
}

pub struct DrawOverlayStep {
    platform: Arc<dyn PermissionPlatform>,
}

impl DrawOverlayStep {
    pub fn new(platform: Arc<dyn PermissionPlatform>) -> Self {
        Self { platform }
    }
}

impl PermissionStep for DrawOverlayStep {
    fn id(&self) -> StepId {
        StepId::DrawOverlay
    }

    fn request_code(&self) -> RequestCode {
        RequestCode::DRAW_OVERLAY
    }

    fn denied_message(&self) -> &str {
        DRAW_OVERLAY_DENIED
    }

    fn min_platform_level(&self) -> Option<u32> {
        Some(RUNTIME_PERMISSION_LEVEL)
    }

    fn check_granted(&self) -> bool {
        self.platform.can_draw_overlays()
    }

    fn request_grant(&self) -> Result<(), RequestError> {
        self.platform.open_overlay_settings(self.request_code())
    }

    // The settings screen reports no verdict of its own, so the live
    // state is the only source of truth.
    fn interpret(&self, _result: GrantResult) -> StepResolution {
        if self.platform.can_draw_overlays() {
            StepResolution::Granted(None)
        } else {
            StepResolution::Denied
        }
    }
}

pub struct StorageStep {
    platform: Arc<dyn PermissionPlatform>,
}

impl StorageStep {
    pub fn new(platform: Arc<dyn PermissionPlatform>) -> Self {
        Self { platform }
    }
}

impl PermissionStep for StorageStep {
    fn id(&self) -> StepId {
        StepId::Storage
    }

    fn request_code(&self) -> RequestCode {
        RequestCode::STORAGE
    }

    fn denied_message(&self) -> &str {
        STORAGE_DENIED
    }

    fn min_platform_level(&self) -> Option<u32> {
        Some(RUNTIME_PERMISSION_LEVEL)
    }

    fn check_granted(&self) -> bool {
        StoragePermission::ALL
            .iter()
            .all(|permission| self.platform.has_storage_access(*permission))
    }

    fn request_grant(&self) -> Result<(), RequestError> {
        self.platform
            .request_storage_access(&StoragePermission::ALL, self.request_code())
    }

    fn interpret(&self, result: GrantResult) -> StepResolution {
        let granted = match result.payload {
            ResultPayload::Permissions(verdicts) => {
                debug!(?verdicts, "storage permission verdicts");
                StoragePermission::ALL.iter().all(|wanted| {
                    verdicts
                        .iter()
                        .any(|(permission, granted)| permission == wanted && *granted)
                })
            }
            _ => self.check_granted(),
        };
        if granted {
            StepResolution::Granted(None)
        } else {
            StepResolution::Denied
        }
    }
}

/// Consent for screen capture. There is nothing to check up front: every
/// run needs a fresh token, so the request is always issued and may be
/// repeated any number of times.
pub struct ScreenCaptureStep {
    platform: Arc<dyn PermissionPlatform>,
}

impl ScreenCaptureStep {
    pub fn new(platform: Arc<dyn PermissionPlatform>) -> Self {
        Self { platform }
    }
}

impl PermissionStep for ScreenCaptureStep {
    fn id(&self) -> StepId {
        StepId::ScreenCapture
    }

    fn request_code(&self) -> RequestCode {
        RequestCode::SCREEN_CAPTURE
    }

    fn denied_message(&self) -> &str {
        SCREEN_CAPTURE_DENIED
    }

    fn check_granted(&self) -> bool {
        false
    }

    fn request_grant(&self) -> Result<(), RequestError> {
        self.platform.request_screen_capture(self.request_code())
    }

    fn interpret(&self, result: GrantResult) -> StepResolution {
        match (result.success, result.payload) {
            (true, ResultPayload::Token(token)) => StepResolution::Granted(Some(token)),
            (true, _) => {
                warn!("screen capture accepted without a token");
                StepResolution::Denied
            }
            (false, _) => StepResolution::Denied,
        }
    }
}
