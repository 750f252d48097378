//! Fakes for the external capabilities, shared by the unit tests.

use crate::permission::{
    PermissionPlatform, RequestCode, RequestError, StepId, StoragePermission,
};
use std::sync::Mutex;

#[derive(Default)]
struct PlatformState {
    level: u32,
    overlay_granted: bool,
    storage_granted: bool,
    fail_launch: bool,
    requests: Vec<StepId>,
}

pub struct FakePlatform {
    state: Mutex<PlatformState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PlatformState {
                level: 34,
                ..PlatformState::default()
            }),
        }
    }

    pub fn with_level(level: u32) -> Self {
        let platform = Self::new();
        platform.state.lock().unwrap().level = level;
        platform
    }

    pub fn set_overlay_granted(&self, granted: bool) {
        self.state.lock().unwrap().overlay_granted = granted;
    }

    pub fn set_storage_granted(&self, granted: bool) {
        self.state.lock().unwrap().storage_granted = granted;
    }

    pub fn set_fail_launch(&self, fail: bool) {
        self.state.lock().unwrap().fail_launch = fail;
    }

    /// Every request issued so far, in order.
    pub fn requests(&self) -> Vec<StepId> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self, step: StepId) -> usize {
        self.requests().iter().filter(|s| **s == step).count()
    }

    fn record(&self, step: StepId) -> Result<(), RequestError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_launch {
            return Err(RequestError::Launch {
                step,
                reason: "no handler".to_string(),
            });
        }
        state.requests.push(step);
        Ok(())
    }
}

impl PermissionPlatform for FakePlatform {
    fn platform_level(&self) -> u32 {
        self.state.lock().unwrap().level
    }

    fn can_draw_overlays(&self) -> bool {
        self.state.lock().unwrap().overlay_granted
    }

    fn open_overlay_settings(&self, _code: RequestCode) -> Result<(), RequestError> {
        self.record(StepId::DrawOverlay)
    }

    fn has_storage_access(&self, _permission: StoragePermission) -> bool {
        self.state.lock().unwrap().storage_granted
    }

    fn request_storage_access(
        &self,
        _permissions: &[StoragePermission],
        _code: RequestCode,
    ) -> Result<(), RequestError> {
        self.record(StepId::Storage)
    }

    fn request_screen_capture(&self, _code: RequestCode) -> Result<(), RequestError> {
        self.record(StepId::ScreenCapture)
    }
}
