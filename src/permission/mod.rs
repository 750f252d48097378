//! Permission steps: one authorization requirement each.
//!
//! A step knows how to check its current grant status, how to launch the
//! external request that asks the user for it, and how to read the result
//! that eventually comes back on the shared result channel.

pub mod platform;
pub mod steps;

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

pub use platform::{PermissionPlatform, StoragePermission};
pub use steps::{default_steps, DrawOverlayStep, ScreenCaptureStep, StorageStep};

/// Platform level from which draw-overlay and storage grants must be
/// requested at runtime. Below it they are implied by the install.
pub const RUNTIME_PERMISSION_LEVEL: u32 = 23;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    DrawOverlay,
    Storage,
    ScreenCapture,
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DrawOverlay => "draw-overlay",
            Self::Storage => "storage",
            Self::ScreenCapture => "screen-capture",
        };
        f.write_str(name)
    }
}

/// Correlation code pairing an outstanding external request with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RequestCode(pub u32);

impl RequestCode {
    pub const DRAW_OVERLAY: Self = Self(101);
    pub const STORAGE: Self = Self(102);
    pub const SCREEN_CAPTURE: Self = Self(103);
}

impl fmt::Display for RequestCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque screen-capture capability handed out by the consent flow.
///
/// Deliberately not `Clone`: the token moves from the pipeline to the
/// service controller and from there into the capture service.
pub struct GrantToken {
    id: Uuid,
    data: Vec<u8>,
}

impl GrantToken {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            data: data.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for GrantToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrantToken")
            .field("id", &self.id)
            .field("len", &self.data.len())
            .finish()
    }
}

#[derive(Debug)]
pub enum ResultPayload {
    None,
    Permissions(Vec<(StoragePermission, bool)>),
    Token(GrantToken),
}

/// One event from the shared, code-multiplexed result channel.
#[derive(Debug)]
pub struct GrantResult {
    pub code: RequestCode,
    pub success: bool,
    pub payload: ResultPayload,
}

impl GrantResult {
    pub fn new(code: RequestCode, success: bool) -> Self {
        Self {
            code,
            success,
            payload: ResultPayload::None,
        }
    }

    pub fn with_payload(mut self, payload: ResultPayload) -> Self {
        self.payload = payload;
        self
    }
}

#[derive(Debug)]
pub enum StepResolution {
    Granted(Option<GrantToken>),
    Denied,
}

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("could not launch {step} request: {reason}")]
    Launch { step: StepId, reason: String },
}

pub trait PermissionStep: Send {
    fn id(&self) -> StepId;

    fn request_code(&self) -> RequestCode;

    /// Message shown on the retry/abort prompt after a denial.
    fn denied_message(&self) -> &str;

    /// Minimum platform level at which this step applies at all.
    fn min_platform_level(&self) -> Option<u32> {
        None
    }

    fn check_granted(&self) -> bool;

    /// Launch the external request. The answer arrives later as a
    /// [`GrantResult`] tagged with [`PermissionStep::request_code`].
    fn request_grant(&self) -> Result<(), RequestError>;

    fn interpret(&self, result: GrantResult) -> StepResolution;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_codes_are_distinct() {
        let codes = [
            RequestCode::DRAW_OVERLAY,
            RequestCode::STORAGE,
            RequestCode::SCREEN_CAPTURE,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn grant_token_debug_hides_data() {
        let token = GrantToken::new(b"secret-projection".to_vec());
        let debug = format!("{token:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("len: 17"));
    }

    #[test]
    fn step_ids_display_kebab_case() {
        assert_eq!(StepId::DrawOverlay.to_string(), "draw-overlay");
        assert_eq!(StepId::ScreenCapture.to_string(), "screen-capture");
    }
}
