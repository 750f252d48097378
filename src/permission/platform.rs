use super::{RequestCode, RequestError};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoragePermission {
    Read,
    Write,
}

impl StoragePermission {
    pub const ALL: [Self; 2] = [Self::Read, Self::Write];
}

/// The host's permission surface.
///
/// Every `open_*`/`request_*` call starts an external round trip whose
/// answer is delivered later, keyed by the given code.
pub trait PermissionPlatform: Send + Sync {
    fn platform_level(&self) -> u32;

    fn can_draw_overlays(&self) -> bool;

    fn open_overlay_settings(&self, code: RequestCode) -> Result<(), RequestError>;

    fn has_storage_access(&self, permission: StoragePermission) -> bool;

    fn request_storage_access(
        &self,
        permissions: &[StoragePermission],
        code: RequestCode,
    ) -> Result<(), RequestError>;

    fn request_screen_capture(&self, code: RequestCode) -> Result<(), RequestError>;
}
