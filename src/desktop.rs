//! Tauri shell bridge: external opener and progress events for the webview.

use crate::overlay::{ExternalOpener, OpenError};
use crate::pipeline::Progress;
use crate::service::ServiceStatus;
use tauri::{AppHandle, Emitter};
use tracing::warn;

pub const PROGRESS_EVENT: &str = "authorization-progress";
pub const SERVICE_EVENT: &str = "service-status";

/// Opens translation pages in the system browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct TauriOpener;

impl ExternalOpener for TauriOpener {
    fn open(&self, url: &str) -> Result<(), OpenError> {
        tauri_plugin_opener::open_url(url, None::<&str>).map_err(|err| OpenError {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }
}

/// Forward pipeline progress so the frontend can show the retry/abort prompt.
pub fn emit_progress(app: &AppHandle, progress: &Progress) {
    if let Err(err) = app.emit(PROGRESS_EVENT, progress) {
        warn!(%err, "failed to emit authorization progress");
    }
}

pub fn emit_service_status(app: &AppHandle, status: &ServiceStatus) {
    if let Err(err) = app.emit(SERVICE_EVENT, status) {
        warn!(%err, "failed to emit service status");
    }
}
