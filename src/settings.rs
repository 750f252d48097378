use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const APP_DIR: &str = "overlay-translator";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Keep the screen capture grant when the service stops so the next
    /// start does not prompt again.
    pub keep_capture_grant: bool,
    /// Translation target overriding the locale-derived language.
    pub target_language: Option<String>,
    pub log_to_file: bool,
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            keep_capture_grant: false,
            target_language: None,
            log_to_file: false,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("config dir not found")]
    ConfigDirMissing,
    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(SETTINGS_FILE))
}

/// Load from the config dir. Missing or unreadable files yield defaults.
pub fn load() -> AppSettings {
    match settings_path() {
        Some(path) => load_from(&path),
        None => AppSettings::default(),
    }
}

pub fn load_from(path: &Path) -> AppSettings {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
        Err(_) => AppSettings::default(),
    }
}

pub fn save(settings: &AppSettings) -> Result<(), SettingsError> {
    let path = settings_path().ok_or(SettingsError::ConfigDirMissing)?;
    save_to(&path, settings)
}

pub fn save_to(path: &Path, settings: &AppSettings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)?;
    Ok(())
}
