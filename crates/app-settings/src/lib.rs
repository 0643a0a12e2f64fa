use core_types::Provider;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://api.stability.ai/v2beta/stable-image/edit/inpaint";
pub const DEFAULT_TOKEN_ENV: &str = "RETOUCH_API_TOKEN";

#[derive(Debug, Error)]
pub enum AppSettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings path unavailable")]
    MissingSettingsPath,
}

pub type Result<T> = std::result::Result<T, AppSettingsError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Inpainting service URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub provider: Provider,
    /// Environment variable holding the API token. The token is never stored.
    #[serde(default = "default_token_env")]
    pub api_token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_output_format")]
    pub output_format: Option<String>,
    #[serde(default)]
    pub last_image_dir: Option<PathBuf>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_output_format() -> Option<String> {
    Some("png".to_string())
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            provider: Provider::default(),
            api_token_env: default_token_env(),
            request_timeout_secs: default_timeout_secs(),
            output_format: default_output_format(),
            last_image_dir: None,
        }
    }
}

impl AppSettings {
    pub fn load() -> Result<Self> {
        load_impl()
    }

    pub fn save(&self) -> Result<()> {
        save_impl(self)
    }

    /// Read settings from an explicit file; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let settings: AppSettings = serde_json::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(AppSettings::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let payload = serde_json::to_string_pretty(self)?;
        std::fs::write(path, payload)?;
        Ok(())
    }

    /// Token from the configured environment variable, if set and non-empty.
    pub fn api_token(&self) -> Option<String> {
        std::env::var(&self.api_token_env)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn get_last_image_dir(&self) -> Option<PathBuf> {
        self.last_image_dir.clone()
    }

    /// Remember the directory containing `image_path`.
    pub fn set_last_image_dir(&mut self, image_path: &Path) {
        let dir = if image_path.is_dir() {
            Some(image_path.to_path_buf())
        } else {
            image_path.parent().map(Path::to_path_buf)
        };
        if let Some(dir) = dir.filter(|d| !d.as_os_str().is_empty()) {
            self.last_image_dir = Some(dir);
        }
    }
}

#[cfg(target_os = "windows")]
fn load_impl() -> Result<AppSettings> {
    use winreg::enums::{HKEY_CURRENT_USER, KEY_READ};
    use winreg::RegKey;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let key = hkcu.open_subkey_with_flags("Software\\Retouch", KEY_READ).ok();

    if let Some(key) = key {
        if let Ok(payload) = key.get_value::<String, _>("Settings") {
            return Ok(serde_json::from_str(&payload)?);
        }
    }

    Ok(AppSettings::default())
}

#[cfg(target_os = "windows")]
fn save_impl(settings: &AppSettings) -> Result<()> {
    use winreg::enums::{HKEY_CURRENT_USER, KEY_WRITE};
    use winreg::RegKey;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let (key, _) = hkcu.create_subkey_with_flags("Software\\Retouch", KEY_WRITE)?;
    let payload = serde_json::to_string(settings)?;
    key.set_value("Settings", &payload)?;
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn load_impl() -> Result<AppSettings> {
    AppSettings::load_from(&settings_file_path()?)
}

#[cfg(not(target_os = "windows"))]
fn save_impl(settings: &AppSettings) -> Result<()> {
    settings.save_to(&settings_file_path()?)
}

#[cfg(target_os = "macos")]
fn settings_file_path() -> Result<PathBuf> {
    let base = directories::BaseDirs::new().ok_or(AppSettingsError::MissingSettingsPath)?;
    let mut path = base.home_dir().to_path_buf();
    path.push("Library");
    path.push("Preferences");
    path.push("com.retouch");
    path.push("settings.json");
    Ok(path)
}

#[cfg(all(not(target_os = "macos"), not(target_os = "windows")))]
fn settings_file_path() -> Result<PathBuf> {
    let base = directories::BaseDirs::new().ok_or(AppSettingsError::MissingSettingsPath)?;
    let mut path = base.config_dir().to_path_buf();
    path.push("retouch");
    path.push("settings.json");
    Ok(path)
}
