//! Service configuration and UI-saved credentials.
//!
//! [`Settings`] comes from environment variables, optionally read from a
//! `.env` file in the working directory:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DOT_API_BASE_URL` | `https://dot.mindreset.tech` |
//! | `DOT_API_KEY` | (empty) |
//! | `DOT_DEFAULT_DEVICE_ID` | (empty) |
//! | `SERVICE_HOST` | `0.0.0.0` |
//! | `SERVICE_PORT` | `8000` |
//! | `SCREEN_WIDTH` | `296` |
//! | `SCREEN_HEIGHT` | `152` |
//! | `LOG_LEVEL` | `info` |
//! | `UI_SETTINGS_FILE` | `ui_settings.json` |
//!
//! Credentials entered in the browser UI are stored by [`SettingsStore`] and
//! take precedence over the environment; empty saved values fall back to it.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

use crate::client::ClientConfig;
use crate::error::Error;
use crate::{API_BASE_URL, SCREEN_HEIGHT, SCREEN_WIDTH};

/// Process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub dot_api_base_url: String,
    pub dot_api_key: String,
    pub dot_default_device_id: String,
    pub service_host: String,
    pub service_port: u16,
    pub screen_width: u32,
    pub screen_height: u32,
    pub log_level: String,
    pub ui_settings_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dot_api_base_url: API_BASE_URL.to_string(),
            dot_api_key: String::new(),
            dot_default_device_id: String::new(),
            service_host: "0.0.0.0".to_string(),
            service_port: 8000,
            screen_width: SCREEN_WIDTH,
            screen_height: SCREEN_HEIGHT,
            log_level: "info".to_string(),
            ui_settings_file: PathBuf::from("ui_settings.json"),
        }
    }
}

impl Settings {
    /// Load settings from `.env` (if present) and the environment.
    pub fn new() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }

        Self::from_environment(Environment::default())
    }

    /// Build settings from `environment` over the defaults.
    ///
    /// Values are kept as strings; numeric fields are parsed on deserialization
    /// so IDs and keys that look like numbers pass through unchanged.
    pub fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Config::builder()
            .set_default("dot_api_base_url", defaults.dot_api_base_url)?
            .set_default("dot_api_key", defaults.dot_api_key)?
            .set_default("dot_default_device_id", defaults.dot_default_device_id)?
            .set_default("service_host", defaults.service_host)?
            .set_default("service_port", i64::from(defaults.service_port))?
            .set_default("screen_width", i64::from(defaults.screen_width))?
            .set_default("screen_height", i64::from(defaults.screen_height))?
            .set_default("log_level", defaults.log_level)?
            .set_default(
                "ui_settings_file",
                defaults.ui_settings_file.to_string_lossy().to_string(),
            )?
            .add_source(environment)
            .build()?
            .try_deserialize()
    }

    /// Client configuration, with non-empty saved values overriding the environment.
    pub fn client_config(&self, saved: Option<&SavedSettings>) -> ClientConfig {
        fn pick<'a>(saved: Option<&'a str>, env: &'a str) -> &'a str {
            saved.filter(|s| !s.is_empty()).unwrap_or(env)
        }

        let api_key = pick(saved.map(|s| s.api_key.as_str()), &self.dot_api_key);
        let base_url = pick(saved.map(|s| s.base_url.as_str()), &self.dot_api_base_url);
        let device_id = pick(
            saved.map(|s| s.device_id.as_str()),
            &self.dot_default_device_id,
        );

        ClientConfig::new(api_key)
            .with_base_url(base_url)
            .with_default_device(device_id)
    }
}

/// Credentials saved from the settings page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSettings {
    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub device_id: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    API_BASE_URL.to_string()
}

/// Flat JSON file holding [`SavedSettings`].
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved settings.
    ///
    /// A missing or unreadable file yields `None`.
    pub async fn load(&self) -> Option<SavedSettings> {
        let text = tokio::fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str(&text) {
            Ok(saved) => Some(saved),
            Err(e) => {
                tracing::warn!("Ignoring unreadable {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Overwrite the file with `saved` as pretty-printed JSON.
    pub async fn save(&self, saved: &SavedSettings) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(saved)?;
        tokio::fs::write(&self.path, json).await?;
        tracing::info!("Saved UI settings to {}", self.path.display());
        Ok(())
    }
}
