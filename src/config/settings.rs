use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use lazy_static::lazy_static;

use crate::error::PawError;

const APP_DIR: &str = "com.pawtrack.app";
const CONFIG_FILE: &str = "pawtrack.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Overrides the platform app-data directory used for persisted state
    pub data_dir: Option<PathBuf>,
    pub log_filter: String,
    /// JSON catalog to load instead of the built-in one
    pub catalog_path: Option<PathBuf>,
    pub recall_category: String,
    pub calm_focus_category: String,
    pub skipped_gap_threshold: i64,
    pub max_insights: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_dir: None,
            log_filter: "info".to_string(),
            catalog_path: None,
            recall_category: "recall".to_string(),
            calm_focus_category: "calm-focus".to_string(),
            skipped_gap_threshold: 3,
            max_insights: 4,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, PawError> {
        Ok(toml::from_str::<AppConfig>(content)?)
    }

    /// Directory holding the persisted key-value records
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(app_data_dir)
    }
}

/// Platform-specific app data directory
pub fn app_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let mut dir = PathBuf::from(home);
            dir.push("Library/Application Support");
            dir.push(APP_DIR);
            return dir;
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            let mut dir = PathBuf::from(appdata);
            dir.push(APP_DIR);
            return dir;
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let mut dir = PathBuf::from(home);
            dir.push(".local/share");
            dir.push(APP_DIR);
            return dir;
        }
    }

    // Fallback
    PathBuf::from("data")
}

fn get_config_path() -> PathBuf {
    app_data_dir().join(CONFIG_FILE)
}

/// Read and parse a config file
pub fn load_config_file(path: &Path) -> anyhow::Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    let config = toml::from_str::<AppConfig>(&content)
        .with_context(|| format!("Failed to parse {:?}", path))?;
    Ok(config)
}

/// Where the active config came from. Loading happens before logging is
/// installed, so the outcome is kept and reported by [`ConfigSource::log`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    Defaults { path: PathBuf },
    File { path: PathBuf },
    Invalid { path: PathBuf, error: String },
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::Defaults { path } => {
                tracing::debug!(path = ?path, "No config file, using defaults");
            }
            ConfigSource::File { path } => {
                tracing::info!(path = ?path, "Loaded app config");
            }
            ConfigSource::Invalid { path, error } => {
                tracing::warn!(path = ?path, error = %error, "Invalid config, using defaults");
            }
        }
    }
}

/// Load the config at `path` without logging; an invalid file yields the
/// defaults plus the error.
pub fn resolve_config(path: &Path) -> (AppConfig, ConfigSource) {
    let path = path.to_path_buf();
    if !path.exists() {
        return (AppConfig::default(), ConfigSource::Defaults { path });
    }

    match load_config_file(&path) {
        Ok(config) => (config, ConfigSource::File { path }),
        Err(e) => {
            let error = format!("{:#}", e);
            (AppConfig::default(), ConfigSource::Invalid { path, error })
        }
    }
}

lazy_static! {
    static ref APP_CONFIG: (AppConfig, ConfigSource) = resolve_config(&get_config_path());
}

/// Get the cached app configuration (loaded once per process)
pub fn get_app_config() -> &'static AppConfig {
    &APP_CONFIG.0
}

/// How the cached configuration was obtained
pub fn app_config_source() -> &'static ConfigSource {
    &APP_CONFIG.1
}
