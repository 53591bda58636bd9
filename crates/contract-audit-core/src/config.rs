//! Configuration loading for contract-audit.
//!
//! The TOML file is optional; every field has a default. The credential is
//! the one value without a default: [`AuditSettings::resolve`] fails when
//! neither the environment nor the file provides it.

use crate::client::{AuditModel, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::error::{AuditError, Result};
use crate::history::default_history_path;
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the API credential.
pub const API_KEY_ENV: &str = "DEEPSEEK_API_KEY";

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    pub api: Option<ApiConfig>,
    pub history: Option<HistoryConfig>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    pub path: Option<PathBuf>,
}

impl Config {
    pub fn base_url(&self) -> &str {
        self.api
            .as_ref()
            .and_then(|api| api.base_url.as_deref())
            .unwrap_or(DEFAULT_BASE_URL)
    }

    /// Configured model, or the fast model.
    pub fn model(&self) -> Result<AuditModel> {
        match self.api.as_ref().and_then(|api| api.model.as_deref()) {
            Some(name) => name.parse().map_err(AuditError::Configuration),
            None => Ok(AuditModel::default()),
        }
    }

    /// Request timeout. Returns configured value or default (300s).
    pub fn timeout(&self) -> Duration {
        self.api
            .as_ref()
            .and_then(|api| api.timeout_secs)
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs)
    }

    pub fn history_path(&self) -> PathBuf {
        self.history
            .as_ref()
            .and_then(|history| history.path.clone())
            .unwrap_or_else(default_history_path)
    }

    fn api_key(&self) -> Option<&str> {
        self.api.as_ref().and_then(|api| api.api_key.as_deref())
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "contract-audit").ok_or_else(|| {
        AuditError::Configuration("Could not determine config directory".to_string())
    })?;
    Ok(dirs.config_dir().join("config.toml"))
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| {
        AuditError::Configuration(format!(
            "Failed to read config file {}: {e}",
            path.display()
        ))
    })?;
    toml::from_str(&contents).map_err(|e| {
        AuditError::Configuration(format!(
            "Failed to parse config file {} as TOML: {e}",
            path.display()
        ))
    })
}

/// Everything one audit run needs, resolved once at start-up.
#[derive(Clone, PartialEq, Eq)]
pub struct AuditSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: AuditModel,
    pub timeout: Duration,
    pub history_path: PathBuf,
}

impl std::fmt::Debug for AuditSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("history_path", &self.history_path)
            .finish()
    }
}

impl AuditSettings {
    /// Resolve settings from the config file and the environment credential.
    ///
    /// `env_key` (normally the value of [`API_KEY_ENV`]) wins over
    /// `api.api_key` in the file. Blank values count as missing.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Configuration`] if no credential is available or
    /// the configured model name is unknown.
    pub fn resolve(config: &Config, env_key: Option<String>) -> Result<Self> {
        let api_key = env_key
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                config
                    .api_key()
                    .filter(|key| !key.trim().is_empty())
                    .map(str::to_string)
            })
            .ok_or_else(|| {
                AuditError::Configuration(format!(
                    "no API key: set {API_KEY_ENV} or api.api_key in the config file"
                ))
            })?;

        Ok(Self {
            api_key: api_key.trim().to_string(),
            base_url: config.base_url().to_string(),
            model: config.model()?,
            timeout: config.timeout(),
            history_path: config.history_path(),
        })
    }
}
