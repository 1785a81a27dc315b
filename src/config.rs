//! TOML settings for the client.
//!
//! ```toml
//! [api]
//! base_url = "https://bi.example.com"
//! token = "${INSIGHTDECK_TOKEN}"
//! timeout_secs = 30
//!
//! [workspace]
//! id = "ws-analytics"
//!
//! [export]
//! poll_interval_ms = 2000
//! max_attempts = 90
//!
//! [storage]
//! path = "/var/lib/insightdeck/local.db"
//! ```
//!
//! `INSIGHTDECK_API_URL`, `INSIGHTDECK_API_TOKEN` and `INSIGHTDECK_WORKSPACE`
//! override the file.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

use crate::validation::not_blank;

pub const DEFAULT_CONFIG_FILE: &str = "insightdeck.toml";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct Settings {
    #[validate(nested)]
    pub api: ApiSettings,
    #[validate(nested)]
    pub workspace: WorkspaceSettings,
    #[validate(nested)]
    pub export: ExportSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct ApiSettings {
    /// Backend origin, without a trailing `/api`.
    #[validate(url(message = "api.base_url must be an absolute URL"))]
    pub base_url: String,

    /// Bearer token (supports ${ENV_VAR} expansion).
    pub token: Option<String>,

    #[validate(range(min = 1, message = "api.timeout_secs must be at least 1"))]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct WorkspaceSettings {
    #[validate(custom(function = "not_blank", message = "workspace.id must not be empty"))]
    pub id: String,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
        }
    }
}

/// Export-job polling.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct ExportSettings {
    #[validate(range(min = 1, message = "export.poll_interval_ms must be at least 1"))]
    pub poll_interval_ms: u64,
    #[validate(range(min = 1, message = "export.max_attempts must be at least 1"))]
    pub max_attempts: u32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            max_attempts: 90,
        }
    }
}

impl ExportSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Local SQLite file; defaults to the platform data directory.
    pub path: Option<PathBuf>,
}

impl StorageSettings {
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("insightdeck")
                .join("insightdeck.db"),
        }
    }
}

impl Settings {
    /// Load `insightdeck.toml` from the working directory, falling back to
    /// defaults when it does not exist. Environment overrides always apply.
    pub fn load() -> Result<Self, SettingsError> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        let mut settings = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let mut settings = Self::from_file(path)?;
        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    fn from_file(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse settings from TOML text and expand `${VAR}` references.
    pub fn from_str(content: &str) -> Result<Self, SettingsError> {
        let mut settings: Settings = toml::from_str(content)?;
        settings.api.base_url = expand_env_vars(&settings.api.base_url)?;
        if let Some(token) = &settings.api.token {
            settings.api.token = Some(expand_env_vars(token)?);
        }
        settings.workspace.id = expand_env_vars(&settings.workspace.id)?;
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("INSIGHTDECK_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(token) = env::var("INSIGHTDECK_API_TOKEN") {
            self.api.token = Some(token);
        }
        if let Ok(workspace) = env::var("INSIGHTDECK_WORKSPACE") {
            self.workspace.id = workspace;
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        Validate::validate(self)?;
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SettingsError::InvalidConfig(format!(
                "api.base_url must start with http:// or https://, got '{}'",
                url
            )));
        }
        Ok(())
    }
}

/// Expand `${VAR}` references. Unterminated references are kept literally.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                let value =
                    env::var(name).map_err(|_| SettingsError::MissingEnvVar(name.to_string()))?;
                result.push_str(&value);
                rest = &after[end + 1..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    result.push_str(rest);
    Ok(result)
}
