//! Application configuration
//!
//! Loaded from a YAML file; the socket URL can be overridden from the
//! environment.

use jobsockets::ManagerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Environment variable that overrides `socket.url`
pub const WS_URL_ENV: &str = "JOB_WATCH_WS_URL";
/// Environment variable holding the access token, read at every connect
pub const TOKEN_ENV: &str = "JOB_WATCH_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Job watcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Connection manager settings
    pub socket: ManagerConfig,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Job ids to watch
    #[serde(default)]
    pub jobs: Vec<String>,

    /// Also subscribe to progress updates
    #[serde(default)]
    pub progress: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from YAML file
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config = Self::from_yaml(&yaml_content)?;

        if let Ok(url) = std::env::var(WS_URL_ENV) {
            info!("Overriding socket URL from environment variable");
            config.socket.url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse without environment overrides or validation
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.socket
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if let Some(pos) = self.jobs.iter().position(|id| id.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "jobs[{}] must not be empty",
                pos
            )));
        }

        Ok(())
    }
}
