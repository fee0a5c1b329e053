//! Configuration loading for the Varonis SaaS CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vs_connector::{PollSettings, SecureString, VaronisConfig};
use vs_observability::LogFormat;

/// Environment variable overriding `connection.base_url`.
pub const ENV_BASE_URL: &str = "VARONIS_BASE_URL";
/// Environment variable overriding `connection.api_key`.
pub const ENV_API_KEY: &str = "VARONIS_API_KEY";
/// Environment variable overriding `connection.integration_name`.
pub const ENV_INTEGRATION_NAME: &str = "VARONIS_INTEGRATION_NAME";

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "varonis-saas.yaml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Tenant connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Tenant base URL.
    #[serde(default)]
    pub base_url: String,

    /// API key. Usually supplied through `VARONIS_API_KEY` instead.
    #[serde(default)]
    pub api_key: SecureString,

    #[serde(default = "default_integration_name")]
    pub integration_name: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_true")]
    pub verify_tls: bool,

    #[serde(default)]
    pub poll: PollSettings,
}

fn default_integration_name() -> String {
    "Custom Integration".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: SecureString::default(),
            integration_name: default_integration_name(),
            timeout_secs: default_timeout(),
            verify_tls: true,
            poll: PollSettings::default(),
        }
    }
}

/// Logging settings from the config file; `-v` on the command line wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `plain` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "plain".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingSettings {
    pub fn level(&self) -> Result<tracing::Level> {
        self.level
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid log level: {}", self.level))
    }

    pub fn format(&self) -> Result<LogFormat> {
        self.format.parse().map_err(anyhow::Error::msg)
    }
}

impl AppConfig {
    /// Loads configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Loads `path` if given, else `DEFAULT_CONFIG_FILE` if it exists, else
    /// the defaults. Environment overrides are applied in every case.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(&fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Replaces connection values with non-empty values returned by `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(base_url) = value(ENV_BASE_URL) {
            self.connection.base_url = base_url;
        }
        if let Some(api_key) = value(ENV_API_KEY) {
            self.connection.api_key = SecureString::new(api_key);
        }
        if let Some(name) = value(ENV_INTEGRATION_NAME) {
            self.connection.integration_name = name;
        }
    }

    /// Creates a copy with secrets redacted.
    pub fn redact_secrets(&self) -> Self {
        let mut config = self.clone();
        if !config.connection.api_key.is_empty() {
            config.connection.api_key = SecureString::from(SecureString::redacted());
        }
        config
    }

    /// Builds and validates the connector configuration.
    pub fn connector_config(&self) -> Result<VaronisConfig> {
        let connection = &self.connection;
        let config = VaronisConfig {
            timeout_secs: connection.timeout_secs,
            verify_tls: connection.verify_tls,
            ..VaronisConfig::new(
                connection.base_url.clone(),
                connection.api_key.clone(),
            )
            .with_integration_name(connection.integration_name.clone())
            .with_poll(connection.poll.clone())
        };
        config.validate().with_context(|| {
            format!(
                "Invalid connection settings (set {} and {} or use a config file)",
                ENV_BASE_URL, ENV_API_KEY
            )
        })?;
        Ok(config)
    }
}
