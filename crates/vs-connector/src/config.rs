//! Connection settings for a Varonis SaaS tenant.

use crate::secure_string::SecureString;
use crate::traits::{ConnectorError, ConnectorResult};
use serde::{Deserialize, Serialize};

/// Connector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaronisConfig {
    /// Tenant base URL, e.g. `https://acme.varonis.io`.
    pub base_url: String,
    /// API key exchanged for a bearer token.
    pub api_key: SecureString,
    /// Value of the integration-identity header sent with every request.
    #[serde(default = "default_integration_name")]
    pub integration_name: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Whether to verify TLS certificates. Ignored in release builds.
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    /// Search polling knobs.
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

/// Polling knobs for search jobs. The defaults poll without delay until the
/// job finishes or fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    /// Delay between polls in milliseconds.
    #[serde(default)]
    pub interval_ms: u64,
    /// Give up after this many polls.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Give up once this many seconds have passed since the first poll.
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

impl VaronisConfig {
    /// Creates a configuration with default settings.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<SecureString>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            integration_name: default_integration_name(),
            timeout_secs: default_timeout(),
            verify_tls: true,
            poll: PollSettings::default(),
        }
    }

    pub fn with_integration_name(mut self, name: impl Into<String>) -> Self {
        self.integration_name = name.into();
        self
    }

    pub fn with_poll(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    /// Base URL without a trailing slash.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Checks that the configuration can be used to build a connector.
    pub fn validate(&self) -> ConnectorResult<()> {
        let base = self.normalized_base_url();
        if base.is_empty() {
            return Err(ConnectorError::ConfigError(
                "base_url must not be empty".to_string(),
            ));
        }
        if !base.starts_with("https://") && !base.starts_with("http://") {
            return Err(ConnectorError::ConfigError(format!(
                "base_url '{}' must start with http:// or https://",
                base
            )));
        }
        if self.api_key.is_empty() {
            return Err(ConnectorError::ConfigError(
                "api_key must not be empty".to_string(),
            ));
        }
        if self.integration_name.trim().is_empty() {
            return Err(ConnectorError::ConfigError(
                "integration_name must not be empty".to_string(),
            ));
        }
        if self.poll.max_attempts == Some(0) {
            return Err(ConnectorError::ConfigError(
                "poll.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = VaronisConfig::new("https://acme.varonis.io/", "key");
        assert_eq!(config.base_url, "https://acme.varonis.io");
        assert_eq!(config.integration_name, "Custom Integration");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let config: VaronisConfig = serde_json::from_str(
            r#"{ "base_url": "https://acme.varonis.io", "api_key": "k" }"#,
        )
        .unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert!(config.verify_tls);
        assert_eq!(config.poll, PollSettings::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(VaronisConfig::new("", "key").validate().is_err());
        assert!(VaronisConfig::new("ftp://x", "key").validate().is_err());
        assert!(VaronisConfig::new("https://x", "").validate().is_err());
        let config = VaronisConfig::new("https://x", "key").with_poll(PollSettings {
            max_attempts: Some(0),
            ..PollSettings::default()
        });
        assert!(matches!(
            config.validate(),
            Err(ConnectorError::ConfigError(_))
        ));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = VaronisConfig::new("https://x", "super-secret-key");
        assert!(!format!("{:?}", config).contains("super-secret-key"));
    }
}
