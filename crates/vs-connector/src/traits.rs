//! Error types and the base connector trait.
//!
//! Every fallible operation in this crate returns [`ConnectorResult`], so callers
//! only ever match on one error enum regardless of which stage failed.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of response-body characters carried inside an error.
const ERROR_BODY_LIMIT: usize = 500;

/// Errors that can occur while talking to the Varonis SaaS API.
#[derive(Error, Debug, Clone)]
pub enum ConnectorError {
    /// The credential exchange failed (bad status, unparsable body or missing token).
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A submit, poll, action or enum call returned a non-success status
    /// or a body that could not be parsed.
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The caller-supplied request is invalid; raised before any network call.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A result set could not be reshaped into records.
    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ConnectorError {
    /// Builds a [`ConnectorError::RequestFailed`] carrying the status code and
    /// a bounded excerpt of the response body.
    pub fn api_status(context: &str, status: StatusCode, body: &str) -> Self {
        ConnectorError::RequestFailed(format!(
            "{} (status {}): {}",
            context,
            status.as_u16(),
            truncate_body(body)
        ))
    }

    /// Builds a [`ConnectorError::AuthenticationFailed`] carrying the status
    /// code and a bounded excerpt of the response body.
    pub fn auth_status(status: StatusCode, body: &str) -> Self {
        ConnectorError::AuthenticationFailed(format!(
            "token request returned status {}: {}",
            status.as_u16(),
            truncate_body(body)
        ))
    }

    /// Maps a transport-level reqwest error onto the matching variant.
    pub fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ConnectorError::Timeout(e.to_string())
        } else if e.is_connect() {
            ConnectorError::ConnectionFailed(e.to_string())
        } else {
            ConnectorError::RequestFailed(e.to_string())
        }
    }
}

/// Trims a response body to [`ERROR_BODY_LIMIT`] characters.
pub(crate) fn truncate_body(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Health status of a connector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorHealth {
    /// Credentials were accepted and the API is reachable.
    Healthy,
    /// The API is reachable but answered unexpectedly.
    Degraded(String),
    /// The API rejected the credentials or could not be reached.
    Unhealthy(String),
}

/// Base trait for connectors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Returns the connector name.
    fn name(&self) -> &str;

    /// Returns the connector type (e.g., "data_security").
    fn connector_type(&self) -> &str;

    /// Returns the capabilities this connector provides.
    fn capabilities(&self) -> Vec<String> {
        vec!["health_check".to_string(), "test_connection".to_string()]
    }

    /// Checks the health of the connector.
    async fn health_check(&self) -> ConnectorResult<ConnectorHealth>;

    /// Tests the connection to the external system.
    async fn test_connection(&self) -> ConnectorResult<bool>;
}
