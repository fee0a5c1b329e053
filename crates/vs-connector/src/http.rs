//! HTTP plumbing shared by the auth session, the search executor and the
//! direct-action calls.
//!
//! Requests are sent exactly once; status interpretation is left to the
//! caller because each endpoint has its own notion of success.

use crate::config::VaronisConfig;
use crate::traits::{ConnectorError, ConnectorResult};
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// A response whose body has already been read.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    pub fn is(&self, status: StatusCode) -> bool {
        self.status == status
    }
}

/// Thin wrapper around a configured reqwest client.
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Creates a client from connector configuration.
    pub fn new(config: &VaronisConfig) -> ConnectorResult<Self> {
        // TLS verification can only be turned off in debug builds.
        let verify_tls = if !config.verify_tls {
            #[cfg(debug_assertions)]
            {
                warn!(
                    base_url = %config.base_url,
                    "TLS certificate verification DISABLED in development mode"
                );
                false
            }
            #[cfg(not(debug_assertions))]
            {
                warn!(
                    base_url = %config.base_url,
                    "Attempted to disable TLS verification in a release build - request IGNORED"
                );
                true
            }
        } else {
            true
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!verify_tls)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ConnectorError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.normalized_base_url().to_string(),
        })
    }

    /// Builds a URL from a path.
    pub fn build_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Executes a GET request.
    pub async fn get(&self, path: &str, headers: HeaderMap) -> ConnectorResult<RawResponse> {
        let request = self.client.get(self.build_url(path)).headers(headers);
        self.execute(request).await
    }

    /// Executes a POST request with a JSON body.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        headers: HeaderMap,
        body: &T,
    ) -> ConnectorResult<RawResponse> {
        let request = self
            .client
            .post(self.build_url(path))
            .headers(headers)
            .json(body);
        self.execute(request).await
    }

    /// Executes a POST request with a form-encoded body.
    pub async fn post_form<T: Serialize + ?Sized>(
        &self,
        path: &str,
        headers: HeaderMap,
        form: &T,
    ) -> ConnectorResult<RawResponse> {
        let request = self
            .client
            .post(self.build_url(path))
            .headers(headers)
            .form(form);
        self.execute(request).await
    }

    async fn execute(&self, request: RequestBuilder) -> ConnectorResult<RawResponse> {
        let response = request.send().await.map_err(ConnectorError::from_transport)?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ConnectorError::RequestFailed(format!("Failed to read body: {}", e)))?;
        debug!(status = status.as_u16(), bytes = body.len(), "Received response");
        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let config = VaronisConfig::new("https://acme.varonis.io/", "key");
        let client = HttpClient::new(&config).unwrap();

        assert_eq!(
            client.build_url("/api/search/v2/search"),
            "https://acme.varonis.io/api/search/v2/search"
        );
        assert_eq!(
            client.build_url("api/search/v2/search"),
            "https://acme.varonis.io/api/search/v2/search"
        );
        assert_eq!(client.base_url(), "https://acme.varonis.io");
    }
}
