//! Bearer-token acquisition and request headers.
//!
//! The token is fetched on first use and then kept for the lifetime of the
//! session. There is no expiry tracking: a token the server later rejects
//! surfaces as an ordinary request failure.

use crate::config::VaronisConfig;
use crate::http::{HttpClient, RawResponse};
use crate::secure_string::SecureString;
use crate::traits::{truncate_body, ConnectorError, ConnectorResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Credential exchange endpoint.
pub const TOKEN_PATH: &str = "/api/authentication/api_keys/token";

/// Header carrying the API key during the credential exchange.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header identifying the calling integration on every request.
pub const INTEGRATION_HEADER: &str = "varonis-integration";

/// Grant type of the credential exchange.
pub const GRANT_TYPE: &str = "varonis_custom";

/// Owns the cached bearer token.
pub struct AuthSession {
    http: Arc<HttpClient>,
    api_key: SecureString,
    integration: HeaderValue,
    token: RwLock<Option<SecureString>>,
}

impl AuthSession {
    pub fn new(http: Arc<HttpClient>, config: &VaronisConfig) -> ConnectorResult<Self> {
        let integration = HeaderValue::from_str(&config.integration_name).map_err(|e| {
            ConnectorError::ConfigError(format!("Invalid integration name: {}", e))
        })?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            integration,
            token: RwLock::new(None),
        })
    }

    /// The HTTP client requests are sent through.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Whether a token has been acquired.
    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Returns the cached token, exchanging the API key for one if absent.
    pub async fn ensure_token(&self) -> ConnectorResult<SecureString> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }

        let mut slot = self.token.write().await;
        // Another caller may have fetched it while we waited for the lock.
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }
        let token = self.fetch_token().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    /// Headers for an authenticated JSON request.
    pub async fn ensure_headers(&self) -> ConnectorResult<HeaderMap> {
        let token = self.ensure_token().await?;
        let mut headers = self.identity_headers();
        let bearer = HeaderValue::from_str(&format!("bearer {}", token.expose_secret()))
            .map_err(|e| {
                ConnectorError::AuthenticationFailed(format!("Token is not a valid header: {}", e))
            })?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn identity_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(INTEGRATION_HEADER),
            self.integration.clone(),
        );
        headers
    }

    #[instrument(skip(self))]
    async fn fetch_token(&self) -> ConnectorResult<SecureString> {
        info!("Requesting Varonis SaaS access token");

        let mut headers = self.identity_headers();
        let key = HeaderValue::from_str(self.api_key.expose_secret()).map_err(|e| {
            ConnectorError::ConfigError(format!("API key is not a valid header value: {}", e))
        })?;
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);

        let response = self
            .http
            .post_form(TOKEN_PATH, headers, &[("grant_type", GRANT_TYPE)])
            .await
            .map_err(|e| ConnectorError::AuthenticationFailed(e.to_string()))?;

        let token = parse_token_response(&response)?;
        debug!("Access token acquired");
        Ok(token)
    }
}

/// Extracts `access_token` from a credential-exchange response.
fn parse_token_response(response: &RawResponse) -> ConnectorResult<SecureString> {
    if !response.is(StatusCode::OK) {
        return Err(ConnectorError::auth_status(response.status, &response.body));
    }

    let body: serde_json::Value = serde_json::from_str(&response.body).map_err(|e| {
        ConnectorError::AuthenticationFailed(format!(
            "Unparsable token response: {} - Body: {}",
            e,
            truncate_body(&response.body)
        ))
    })?;

    body.get("access_token")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .map(|t| SecureString::new(t.to_string()))
        .ok_or_else(|| {
            ConnectorError::AuthenticationFailed(format!(
                "Token response has no access_token - Body: {}",
                truncate_body(&response.body)
            ))
        })
}
