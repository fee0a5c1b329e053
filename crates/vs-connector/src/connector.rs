//! Varonis SaaS connector.
//!
//! Ties the auth session, the search executor and the direct-action
//! endpoints (status update, note, enum lookup) together.

use crate::auth::AuthSession;
use crate::config::VaronisConfig;
use crate::constants::{AlertStatus, CloseReason, NO_CLOSE_REASON_ID, THREAT_MODEL_ENUM_ID};
use crate::http::HttpClient;
use crate::mappers::{map_enum, EnumItem, Record, ResultSet};
use crate::query::{AlertSearch, EventSearch, SearchInput};
use crate::search::{PollPolicy, SearchExecutor};
use crate::traits::{
    truncate_body, Connector, ConnectorError, ConnectorHealth, ConnectorResult,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Alert status update endpoint.
pub const SET_STATUS_PATH: &str = "/api/alert/alert/SetStatusToAlerts";

/// Alert note endpoint.
pub const ADD_NOTE_PATH: &str = "/api/alert/alert/AddNoteToAlerts";

/// Prefix of the enum lookup endpoint; the enum id is appended.
pub const ENUM_PATH_PREFIX: &str = "/api/entitymodel/enum/";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SetStatusRequest<'a> {
    alert_guids: &'a [String],
    status_id: u32,
    close_reason_id: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AddNoteRequest<'a> {
    alert_guids: &'a [String],
    note: &'a str,
}

/// Varonis SaaS connector.
pub struct VaronisConnector {
    config: VaronisConfig,
    session: Arc<AuthSession>,
    executor: SearchExecutor,
}

impl VaronisConnector {
    /// Creates a connector. No network call is made until first use.
    pub fn new(config: VaronisConfig) -> ConnectorResult<Self> {
        config.validate()?;

        let http = Arc::new(HttpClient::new(&config)?);
        let session = Arc::new(AuthSession::new(http, &config)?);
        let executor = SearchExecutor::new(session.clone(), PollPolicy::from(&config.poll));

        info!(
            base_url = %config.normalized_base_url(),
            integration = %config.integration_name,
            "Varonis SaaS connector initialized"
        );

        Ok(Self {
            config,
            session,
            executor,
        })
    }

    pub fn config(&self) -> &VaronisConfig {
        &self.config
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    /// Acquires the bearer token if it has not been fetched yet.
    pub async fn authenticate(&self) -> ConnectorResult<()> {
        self.session.ensure_token().await.map(|_| ())
    }

    /// Runs a search and returns the raw result set.
    pub async fn search(
        &self,
        input: impl Into<SearchInput>,
        max_rows: Option<u32>,
    ) -> ConnectorResult<ResultSet> {
        self.executor.search(input.into(), max_rows).await
    }

    /// Like [`Self::search`], abandoning the poll loop once `cancel` fires.
    pub async fn search_with_cancel(
        &self,
        input: impl Into<SearchInput>,
        max_rows: Option<u32>,
        cancel: &CancellationToken,
    ) -> ConnectorResult<ResultSet> {
        self.executor
            .search_with_cancel(input.into(), max_rows, cancel)
            .await
    }

    /// Builds, runs and maps an alert search.
    pub async fn search_alerts(
        &self,
        search: AlertSearch,
        max_rows: Option<u32>,
    ) -> ConnectorResult<Vec<Record>> {
        let request = search.build()?;
        self.search(request, max_rows).await?.records()
    }

    /// Builds, runs and maps an event search.
    pub async fn search_events(
        &self,
        search: EventSearch,
        max_rows: Option<u32>,
    ) -> ConnectorResult<Vec<Record>> {
        let request = search.build()?;
        self.search(request, max_rows).await?.records()
    }

    /// Changes the status of alerts. Closing requires a close reason, and a
    /// close reason is only accepted when closing.
    #[instrument(skip(self, alert_ids), fields(count = alert_ids.len()))]
    pub async fn update_alert_status(
        &self,
        alert_ids: &[String],
        status: AlertStatus,
        close_reason: Option<CloseReason>,
    ) -> ConnectorResult<()> {
        require_alert_ids(alert_ids)?;
        let close_reason_id = match (status, close_reason) {
            (AlertStatus::Closed, Some(reason)) => reason.id(),
            (AlertStatus::Closed, None) => {
                return Err(ConnectorError::InvalidQuery(
                    "Closing alerts requires a close reason".to_string(),
                ))
            }
            (_, Some(_)) => {
                return Err(ConnectorError::InvalidQuery(format!(
                    "A close reason can only be given when closing, not for status '{}'",
                    status
                )))
            }
            (_, None) => NO_CLOSE_REASON_ID,
        };

        let body = SetStatusRequest {
            alert_guids: alert_ids,
            status_id: status.id(),
            close_reason_id,
        };
        self.post_action(SET_STATUS_PATH, &body, "Alert status update failed")
            .await?;
        info!(status = %status, "Alert status updated");
        Ok(())
    }

    /// Attaches a note to alerts.
    #[instrument(skip(self, alert_ids, note), fields(count = alert_ids.len()))]
    pub async fn add_alert_note(&self, alert_ids: &[String], note: &str) -> ConnectorResult<()> {
        require_alert_ids(alert_ids)?;
        if note.trim().is_empty() {
            return Err(ConnectorError::InvalidQuery(
                "Note must not be empty".to_string(),
            ));
        }

        let body = AddNoteRequest {
            alert_guids: alert_ids,
            note,
        };
        self.post_action(ADD_NOTE_PATH, &body, "Adding alert note failed")
            .await?;
        info!("Alert note added");
        Ok(())
    }

    /// Fetches a platform enum as a raw JSON list.
    #[instrument(skip(self))]
    pub async fn get_enum(&self, enum_id: u32) -> ConnectorResult<Vec<serde_json::Value>> {
        let headers = self.session.ensure_headers().await?;
        let path = format!("{}{}", ENUM_PATH_PREFIX, enum_id);
        let response = self.session.http().get(&path, headers).await?;

        if !response.is(StatusCode::OK) {
            return Err(ConnectorError::api_status(
                "Enum lookup failed",
                response.status,
                &response.body,
            ));
        }

        serde_json::from_str(&response.body).map_err(|e| {
            ConnectorError::RequestFailed(format!(
                "Failed to parse enum {}: {} - Body: {}",
                enum_id,
                e,
                truncate_body(&response.body)
            ))
        })
    }

    /// Lists threat models (alert rules) as `{id, name}` pairs.
    pub async fn get_threat_models(&self) -> ConnectorResult<Vec<EnumItem>> {
        let entries = self.get_enum(THREAT_MODEL_ENUM_ID).await?;
        map_enum(&entries)
    }

    async fn post_action<T: Serialize>(
        &self,
        path: &str,
        body: &T,
        context: &str,
    ) -> ConnectorResult<()> {
        let headers = self.session.ensure_headers().await?;
        let response = self.session.http().post_json(path, headers, body).await?;
        if !response.is(StatusCode::OK) {
            return Err(ConnectorError::api_status(
                context,
                response.status,
                &response.body,
            ));
        }
        Ok(())
    }
}

fn require_alert_ids(alert_ids: &[String]) -> ConnectorResult<()> {
    if alert_ids.is_empty() || alert_ids.iter().any(|id| id.trim().is_empty()) {
        return Err(ConnectorError::InvalidQuery(
            "At least one non-empty alert id is required".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl Connector for VaronisConnector {
    fn name(&self) -> &str {
        &self.config.integration_name
    }

    fn connector_type(&self) -> &str {
        "data_security"
    }

    fn capabilities(&self) -> Vec<String> {
        [
            "health_check",
            "test_connection",
            "search_alerts",
            "search_events",
            "update_alert_status",
            "add_alert_note",
            "get_threat_models",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect()
    }

    async fn health_check(&self) -> ConnectorResult<ConnectorHealth> {
        match self.authenticate().await {
            Ok(()) => Ok(ConnectorHealth::Healthy),
            Err(ConnectorError::AuthenticationFailed(e)) => Ok(ConnectorHealth::Unhealthy(
                format!("Authentication failed: {}", e),
            )),
            Err(ConnectorError::Timeout(e)) => {
                Ok(ConnectorHealth::Degraded(format!("Timeout: {}", e)))
            }
            Err(e) => Ok(ConnectorHealth::Unhealthy(e.to_string())),
        }
    }

    async fn test_connection(&self) -> ConnectorResult<bool> {
        self.authenticate().await?;
        Ok(true)
    }
}
