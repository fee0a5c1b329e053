//! Search execution: compile, submit, resolve the polling location, poll.

use crate::auth::AuthSession;
use crate::config::PollSettings;
use crate::http::RawResponse;
use crate::mappers::ResultSet;
use crate::query::{translate, SearchInput, WireRequest};
use crate::traits::{truncate_body, ConnectorError, ConnectorResult};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Search job creation endpoint.
pub const SEARCH_PATH: &str = "/api/search/v2/search";

/// Prefix of the polling endpoint; the job location is appended.
pub const SEARCH_RESULTS_PREFIX: &str = "/api/search/";

/// Result descriptor data type that carries the rows location.
const ROWS_DATA_TYPE: &str = "rows";

/// How long and how often a search job is polled.
///
/// The default polls back-to-back with no limit, returning only when the job
/// completes or fails hard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub deadline: Option<Duration>,
}

impl From<&PollSettings> for PollPolicy {
    fn from(settings: &PollSettings) -> Self {
        Self {
            interval: Duration::from_millis(settings.interval_ms),
            max_attempts: settings.max_attempts,
            deadline: settings.deadline_secs.map(Duration::from_secs),
        }
    }
}

/// One entry of the job-creation response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultDescriptor {
    #[serde(default)]
    data_type: Option<String>,
    #[serde(default)]
    location: Option<String>,
}

/// Outcome of a single poll.
#[derive(Debug)]
enum PollState {
    Ready(ResultSet),
    Pending(StatusCode),
}

/// Runs search jobs through an [`AuthSession`].
pub struct SearchExecutor {
    session: Arc<AuthSession>,
    policy: PollPolicy,
}

impl SearchExecutor {
    pub fn new(session: Arc<AuthSession>, policy: PollPolicy) -> Self {
        Self { session, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Runs a search to completion.
    pub async fn search(
        &self,
        input: SearchInput,
        max_rows: Option<u32>,
    ) -> ConnectorResult<ResultSet> {
        self.search_with_cancel(input, max_rows, &CancellationToken::new())
            .await
    }

    /// Runs a search, giving up with [`ConnectorError::Cancelled`] once
    /// `cancel` fires.
    #[instrument(skip(self, input, cancel))]
    pub async fn search_with_cancel(
        &self,
        input: SearchInput,
        max_rows: Option<u32>,
        cancel: &CancellationToken,
    ) -> ConnectorResult<ResultSet> {
        let started = Instant::now();
        if max_rows == Some(0) {
            return Err(ConnectorError::InvalidQuery(
                "max_rows must be at least 1".to_string(),
            ));
        }

        let request = translate(input);
        let location = self.submit(&request).await?;
        let path = polling_path(&location, max_rows);
        let results = self.poll(&path, cancel).await?;

        info!(
            entity = request.entity_name().unwrap_or("unknown"),
            rows = results.rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search completed"
        );
        Ok(results)
    }

    /// Creates the search job and returns its rows location.
    #[instrument(skip(self, request), fields(entity = request.entity_name().unwrap_or("unknown")))]
    pub async fn submit(&self, request: &WireRequest) -> ConnectorResult<String> {
        let headers = self.session.ensure_headers().await?;
        let response = self
            .session
            .http()
            .post_json(SEARCH_PATH, headers, request)
            .await?;

        if !(response.is(StatusCode::OK) || response.is(StatusCode::CREATED)) {
            return Err(ConnectorError::api_status(
                "Search job creation failed",
                response.status,
                &response.body,
            ));
        }

        let location = resolve_location(&response.body)?;
        debug!(location = %location, "Search job created");
        Ok(location)
    }

    async fn poll(&self, path: &str, cancel: &CancellationToken) -> ConnectorResult<ResultSet> {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            if let Some(max) = self.policy.max_attempts {
                if attempts >= max {
                    return Err(ConnectorError::Timeout(format!(
                        "Search results not ready after {} polls",
                        attempts
                    )));
                }
            }
            if let Some(deadline) = self.policy.deadline {
                if started.elapsed() >= deadline {
                    return Err(ConnectorError::Timeout(format!(
                        "Search results not ready after {:?}",
                        deadline
                    )));
                }
            }
            attempts += 1;

            let state = tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(ConnectorError::Cancelled(format!(
                        "Search polling cancelled after {} attempts",
                        attempts - 1
                    )));
                }
                state = self.poll_once(path) => state?,
            };

            match state {
                PollState::Ready(results) => return Ok(results),
                PollState::Pending(status) => {
                    debug!(attempt = attempts, status = status.as_u16(), "Search still running");
                }
            }

            if !self.policy.interval.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(ConnectorError::Cancelled(format!(
                            "Search polling cancelled after {} attempts",
                            attempts
                        )));
                    }
                    _ = sleep(self.policy.interval) => {}
                }
            }
        }
    }

    async fn poll_once(&self, path: &str) -> ConnectorResult<PollState> {
        let headers = self.session.ensure_headers().await?;
        let response = self.session.http().get(path, headers).await?;
        classify_poll(response)
    }
}

/// 200 is ready, 400 and above is fatal, anything else means poll again.
fn classify_poll(response: RawResponse) -> ConnectorResult<PollState> {
    if response.is(StatusCode::OK) {
        let results: ResultSet = serde_json::from_str(&response.body).map_err(|e| {
            ConnectorError::RequestFailed(format!(
                "Failed to parse search results: {} - Body: {}",
                e,
                truncate_body(&response.body)
            ))
        })?;
        return Ok(PollState::Ready(results));
    }
    if response.status.as_u16() >= 400 {
        warn!(status = response.status.as_u16(), "Search polling failed");
        return Err(ConnectorError::api_status(
            "Search polling failed",
            response.status,
            &response.body,
        ));
    }
    Ok(PollState::Pending(response.status))
}

/// Picks the `rows` location out of the job-creation response.
fn resolve_location(body: &str) -> ConnectorResult<String> {
    let descriptors: Vec<ResultDescriptor> = serde_json::from_str(body).map_err(|e| {
        ConnectorError::RequestFailed(format!(
            "Failed to parse search job response: {} - Body: {}",
            e,
            truncate_body(body)
        ))
    })?;

    descriptors
        .into_iter()
        .find(|d| d.data_type.as_deref() == Some(ROWS_DATA_TYPE))
        .and_then(|d| d.location)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| {
            ConnectorError::RequestFailed(format!(
                "Search job response has no rows location - Body: {}",
                truncate_body(body)
            ))
        })
}

/// Polling path for a location, windowed to the first `max_rows` rows.
fn polling_path(location: &str, max_rows: Option<u32>) -> String {
    let mut path = format!(
        "{}{}",
        SEARCH_RESULTS_PREFIX,
        location.trim_start_matches('/')
    );
    if let Some(rows) = max_rows {
        let separator = if path.contains('?') { '&' } else { '?' };
        path.push_str(&format!("{}from=0&to={}", separator, rows - 1));
    }
    path
}
