//! Helpers for tests that exercise the connector against a mock server.

use crate::config::{PollSettings, VaronisConfig};
use crate::mappers::ResultSet;
use serde_json::{json, Value};

/// API key used by [`test_config`].
pub const TEST_API_KEY: &str = "test-api-key";

/// Integration name used by [`test_config`].
pub const TEST_INTEGRATION: &str = "Connector Tests";

/// Configuration pointing at `base_url` with a bounded poll policy.
pub fn test_config(base_url: &str) -> VaronisConfig {
    VaronisConfig::new(base_url, TEST_API_KEY)
        .with_integration_name(TEST_INTEGRATION)
        .with_poll(PollSettings {
            interval_ms: 0,
            max_attempts: Some(20),
            deadline_secs: Some(10),
        })
}

/// Successful credential-exchange body.
pub fn token_body(token: &str) -> Value {
    json!({ "access_token": token, "token_type": "bearer", "expires_in": 3600 })
}

/// Job-creation body pointing the rows descriptor at `location`.
pub fn job_created_body(location: &str) -> Value {
    json!([
        { "dataType": "terms", "location": format!("{}/terms", location) },
        { "dataType": "rows", "location": location }
    ])
}

/// Two-row alert result set.
pub fn sample_alert_results() -> ResultSet {
    ResultSet::new(
        vec![
            "Alert.ID".to_string(),
            "Alert.Rule.Name".to_string(),
            "Alert.Status.ID".to_string(),
        ],
        vec![
            vec![json!("a-1"), json!("Abnormal file access"), json!(1)],
            vec![json!("a-2"), json!("Mass delete"), json!(3)],
        ],
    )
}
