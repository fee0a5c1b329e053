//! # vs-connector
//!
//! Client for the Varonis SaaS security-analytics API.
//!
//! Search intents are built with [`AlertSearch`] / [`EventSearch`], compiled
//! into the platform's wire schema by [`translate`], and executed as
//! asynchronous search jobs by [`SearchExecutor`]. [`VaronisConnector`] wraps
//! the whole pipeline together with the direct alert actions.
//!
//! ```no_run
//! use vs_connector::{AlertSearch, AlertSeverity, VaronisConfig, VaronisConnector};
//!
//! # async fn run() -> vs_connector::ConnectorResult<()> {
//! let connector = VaronisConnector::new(VaronisConfig::new("https://acme.varonis.io", "key"))?;
//! let alerts = connector
//!     .search_alerts(
//!         AlertSearch::new().last_days(7).severities([AlertSeverity::High]),
//!         Some(100),
//!     )
//!     .await?;
//! println!("{} alerts", alerts.len());
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod auth;
pub mod config;
pub mod connector;
pub mod constants;
pub mod http;
pub mod mappers;
pub mod query;
pub mod search;
pub mod secure_string;
pub mod testing;
pub mod traits;

pub use attributes::{AlertAttributes, AttributeCatalog, EntityKind, EventAttributes};
pub use auth::AuthSession;
pub use config::{PollSettings, VaronisConfig};
pub use connector::VaronisConnector;
pub use constants::{
    AlertCategory, AlertSeverity, AlertStatus, CloseReason, MAX_DAYS_BACK, THREAT_MODEL_ENUM_ID,
};
pub use mappers::{map_enum, EnumItem, Record, ResultSet};
pub use query::{
    compile, translate, AbstractSearchRequest, AlertSearch, Condition, EventSearch, SearchFilters,
    SearchInput, SortOrder, TimeBound, WireQuery, WireRequest,
};
pub use search::{PollPolicy, SearchExecutor};
pub use secure_string::SecureString;
pub use traits::{Connector, ConnectorError, ConnectorHealth, ConnectorResult};
pub use tokio_util::sync::CancellationToken;
