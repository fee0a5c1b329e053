//! Field names and column sets for the searchable entities.
//!
//! Each entity has a fixed, ordered base column list that every search
//! requests, plus a policy for appending caller-requested extra columns.

use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::traits::{ConnectorError, ConnectorResult};

/// Searchable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Alert,
    Event,
}

impl EntityKind {
    /// Entity name as used in `query.entityName`.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Alert => "Alert",
            EntityKind::Event => "Event",
        }
    }

    /// Field the time condition and the ordering are applied to.
    pub fn primary_time_field(self) -> &'static str {
        match self {
            EntityKind::Alert => AlertAttributes::TIME_UTC,
            EntityKind::Event => EventAttributes::TIME_UTC,
        }
    }

    /// Column list for this entity, see [`AttributeCatalog::get_fields`].
    pub fn get_fields(self, extra_fields: &[String]) -> Vec<String> {
        match self {
            EntityKind::Alert => AlertAttributes::get_fields(extra_fields),
            EntityKind::Event => EventAttributes::get_fields(extra_fields),
        }
    }
}

impl FromStr for EntityKind {
    type Err = ConnectorError;

    fn from_str(s: &str) -> ConnectorResult<Self> {
        match s {
            "Alert" => Ok(EntityKind::Alert),
            "Event" => Ok(EntityKind::Event),
            other => Err(ConnectorError::InvalidQuery(format!(
                "Unsupported entity '{}': expected Alert or Event",
                other
            ))),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column policy of one entity.
pub trait AttributeCatalog {
    /// Base columns, always requested, in this order.
    const COLUMNS: &'static [&'static str];

    /// Appends extra columns to a copy of [`Self::COLUMNS`].
    ///
    /// The result never contains duplicates and equals the base list when
    /// `extra_fields` is empty.
    fn get_fields(extra_fields: &[String]) -> Vec<String>;

    fn base_columns() -> Vec<String> {
        Self::COLUMNS.iter().map(|c| c.to_string()).collect()
    }
}

/// Alert field names.
pub struct AlertAttributes;

impl AlertAttributes {
    pub const ID: &'static str = "Alert.ID";
    pub const RULE_NAME: &'static str = "Alert.Rule.Name";
    pub const RULE_ID: &'static str = "Alert.Rule.ID";
    pub const TIME_UTC: &'static str = "Alert.TimeUTC";
    pub const RULE_SEVERITY_NAME: &'static str = "Alert.Rule.Severity.Name";
    pub const RULE_SEVERITY_ID: &'static str = "Alert.Rule.Severity.ID";
    pub const RULE_CATEGORY_ID: &'static str = "Alert.Rule.Category.ID";
    pub const STATUS_ID: &'static str = "Alert.Status.ID";
    pub const DEVICE_HOST_NAME: &'static str = "Alert.Device.HostName";
    pub const USER_IDENTITY_NAME: &'static str = "Alert.User.Identity.Name";
    pub const AGGREGATION_FILTER: &'static str = "Alert.AggregationFilter";
    pub const INGEST_TIME: &'static str = "Alert.IngestTime";

    /// Curated optional columns; extra-field requests are glob-matched against these.
    pub const EXTRA_COLUMNS: &'static [&'static str] = &[
        "Alert.Rule.Category.ID",
        "Alert.Rule.Category.Name",
        "Alert.Status.Name",
        "Alert.CloseReason.ID",
        "Alert.CloseReason.Name",
        "Alert.EventsCount",
        "Alert.Initial.Event.TimeUTC",
        "Alert.Location.CountryName",
        "Alert.Location.SubdivisionName",
        "Alert.Location.BlacklistedLocation",
        "Alert.Location.AbnormalLocation",
        "Alert.User.Name",
        "Alert.User.SamAccountName",
        "Alert.User.AccountType.Name",
        "Alert.User.IsFlagged",
        "Alert.Device.IsMaliciousExternalIP",
        "Alert.Device.ExternalIPThreatTypesName",
        "Alert.Device.OperatingSystem",
        "Alert.Device.Type",
        "Alert.Data.IsFlagged",
        "Alert.Data.IsSensitive",
        "Alert.Filer.Platform.Name",
        "Alert.Filer.Name",
        "Alert.Asset.Path",
        "Alert.Contain.AssetsCount",
    ];
}

impl AttributeCatalog for AlertAttributes {
    const COLUMNS: &'static [&'static str] = &[
        Self::RULE_NAME,
        Self::RULE_SEVERITY_NAME,
        Self::TIME_UTC,
        Self::ID,
        Self::RULE_ID,
        Self::RULE_SEVERITY_ID,
        Self::STATUS_ID,
        Self::DEVICE_HOST_NAME,
        Self::USER_IDENTITY_NAME,
        Self::INGEST_TIME,
    ];

    fn get_fields(extra_fields: &[String]) -> Vec<String> {
        let mut output = Self::base_columns();
        for requested in extra_fields {
            let pattern = Pattern::new(requested).ok();
            for candidate in Self::EXTRA_COLUMNS {
                let matched = match &pattern {
                    Some(p) => p.matches(candidate),
                    // Not a valid glob: only an exact name can match.
                    None => requested == candidate,
                };
                if matched && !output.iter().any(|c| c == candidate) {
                    output.push(candidate.to_string());
                }
            }
        }
        output
    }
}

/// Event field names.
pub struct EventAttributes;

impl EventAttributes {
    pub const TIME_UTC: &'static str = "Event.TimeUTC";
    pub const ID: &'static str = "Event.ID";
    pub const TYPE_NAME: &'static str = "Event.Type.Name";
    pub const DESCRIPTION: &'static str = "Event.Description";
    pub const OPERATION_NAME: &'static str = "Event.Operation.Name";
    pub const BY_ACCOUNT_SAM_ACCOUNT_NAME: &'static str = "Event.ByAccount.SamAccountName";
    pub const IP: &'static str = "Event.IP";
    pub const DEVICE_NAME: &'static str = "Event.Device.Name";
    pub const ON_RESOURCE_PATH: &'static str = "Event.OnResource.Path";
    pub const ON_OBJECT_NAME: &'static str = "Event.OnObjectName";
    pub const ALERT_ID: &'static str = "Event.Alert.ID";

    /// Requests every column the platform can return; passed through as-is.
    pub const WILDCARD: &'static str = "Event.*";
}

impl AttributeCatalog for EventAttributes {
    const COLUMNS: &'static [&'static str] = &[
        Self::TIME_UTC,
        Self::ID,
        Self::TYPE_NAME,
        Self::DESCRIPTION,
        Self::OPERATION_NAME,
        Self::BY_ACCOUNT_SAM_ACCOUNT_NAME,
        Self::IP,
        Self::DEVICE_NAME,
        Self::ON_RESOURCE_PATH,
        Self::ON_OBJECT_NAME,
        Self::ALERT_ID,
    ];

    fn get_fields(extra_fields: &[String]) -> Vec<String> {
        let mut output = Self::base_columns();
        for field in extra_fields {
            if !output.contains(field) {
                output.push(field.clone());
            }
        }
        output
    }
}
