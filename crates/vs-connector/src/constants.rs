//! Platform enumerations and their numeric codes.

use crate::traits::ConnectorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default and maximum look-back window, in days.
pub const MAX_DAYS_BACK: u32 = 180;

/// Enum id of the threat-model (alert rule) lookup.
pub const THREAT_MODEL_ENUM_ID: u32 = 5821;

/// Close reason id sent when a status change carries no close reason.
pub const NO_CLOSE_REASON_ID: u32 = 0;

/// Normalizes a human-entered enum name: lowercase, underscores as spaces.
fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace('_', " ")
}

/// Alert workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    New,
    UnderInvestigation,
    Closed,
}

impl AlertStatus {
    /// Every known status, in platform order.
    pub const ALL: [AlertStatus; 3] = [
        AlertStatus::New,
        AlertStatus::UnderInvestigation,
        AlertStatus::Closed,
    ];

    /// Numeric code used on the wire.
    pub fn id(self) -> u32 {
        match self {
            AlertStatus::New => 1,
            AlertStatus::UnderInvestigation => 2,
            AlertStatus::Closed => 3,
        }
    }

    /// Name shown in the platform UI.
    pub fn display_name(self) -> &'static str {
        match self {
            AlertStatus::New => "New",
            AlertStatus::UnderInvestigation => "Under Investigation",
            AlertStatus::Closed => "Closed",
        }
    }
}

impl FromStr for AlertStatus {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "new" => Ok(AlertStatus::New),
            "under investigation" => Ok(AlertStatus::UnderInvestigation),
            "closed" => Ok(AlertStatus::Closed),
            _ => Err(ConnectorError::InvalidQuery(format!(
                "Unknown alert status '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Alert rule severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    High,
    Medium,
    Low,
}

impl AlertSeverity {
    /// Every known severity, in platform order.
    pub const ALL: [AlertSeverity; 3] = [
        AlertSeverity::High,
        AlertSeverity::Medium,
        AlertSeverity::Low,
    ];

    pub fn id(self) -> u32 {
        match self {
            AlertSeverity::High => 0,
            AlertSeverity::Medium => 1,
            AlertSeverity::Low => 2,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            AlertSeverity::High => "High",
            AlertSeverity::Medium => "Medium",
            AlertSeverity::Low => "Low",
        }
    }
}

impl FromStr for AlertSeverity {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "high" => Ok(AlertSeverity::High),
            "medium" => Ok(AlertSeverity::Medium),
            "low" => Ok(AlertSeverity::Low),
            _ => Err(ConnectorError::InvalidQuery(format!(
                "Unknown alert severity '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Reason attached when an alert is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Other,
    BenignActivity,
    TruePositive,
    EnvironmentMisconfiguration,
    AlertRecentlyCustomized,
    InaccurateAlertLogic,
    AuthorizedActivity,
}

impl CloseReason {
    pub fn id(self) -> u32 {
        match self {
            CloseReason::Other => 1,
            CloseReason::BenignActivity => 2,
            CloseReason::TruePositive => 3,
            CloseReason::EnvironmentMisconfiguration => 4,
            CloseReason::AlertRecentlyCustomized => 5,
            CloseReason::InaccurateAlertLogic => 6,
            CloseReason::AuthorizedActivity => 7,
        }
    }
}

impl FromStr for CloseReason {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "other" => Ok(CloseReason::Other),
            "benign activity" => Ok(CloseReason::BenignActivity),
            "true positive" => Ok(CloseReason::TruePositive),
            "environment misconfiguration" => Ok(CloseReason::EnvironmentMisconfiguration),
            "alert recently customized" => Ok(CloseReason::AlertRecentlyCustomized),
            "inaccurate alert logic" => Ok(CloseReason::InaccurateAlertLogic),
            "authorized activity" => Ok(CloseReason::AuthorizedActivity),
            _ => Err(ConnectorError::InvalidQuery(format!(
                "Unknown close reason '{}'",
                s
            ))),
        }
    }
}

/// Threat category of an alert rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    Reconnaissance,
    PrivilegeEscalation,
    LateralMovement,
    Exploitation,
    Exfiltration,
    Intrusion,
    DenialOfService,
    Other,
    Obfuscation,
}

impl AlertCategory {
    /// Category id as the platform stores it (a string, not a number).
    pub fn id(self) -> &'static str {
        match self {
            AlertCategory::Reconnaissance => "0",
            AlertCategory::PrivilegeEscalation => "1",
            AlertCategory::LateralMovement => "2",
            AlertCategory::Exploitation => "3",
            AlertCategory::Exfiltration => "4",
            AlertCategory::Intrusion => "5",
            AlertCategory::DenialOfService => "7",
            AlertCategory::Other => "9",
            AlertCategory::Obfuscation => "10",
        }
    }
}

impl FromStr for AlertCategory {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "reconnaissance" => Ok(AlertCategory::Reconnaissance),
            "privilege escalation" => Ok(AlertCategory::PrivilegeEscalation),
            "lateral movement" => Ok(AlertCategory::LateralMovement),
            "exploitation" => Ok(AlertCategory::Exploitation),
            "exfiltration" => Ok(AlertCategory::Exfiltration),
            "intrusion" => Ok(AlertCategory::Intrusion),
            "denial of service" => Ok(AlertCategory::DenialOfService),
            "other" => Ok(AlertCategory::Other),
            "obfuscation" | "obfuscation (anti-forensics)" => Ok(AlertCategory::Obfuscation),
            _ => Err(ConnectorError::InvalidQuery(format!(
                "Unknown alert category '{}'",
                s
            ))),
        }
    }
}
