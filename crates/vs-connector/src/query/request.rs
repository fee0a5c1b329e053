//! Abstract search requests and the builders that validate them.
//!
//! A builder collects caller criteria, checks the time-selection rules and
//! normalizes every datetime to a UTC ISO-8601 string. The resulting
//! [`AbstractSearchRequest`] is a plain value; nothing here performs I/O.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::attributes::EntityKind;
use crate::constants::{AlertSeverity, AlertStatus, MAX_DAYS_BACK};
use crate::traits::{ConnectorError, ConnectorResult};

/// Result ordering on the entity's primary time field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Criteria of an abstract request. Unset criteria are empty or `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alert_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub device_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statuses: Vec<AlertStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub severities: Vec<AlertSeverity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingest_time_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingest_time_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_days: Option<u32>,
}

impl SearchFilters {
    /// Explicit start/end range, if both bounds are set.
    pub fn time_range(&self) -> Option<(&str, &str)> {
        match (&self.start_time, &self.end_time) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// Ingest-time range, if both bounds are set.
    pub fn ingest_range(&self) -> Option<(&str, &str)> {
        match (&self.ingest_time_start, &self.ingest_time_end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

/// Entity-agnostic search intent, compiled to a wire query by the translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractSearchRequest {
    pub entity: EntityKind,
    #[serde(default)]
    pub filters: SearchFilters,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_fields: Vec<String>,
    #[serde(default)]
    pub order: SortOrder,
}

impl AbstractSearchRequest {
    /// Applies the builder rules to a request that was not produced by a
    /// builder, such as one deserialized from JSON.
    ///
    /// Time strings are re-parsed and normalized to UTC, the time-mode rules
    /// are enforced, and alert-only criteria on an Event request are rejected.
    pub fn validated(self) -> ConnectorResult<Self> {
        let AbstractSearchRequest {
            entity,
            mut filters,
            extra_fields,
            order,
        } = self;

        if entity == EntityKind::Event {
            let alert_only = [
                ("rule_ids", !filters.rule_ids.is_empty()),
                ("category_ids", !filters.category_ids.is_empty()),
                ("device_names", !filters.device_names.is_empty()),
                ("user_names", !filters.user_names.is_empty()),
                ("statuses", !filters.statuses.is_empty()),
                ("severities", !filters.severities.is_empty()),
                ("ingest_time_start", filters.ingest_time_start.is_some()),
                ("ingest_time_end", filters.ingest_time_end.is_some()),
            ];
            if let Some((name, _)) = alert_only.iter().find(|(_, set)| *set) {
                return Err(ConnectorError::InvalidQuery(format!(
                    "'{}' is not a filter of Event searches",
                    name
                )));
            }
        }

        let range = (
            parse_bound(filters.start_time.take())?,
            parse_bound(filters.end_time.take())?,
        );
        let ingest = (
            parse_bound(filters.ingest_time_start.take())?,
            parse_bound(filters.ingest_time_end.take())?,
        );
        let time = resolve_time_selection(range, filters.last_days.take(), ingest)?;
        time.apply(&mut filters);

        Ok(AbstractSearchRequest {
            entity,
            filters,
            extra_fields,
            order,
        })
    }
}

fn parse_bound(value: Option<String>) -> ConnectorResult<Option<TimeBound>> {
    value.as_deref().map(TimeBound::from_str).transpose()
}

/// A caller-supplied time bound.
///
/// Naive values are representable so that they can be rejected with a clear
/// error instead of silently being read as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBound {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl TimeBound {
    fn to_utc(self, name: &str) -> ConnectorResult<DateTime<Utc>> {
        match self {
            TimeBound::Aware(dt) => Ok(dt.with_timezone(&Utc)),
            TimeBound::Naive(dt) => Err(ConnectorError::InvalidQuery(format!(
                "{} '{}' has no timezone; supply an explicit UTC offset",
                name, dt
            ))),
        }
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for TimeBound {
    fn from(dt: DateTime<Tz>) -> Self {
        TimeBound::Aware(dt.fixed_offset())
    }
}

impl From<NaiveDateTime> for TimeBound {
    fn from(dt: NaiveDateTime) -> Self {
        TimeBound::Naive(dt)
    }
}

impl FromStr for TimeBound {
    type Err = ConnectorError;

    /// Parses RFC 3339 (aware) or an offset-less date/datetime (naive).
    fn from_str(s: &str) -> ConnectorResult<Self> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(TimeBound::Aware(dt));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(TimeBound::Naive(dt));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(TimeBound::Naive(dt));
            }
        }
        Err(ConnectorError::InvalidQuery(format!(
            "Cannot parse '{}' as a datetime",
            s
        )))
    }
}

/// Serializes a UTC datetime as ISO-8601 with an explicit `+00:00` offset.
fn iso_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Time selection after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TimeSelection {
    Range { start: String, end: String },
    Ingest { start: String, end: String },
    LastDays(u32),
}

impl TimeSelection {
    fn apply(self, filters: &mut SearchFilters) {
        match self {
            TimeSelection::Range { start, end } => {
                filters.start_time = Some(start);
                filters.end_time = Some(end);
            }
            TimeSelection::Ingest { start, end } => {
                filters.ingest_time_start = Some(start);
                filters.ingest_time_end = Some(end);
            }
            TimeSelection::LastDays(days) => filters.last_days = Some(days),
        }
    }
}

/// Normalizes one two-sided range. A missing upper bound means "now";
/// a missing lower bound is rejected.
fn resolve_range(
    label: &str,
    start: Option<TimeBound>,
    end: Option<TimeBound>,
) -> ConnectorResult<(String, String)> {
    let start = start
        .ok_or_else(|| {
            ConnectorError::InvalidQuery(format!("{} end given without a start", label))
        })?
        .to_utc(&format!("{} start", label))?;
    let end = match end {
        Some(end) => end.to_utc(&format!("{} end", label))?,
        None => Utc::now(),
    };
    if end < start {
        return Err(ConnectorError::InvalidQuery(format!(
            "{} end {} is before start {}",
            label,
            iso_utc(end),
            iso_utc(start)
        )));
    }
    Ok((iso_utc(start), iso_utc(end)))
}

/// Enforces time-mode exclusivity and resolves the active mode.
fn resolve_time_selection(
    range: (Option<TimeBound>, Option<TimeBound>),
    last_days: Option<u32>,
    ingest: (Option<TimeBound>, Option<TimeBound>),
) -> ConnectorResult<TimeSelection> {
    let has_range = range.0.is_some() || range.1.is_some();
    let has_ingest = ingest.0.is_some() || ingest.1.is_some();
    let modes = [has_range, last_days.is_some(), has_ingest]
        .iter()
        .filter(|set| **set)
        .count();
    if modes > 1 {
        return Err(ConnectorError::InvalidQuery(
            "Multiple time modes specified: use one of start/end, last_days or ingest time"
                .to_string(),
        ));
    }

    if has_range {
        let (start, end) = resolve_range("time range", range.0, range.1)?;
        return Ok(TimeSelection::Range { start, end });
    }
    if has_ingest {
        let (start, end) = resolve_range("ingest time range", ingest.0, ingest.1)?;
        return Ok(TimeSelection::Ingest { start, end });
    }
    match last_days {
        Some(0) => Err(ConnectorError::InvalidQuery(
            "last_days must be at least 1".to_string(),
        )),
        Some(days) => Ok(TimeSelection::LastDays(days)),
        None => Ok(TimeSelection::LastDays(MAX_DAYS_BACK)),
    }
}

fn collect_strings<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

/// Builder for alert searches. Ascending order unless overridden.
#[derive(Debug, Clone, Default)]
pub struct AlertSearch {
    alert_ids: Vec<String>,
    rule_ids: Vec<String>,
    category_ids: Vec<String>,
    device_names: Vec<String>,
    user_names: Vec<String>,
    statuses: Vec<AlertStatus>,
    severities: Vec<AlertSeverity>,
    start_time: Option<TimeBound>,
    end_time: Option<TimeBound>,
    ingest_time_start: Option<TimeBound>,
    ingest_time_end: Option<TimeBound>,
    last_days: Option<u32>,
    extra_fields: Vec<String>,
    order: SortOrder,
}

impl AlertSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alert_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alert_ids = collect_strings(ids);
        self
    }

    /// Threat-model (rule) ids.
    pub fn rule_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule_ids = collect_strings(ids);
        self
    }

    pub fn category_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.category_ids = collect_strings(ids);
        self
    }

    pub fn device_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.device_names = collect_strings(names);
        self
    }

    pub fn user_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_names = collect_strings(names);
        self
    }

    pub fn statuses(mut self, statuses: impl IntoIterator<Item = AlertStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn severities(mut self, severities: impl IntoIterator<Item = AlertSeverity>) -> Self {
        self.severities = severities.into_iter().collect();
        self
    }

    pub fn start_time(mut self, start: impl Into<TimeBound>) -> Self {
        self.start_time = Some(start.into());
        self
    }

    pub fn end_time(mut self, end: impl Into<TimeBound>) -> Self {
        self.end_time = Some(end.into());
        self
    }

    pub fn ingest_time_start(mut self, start: impl Into<TimeBound>) -> Self {
        self.ingest_time_start = Some(start.into());
        self
    }

    pub fn ingest_time_end(mut self, end: impl Into<TimeBound>) -> Self {
        self.ingest_time_end = Some(end.into());
        self
    }

    pub fn last_days(mut self, days: u32) -> Self {
        self.last_days = Some(days);
        self
    }

    /// Optional columns; each value is a glob matched against the alert allow-list.
    pub fn extra_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_fields = collect_strings(fields);
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Validates the criteria and produces the abstract request.
    pub fn build(self) -> ConnectorResult<AbstractSearchRequest> {
        let time = resolve_time_selection(
            (self.start_time, self.end_time),
            self.last_days,
            (self.ingest_time_start, self.ingest_time_end),
        )?;

        let mut filters = SearchFilters {
            alert_ids: self.alert_ids,
            rule_ids: self.rule_ids,
            category_ids: self.category_ids,
            device_names: self.device_names,
            user_names: self.user_names,
            statuses: self.statuses,
            severities: self.severities,
            ..SearchFilters::default()
        };
        time.apply(&mut filters);

        Ok(AbstractSearchRequest {
            entity: EntityKind::Alert,
            filters,
            extra_fields: self.extra_fields,
            order: self.order,
        })
    }
}

/// Builder for event searches. Descending order unless overridden.
#[derive(Debug, Clone)]
pub struct EventSearch {
    alert_ids: Vec<String>,
    start_time: Option<TimeBound>,
    end_time: Option<TimeBound>,
    last_days: Option<u32>,
    extra_fields: Vec<String>,
    order: SortOrder,
}

impl Default for EventSearch {
    fn default() -> Self {
        Self {
            alert_ids: Vec::new(),
            start_time: None,
            end_time: None,
            last_days: None,
            extra_fields: Vec::new(),
            order: SortOrder::Desc,
        }
    }
}

impl EventSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts events to those linked to these alerts.
    pub fn alert_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alert_ids = collect_strings(ids);
        self
    }

    pub fn start_time(mut self, start: impl Into<TimeBound>) -> Self {
        self.start_time = Some(start.into());
        self
    }

    pub fn end_time(mut self, end: impl Into<TimeBound>) -> Self {
        self.end_time = Some(end.into());
        self
    }

    pub fn last_days(mut self, days: u32) -> Self {
        self.last_days = Some(days);
        self
    }

    /// Optional columns, appended verbatim (`Event.*` included).
    pub fn extra_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_fields = collect_strings(fields);
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn build(self) -> ConnectorResult<AbstractSearchRequest> {
        let time = resolve_time_selection(
            (self.start_time, self.end_time),
            self.last_days,
            (None, None),
        )?;

        let mut filters = SearchFilters {
            alert_ids: self.alert_ids,
            ..SearchFilters::default()
        };
        time.apply(&mut filters);

        Ok(AbstractSearchRequest {
            entity: EntityKind::Event,
            filters,
            extra_fields: self.extra_fields,
            order: self.order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_alert_builder_last_days() {
        let request = AlertSearch::new().last_days(7).build().unwrap();
        assert_eq!(request.entity, EntityKind::Alert);
        assert_eq!(request.filters.last_days, Some(7));
        assert_eq!(request.order, SortOrder::Asc);
    }

    #[test]
    fn test_event_builder_defaults() {
        let request = EventSearch::new().build().unwrap();
        assert_eq!(request.entity, EntityKind::Event);
        assert_eq!(request.order, SortOrder::Desc);
        assert_eq!(request.filters.last_days, Some(MAX_DAYS_BACK));
    }

    #[test]
    fn test_order_override() {
        let request = AlertSearch::new().order(SortOrder::Desc).build().unwrap();
        assert_eq!(request.order, SortOrder::Desc);
        let request = EventSearch::new().order(SortOrder::Asc).build().unwrap();
        assert_eq!(request.order, SortOrder::Asc);
    }

    #[test]
    fn test_conflicting_time_modes_raise() {
        let err = AlertSearch::new()
            .start_time(Utc::now())
            .last_days(5)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidQuery(_)));

        let err = AlertSearch::new()
            .ingest_time_start(utc(2025, 1, 1, 0))
            .last_days(5)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidQuery(_)));

        let err = AlertSearch::new()
            .start_time(utc(2025, 1, 1, 0))
            .end_time(utc(2025, 1, 2, 0))
            .ingest_time_start(utc(2025, 1, 1, 0))
            .ingest_time_end(utc(2025, 1, 2, 0))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidQuery(_)));

        let err = EventSearch::new()
            .end_time(Utc::now())
            .last_days(1)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidQuery(_)));
    }

    #[test]
    fn test_last_days_zero_raises() {
        assert!(matches!(
            AlertSearch::new().last_days(0).build(),
            Err(ConnectorError::InvalidQuery(_))
        ));
        assert!(matches!(
            EventSearch::new().last_days(0).build(),
            Err(ConnectorError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_end_before_start_raises() {
        let err = EventSearch::new()
            .start_time(utc(2025, 1, 2, 0))
            .end_time(utc(2025, 1, 1, 0))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidQuery(_)));
    }

    #[test]
    fn test_end_without_start_raises() {
        let err = AlertSearch::new()
            .end_time(utc(2025, 1, 1, 0))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidQuery(_)));
    }

    #[test]
    fn test_naive_datetime_raises() {
        let naive = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let err = EventSearch::new()
            .start_time(naive)
            .end_time(utc(2025, 1, 2, 0))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidQuery(_)));

        let err = AlertSearch::new()
            .ingest_time_start(utc(2025, 1, 1, 0))
            .ingest_time_end(naive)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidQuery(_)));
    }

    #[test]
    fn test_naive_string_raises() {
        let bound: TimeBound = "2025-01-01T00:00:00".parse().unwrap();
        assert!(matches!(bound, TimeBound::Naive(_)));
        let err = AlertSearch::new().start_time(bound).build().unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidQuery(_)));
    }

    #[test]
    fn test_datetime_serialization_to_iso() {
        let start = utc(2025, 1, 1, 0);
        let request = EventSearch::new()
            .start_time(start)
            .end_time(start)
            .build()
            .unwrap();
        let start_time = request.filters.start_time.as_deref().unwrap();
        assert!(start_time.ends_with("+00:00"));
        assert_eq!(start_time, "2025-01-01T00:00:00+00:00");
        assert_eq!(request.filters.last_days, None);
    }

    #[test]
    fn test_offsets_are_converted_to_utc() {
        let bound: TimeBound = "2025-03-01T12:00:00+02:00".parse().unwrap();
        let request = AlertSearch::new()
            .start_time(bound)
            .end_time(utc(2025, 3, 2, 0))
            .build()
            .unwrap();
        assert_eq!(
            request.filters.start_time.as_deref(),
            Some("2025-03-01T10:00:00+00:00")
        );
    }

    #[test]
    fn test_start_without_end_runs_until_now() {
        let start = Utc::now() - Duration::hours(1);
        let request = AlertSearch::new().start_time(start).build().unwrap();
        let (_, end) = request.filters.time_range().unwrap();
        let end = DateTime::parse_from_rfc3339(end).unwrap();
        assert!(end.with_timezone(&Utc) >= start);
    }

    #[test]
    fn test_ingest_range_populates_ingest_fields_only() {
        let request = AlertSearch::new()
            .ingest_time_start(utc(2025, 1, 1, 0))
            .ingest_time_end(utc(2025, 1, 3, 0))
            .build()
            .unwrap();
        assert_eq!(
            request.filters.ingest_range(),
            Some(("2025-01-01T00:00:00+00:00", "2025-01-03T00:00:00+00:00"))
        );
        assert_eq!(request.filters.last_days, None);
        assert_eq!(request.filters.time_range(), None);
    }

    #[test]
    fn test_unset_filters_are_absent_when_serialized() {
        let request = AlertSearch::new().last_days(3).build().unwrap();
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["entity"], "Alert");
        assert_eq!(value["order"], "asc");
        assert_eq!(value["filters"], serde_json::json!({ "last_days": 3 }));
    }

    #[test]
    fn test_unparsable_datetime_string() {
        assert!(matches!(
            "yesterday".parse::<TimeBound>(),
            Err(ConnectorError::InvalidQuery(_))
        ));
    }

    fn filters(value: serde_json::Value) -> SearchFilters {
        serde_json::from_value(value).unwrap()
    }

    fn request(entity: EntityKind, filters: SearchFilters) -> AbstractSearchRequest {
        AbstractSearchRequest {
            entity,
            filters,
            extra_fields: Vec::new(),
            order: SortOrder::Asc,
        }
    }

    fn invalid(entity: EntityKind, value: serde_json::Value) -> bool {
        matches!(
            request(entity, filters(value)).validated(),
            Err(ConnectorError::InvalidQuery(_))
        )
    }

    #[test]
    fn test_validated_keeps_builder_output() {
        let built = AlertSearch::new()
            .start_time(utc(2025, 1, 1, 0))
            .end_time(utc(2025, 1, 2, 0))
            .severities([AlertSeverity::Low])
            .build()
            .unwrap();
        assert_eq!(built.clone().validated().unwrap(), built);

        let events = EventSearch::new().alert_ids(["g"]).build().unwrap();
        assert_eq!(events.clone().validated().unwrap(), events);
    }

    #[test]
    fn test_validated_normalizes_offsets_and_defaults() {
        let normalized = request(
            EntityKind::Alert,
            filters(serde_json::json!({
                "start_time": "2025-01-01T02:00:00+02:00",
                "end_time": "2025-01-01T12:00:00Z"
            })),
        )
        .validated()
        .unwrap();
        assert_eq!(
            normalized.filters.time_range(),
            Some(("2025-01-01T00:00:00+00:00", "2025-01-01T12:00:00+00:00"))
        );

        let defaulted = request(EntityKind::Event, SearchFilters::default())
            .validated()
            .unwrap();
        assert_eq!(defaulted.filters.last_days, Some(MAX_DAYS_BACK));
    }

    #[test]
    fn test_validated_rejects_zero_last_days() {
        assert!(invalid(EntityKind::Alert, serde_json::json!({ "last_days": 0 })));
    }

    #[test]
    fn test_validated_rejects_two_time_modes() {
        assert!(invalid(
            EntityKind::Alert,
            serde_json::json!({
                "last_days": 3,
                "start_time": "2025-01-01T00:00:00Z",
                "end_time": "2025-01-02T00:00:00Z"
            })
        ));
        assert!(invalid(
            EntityKind::Alert,
            serde_json::json!({
                "start_time": "2025-01-01T00:00:00Z",
                "ingest_time_start": "2025-01-01T00:00:00Z"
            })
        ));
    }

    #[test]
    fn test_validated_rejects_inverted_range() {
        assert!(invalid(
            EntityKind::Alert,
            serde_json::json!({
                "start_time": "2025-01-02T00:00:00Z",
                "end_time": "2025-01-01T00:00:00Z"
            })
        ));
    }

    #[test]
    fn test_validated_rejects_naive_and_unparsable_times() {
        assert!(invalid(
            EntityKind::Alert,
            serde_json::json!({ "start_time": "2025-01-01T00:00:00" })
        ));
        assert!(invalid(
            EntityKind::Event,
            serde_json::json!({ "start_time": "tomorrow" })
        ));
        assert!(invalid(
            EntityKind::Alert,
            serde_json::json!({ "end_time": "2025-01-01T00:00:00Z" })
        ));
    }

    #[test]
    fn test_validated_start_only_runs_until_now() {
        let start = Utc::now() - Duration::hours(2);
        let normalized = request(
            EntityKind::Event,
            filters(serde_json::json!({ "start_time": start.to_rfc3339() })),
        )
        .validated()
        .unwrap();
        assert_eq!(normalized.filters.last_days, None);
        assert!(normalized.filters.time_range().is_some());
    }

    #[test]
    fn test_validated_rejects_alert_filters_on_events() {
        assert!(invalid(
            EntityKind::Event,
            serde_json::json!({ "severities": ["high"] })
        ));
        assert!(invalid(
            EntityKind::Event,
            serde_json::json!({
                "ingest_time_start": "2025-01-01T00:00:00Z",
                "ingest_time_end": "2025-01-02T00:00:00Z"
            })
        ));
    }
}
