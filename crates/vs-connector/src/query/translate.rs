//! Compilation of abstract requests into the wire schema.

use serde_json::Value;

use super::request::{AbstractSearchRequest, SearchFilters, SortOrder};
use super::wire::{
    Condition, FilterGroup, InValue, Ordering, QueryBlock, RequestParams, RowsBlock,
    SortDirection, WireQuery, WireRequest,
};
use crate::attributes::{AlertAttributes, EntityKind, EventAttributes};
use crate::constants::{AlertSeverity, AlertStatus, MAX_DAYS_BACK};
use crate::traits::{ConnectorError, ConnectorResult};

/// Value of the aggregation flag that selects aggregated alert records.
const AGGREGATED: u32 = 1;

/// Input accepted at the search boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchInput {
    /// Needs compiling.
    Abstract(AbstractSearchRequest),
    /// Already compiled; passed through unchanged.
    Wire(WireQuery),
    /// Caller-supplied wire JSON, submitted exactly as given.
    Raw(Value),
}

impl SearchInput {
    /// Classifies untyped JSON.
    ///
    /// An object carrying all of [`WireQuery::TOP_LEVEL_KEYS`] is kept as raw
    /// wire JSON. Anything else is read as an abstract request and checked
    /// against the same rules the builders apply.
    pub fn from_value(value: Value) -> ConnectorResult<Self> {
        let is_wire = value
            .as_object()
            .map(|obj| WireQuery::TOP_LEVEL_KEYS.iter().all(|k| obj.contains_key(*k)))
            .unwrap_or(false);

        if is_wire {
            return Ok(SearchInput::Raw(value));
        }

        // Check the entity first so the error names it instead of a serde path.
        if let Some(entity) = value.get("entity").and_then(Value::as_str) {
            entity.parse::<EntityKind>()?;
        }
        let request: AbstractSearchRequest = serde_json::from_value(value).map_err(|e| {
            ConnectorError::InvalidQuery(format!("Malformed search request: {}", e))
        })?;
        Ok(SearchInput::Abstract(request.validated()?))
    }
}

impl From<AbstractSearchRequest> for SearchInput {
    fn from(request: AbstractSearchRequest) -> Self {
        SearchInput::Abstract(request)
    }
}

impl From<WireQuery> for SearchInput {
    fn from(query: WireQuery) -> Self {
        SearchInput::Wire(query)
    }
}

/// Compiles the input; wire queries and raw wire JSON are returned as-is.
pub fn translate(input: SearchInput) -> WireRequest {
    match input {
        SearchInput::Abstract(request) => WireRequest::Compiled(compile(&request)),
        SearchInput::Wire(query) => WireRequest::Compiled(query),
        SearchInput::Raw(value) => WireRequest::Raw(value),
    }
}

/// Compiles an abstract request into the wire schema.
pub fn compile(request: &AbstractSearchRequest) -> WireQuery {
    let entity = request.entity;
    let time_field = entity.primary_time_field();

    let mut filter = FilterGroup::and();
    filter.filters = match entity {
        EntityKind::Alert => alert_conditions(&request.filters),
        EntityKind::Event => event_conditions(&request.filters),
    };

    let sort_order = match request.order {
        SortOrder::Desc => SortDirection::Desc,
        SortOrder::Asc => SortDirection::Asc,
    };

    WireQuery {
        query: QueryBlock {
            entity_name: entity.as_str().to_string(),
            filter,
        },
        rows: RowsBlock {
            columns: entity.get_fields(&request.extra_fields),
            filter: Vec::new(),
            grouping: String::new(),
            ordering: vec![Ordering {
                path: time_field.to_string(),
                sort_order,
            }],
        },
        request_params: RequestParams::default(),
    }
}

fn between(path: &str, lower: &str, upper: &str) -> Condition {
    Condition::Between {
        path: path.to_string(),
        lower: Value::from(lower),
        upper: Value::from(upper),
    }
}

fn last_days(path: &str, filters: &SearchFilters) -> Condition {
    Condition::LastDays {
        path: path.to_string(),
        days: filters.last_days.unwrap_or(MAX_DAYS_BACK),
    }
}

/// `In` condition whose entries mirror each raw value; `None` when empty.
fn in_mirrored(path: &str, values: &[String]) -> Option<Condition> {
    if values.is_empty() {
        return None;
    }
    Some(Condition::In {
        path: path.to_string(),
        values: values.iter().map(|v| InValue::mirrored(v.as_str())).collect(),
    })
}

fn alert_conditions(filters: &SearchFilters) -> Vec<Condition> {
    let mut conditions = vec![Condition::Equals {
        path: AlertAttributes::AGGREGATION_FILTER.to_string(),
        value: Value::from(AGGREGATED),
    }];

    let time_condition = if let Some((start, end)) = filters.ingest_range() {
        between(AlertAttributes::INGEST_TIME, start, end)
    } else if let Some((start, end)) = filters.time_range() {
        between(AlertAttributes::TIME_UTC, start, end)
    } else {
        last_days(AlertAttributes::TIME_UTC, filters)
    };
    conditions.push(time_condition);

    let lists = [
        (AlertAttributes::ID, &filters.alert_ids),
        (AlertAttributes::RULE_ID, &filters.rule_ids),
        (AlertAttributes::RULE_CATEGORY_ID, &filters.category_ids),
        (AlertAttributes::DEVICE_HOST_NAME, &filters.device_names),
        (AlertAttributes::USER_IDENTITY_NAME, &filters.user_names),
    ];
    conditions.extend(
        lists
            .into_iter()
            .filter_map(|(path, values)| in_mirrored(path, values)),
    );

    // An unset status or severity filter means every known value, not "any".
    let statuses: &[AlertStatus] = if filters.statuses.is_empty() {
        &AlertStatus::ALL
    } else {
        &filters.statuses
    };
    conditions.push(Condition::In {
        path: AlertAttributes::STATUS_ID.to_string(),
        values: statuses
            .iter()
            .map(|s| InValue::with_display(s.id(), s.display_name()))
            .collect(),
    });

    let severities: &[AlertSeverity] = if filters.severities.is_empty() {
        &AlertSeverity::ALL
    } else {
        &filters.severities
    };
    conditions.push(Condition::In {
        path: AlertAttributes::RULE_SEVERITY_ID.to_string(),
        values: severities
            .iter()
            .map(|s| InValue::with_display(s.id(), s.display_name()))
            .collect(),
    });

    conditions
}

fn event_conditions(filters: &SearchFilters) -> Vec<Condition> {
    let mut conditions = Vec::new();
    if let Some(condition) = in_mirrored(EventAttributes::ALERT_ID, &filters.alert_ids) {
        conditions.push(condition);
    }

    let time_condition = match filters.time_range() {
        Some((start, end)) => between(EventAttributes::TIME_UTC, start, end),
        None => last_days(EventAttributes::TIME_UTC, filters),
    };
    conditions.push(time_condition);
    conditions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeCatalog;
    use crate::query::request::{AlertSearch, EventSearch};
    use crate::query::wire::Operator;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn conditions(query: &WireQuery) -> &[Condition] {
        &query.query.filter.filters
    }

    fn find<'a>(query: &'a WireQuery, path: &str) -> Option<&'a Condition> {
        conditions(query).iter().find(|c| c.path() == path)
    }

    #[test]
    fn test_translation_produces_search_v2_schema() {
        let request = EventSearch::new().last_days(1).build().unwrap();
        let query = compile(&request);
        let body = serde_json::to_value(translate(request.into())).unwrap();

        let top = body.as_object().unwrap();
        assert!(top.contains_key("query"));
        assert!(top.contains_key("rows"));
        assert!(top.contains_key("requestParams"));
        assert_eq!(body["query"]["entityName"], "Event");
        assert!(!query.rows.columns.is_empty());
        let filters = conditions(&query);
        assert!(!filters.is_empty());
        assert_eq!(
            filters
                .iter()
                .filter(|c| c.operator() == Operator::LastDays)
                .count(),
            1
        );
        assert_eq!(body["query"]["filter"]["filterOperator"], 0);
    }

    #[test]
    fn test_wire_query_passes_through_unchanged() {
        let compiled = compile(&AlertSearch::new().last_days(3).build().unwrap());
        let again = translate(SearchInput::Wire(compiled.clone()));
        assert_eq!(again, WireRequest::Compiled(compiled));
    }

    #[test]
    fn test_wire_json_is_detected_and_preserved() {
        let compiled = compile(&AlertSearch::new().last_days(3).build().unwrap());
        let raw = serde_json::to_value(&compiled).unwrap();
        let input = SearchInput::from_value(raw.clone()).unwrap();
        assert_eq!(input, SearchInput::Raw(raw.clone()));
        assert_eq!(serde_json::to_value(translate(input)).unwrap(), raw);
    }

    #[test]
    fn test_hand_written_wire_json_is_submitted_verbatim() {
        let text = concat!(
            r#"{"query":{"entityName":"Alert","filter":{"filterOperator":0,"filters":["#,
            r#"{"path":"Alert.TimeUTC","operator":"LastDays","values":[{"Alert.TimeUTC":7}]},"#,
            r#"{"path":"Alert.Status.ID","operator":"NotEquals","values":[{"Alert.Status.ID":3}]}"#,
            r#"]}},"rows":{"columns":["Alert.ID"],"filter":[],"grouping":"","ordering":[],"#,
            r#""facets":["Alert.Rule.Name"]},"#,
            r#""requestParams":{"searchSource":1,"searchSourceName":"MainTab"}}"#
        );
        let raw: Value = serde_json::from_str(text).unwrap();

        let input = SearchInput::from_value(raw).unwrap();
        let request = translate(input);
        assert_eq!(request.entity_name(), Some("Alert"));
        assert_eq!(serde_json::to_string(&request).unwrap(), text);
    }

    #[test]
    fn test_abstract_json_is_compiled() {
        let input = SearchInput::from_value(json!({
            "entity": "Event",
            "filters": { "last_days": 2 },
            "order": "desc"
        }))
        .unwrap();
        let query = match input {
            SearchInput::Abstract(ref request) => compile(request),
            ref other => panic!("expected an abstract request, got {:?}", other),
        };
        assert_eq!(query.query.entity_name, "Event");
        assert_eq!(query.rows.ordering[0].sort_order, SortDirection::Desc);
        assert_eq!(translate(input).entity_name(), Some("Event"));
    }

    fn rejected(value: Value) -> bool {
        matches!(
            SearchInput::from_value(value),
            Err(ConnectorError::InvalidQuery(_))
        )
    }

    #[test]
    fn test_abstract_json_zero_last_days_is_rejected() {
        assert!(rejected(json!({ "entity": "Alert", "filters": { "last_days": 0 } })));
    }

    #[test]
    fn test_abstract_json_time_rules_are_enforced() {
        assert!(rejected(json!({
            "entity": "Alert",
            "filters": {
                "last_days": 3,
                "start_time": "2025-01-02T00:00:00Z",
                "end_time": "2025-01-01T00:00:00Z"
            }
        })));
        assert!(rejected(json!({
            "entity": "Event",
            "filters": {
                "start_time": "2025-01-02T00:00:00Z",
                "end_time": "2025-01-01T00:00:00Z"
            }
        })));
        assert!(rejected(json!({
            "entity": "Event",
            "filters": { "end_time": "2025-01-01T00:00:00Z" }
        })));
        assert!(rejected(json!({
            "entity": "Alert",
            "filters": { "start_time": "2025-01-01T00:00:00" }
        })));
        assert!(rejected(json!({
            "entity": "Alert",
            "filters": { "start_time": "last tuesday" }
        })));
    }

    #[test]
    fn test_abstract_json_alert_filters_on_events_are_rejected() {
        assert!(rejected(json!({
            "entity": "Event",
            "filters": { "statuses": ["new"] }
        })));
        assert!(rejected(json!({
            "entity": "Event",
            "filters": {
                "ingest_time_start": "2025-01-01T00:00:00Z",
                "ingest_time_end": "2025-01-02T00:00:00Z"
            }
        })));
    }

    #[test]
    fn test_abstract_json_start_only_becomes_range_until_now() {
        let input = SearchInput::from_value(json!({
            "entity": "Alert",
            "filters": { "start_time": "2025-01-01T02:00:00+02:00" }
        }))
        .unwrap();
        let request = match input {
            SearchInput::Abstract(request) => request,
            other => panic!("expected an abstract request, got {:?}", other),
        };
        assert_eq!(request.filters.last_days, None);
        assert_eq!(
            request.filters.start_time.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
        assert!(request.filters.end_time.is_some());

        let query = compile(&request);
        assert!(find(&query, "Alert.TimeUTC")
            .map(|c| c.operator() == Operator::Between)
            .unwrap_or(false));
    }

    #[test]
    fn test_unsupported_entity_is_rejected() {
        let err = SearchInput::from_value(json!({ "entity": "File", "filters": {} })).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidQuery(ref m) if m.contains("File")));
    }

    #[test]
    fn test_alert_starts_with_aggregation_flag_then_time() {
        let query = compile(&AlertSearch::new().last_days(7).build().unwrap());
        let filters = conditions(&query);
        assert_eq!(
            filters[0],
            Condition::Equals {
                path: "Alert.AggregationFilter".to_string(),
                value: json!(1),
            }
        );
        assert_eq!(
            filters[1],
            Condition::LastDays {
                path: "Alert.TimeUTC".to_string(),
                days: 7,
            }
        );
    }

    #[test]
    fn test_alert_unset_status_and_severity_enumerate_all() {
        let query = compile(&AlertSearch::new().build().unwrap());

        match find(&query, "Alert.Status.ID") {
            Some(Condition::In { values, .. }) => {
                let ids: Vec<_> = values.iter().map(|v| v.value.clone()).collect();
                assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
            }
            other => panic!("expected status In condition, got {:?}", other),
        }
        match find(&query, "Alert.Rule.Severity.ID") {
            Some(Condition::In { values, .. }) => {
                let ids: Vec<_> = values.iter().map(|v| v.value.clone()).collect();
                assert_eq!(ids, vec![json!(0), json!(1), json!(2)]);
            }
            other => panic!("expected severity In condition, got {:?}", other),
        }
    }

    #[test]
    fn test_alert_explicit_status_and_severity_use_codes() {
        let query = compile(
            &AlertSearch::new()
                .statuses([AlertStatus::Closed])
                .severities([AlertSeverity::High, AlertSeverity::Low])
                .build()
                .unwrap(),
        );
        let body = serde_json::to_value(&query).unwrap();
        let filters = body["query"]["filter"]["filters"].as_array().unwrap();
        let status = filters
            .iter()
            .find(|f| f["path"] == "Alert.Status.ID")
            .unwrap();
        assert_eq!(
            status["values"],
            json!([{ "Alert.Status.ID": 3, "displayValue": "Closed" }])
        );
        let severity = filters
            .iter()
            .find(|f| f["path"] == "Alert.Rule.Severity.ID")
            .unwrap();
        assert_eq!(
            severity["values"],
            json!([
                { "Alert.Rule.Severity.ID": 0, "displayValue": "High" },
                { "Alert.Rule.Severity.ID": 2, "displayValue": "Low" }
            ])
        );
    }

    #[test]
    fn test_alert_list_filters_in_order() {
        let query = compile(
            &AlertSearch::new()
                .alert_ids(["a-1"])
                .rule_ids(["42"])
                .category_ids(["3"])
                .device_names(["host-1"])
                .user_names(["jdoe", "asmith"])
                .build()
                .unwrap(),
        );
        let paths: Vec<&str> = conditions(&query).iter().map(|c| c.path()).collect();
        assert_eq!(
            paths,
            vec![
                "Alert.AggregationFilter",
                "Alert.TimeUTC",
                "Alert.ID",
                "Alert.Rule.ID",
                "Alert.Rule.Category.ID",
                "Alert.Device.HostName",
                "Alert.User.Identity.Name",
                "Alert.Status.ID",
                "Alert.Rule.Severity.ID",
            ]
        );
        match find(&query, "Alert.User.Identity.Name") {
            Some(Condition::In { values, .. }) => {
                assert_eq!(values.len(), 2);
                assert_eq!(values[0].display, Some(json!("jdoe")));
            }
            other => panic!("expected user In condition, got {:?}", other),
        }
    }

    #[test]
    fn test_alert_ingest_range_wins_over_primary_time() {
        let query = compile(
            &AlertSearch::new()
                .ingest_time_start(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
                .ingest_time_end(Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap())
                .build()
                .unwrap(),
        );
        let body = serde_json::to_value(&query).unwrap();
        assert_eq!(
            body["query"]["filter"]["filters"][1],
            json!({
                "path": "Alert.IngestTime",
                "operator": "Between",
                "values": [{
                    "Alert.IngestTime": "2025-01-01T00:00:00+00:00",
                    "Alert.IngestTime0": "2025-01-02T00:00:00+00:00"
                }]
            })
        );
        assert!(find(&query, "Alert.TimeUTC").is_none());
    }

    #[test]
    fn test_event_has_no_alert_dimensions() {
        let query = compile(&EventSearch::new().build().unwrap());
        let filters = conditions(&query);
        assert_eq!(filters.len(), 1);
        assert!(find(&query, "Alert.Status.ID").is_none());
        assert!(find(&query, "Alert.Rule.Severity.ID").is_none());
        assert!(find(&query, "Alert.AggregationFilter").is_none());
        assert_eq!(
            filters[0],
            Condition::LastDays {
                path: "Event.TimeUTC".to_string(),
                days: 180,
            }
        );
    }

    #[test]
    fn test_event_alert_link_and_range() {
        let start = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 2, 3, 0, 0, 0).unwrap();
        let query = compile(
            &EventSearch::new()
                .alert_ids(["guid-1", "guid-2"])
                .start_time(start)
                .end_time(end)
                .build()
                .unwrap(),
        );
        let filters = conditions(&query);
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].path(), "Event.Alert.ID");
        assert_eq!(filters[0].operator(), Operator::In);
        assert_eq!(filters[1].operator(), Operator::Between);
    }

    #[test]
    fn test_single_ordering_on_primary_time_field() {
        let query = compile(&AlertSearch::new().build().unwrap());
        assert_eq!(
            query.rows.ordering,
            vec![Ordering {
                path: "Alert.TimeUTC".to_string(),
                sort_order: SortDirection::Asc,
            }]
        );
        let query = compile(&EventSearch::new().build().unwrap());
        assert_eq!(query.rows.ordering.len(), 1);
        assert_eq!(query.rows.ordering[0].path, "Event.TimeUTC");
        assert_eq!(query.rows.ordering[0].sort_order, SortDirection::Desc);
    }

    #[test]
    fn test_columns_come_from_catalog() {
        let query = compile(
            &AlertSearch::new()
                .extra_fields(["Alert.Status.Name"])
                .build()
                .unwrap(),
        );
        let mut expected = AlertAttributes::base_columns();
        expected.push("Alert.Status.Name".to_string());
        assert_eq!(query.rows.columns, expected);
    }
}
