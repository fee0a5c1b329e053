//! Wire schema of a search job (`POST /api/search/v2/search`).
//!
//! The platform accepts a nested filter tree, but searches built here only ever
//! use a single AND group, so the filter is a flat list of [`Condition`]s.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key of the human-readable duplicate carried by condition values.
pub const DISPLAY_VALUE_KEY: &str = "displayValue";

/// Suffix marking the upper bound of a `Between` value pair.
pub const BETWEEN_UPPER_SUFFIX: &str = "0";

/// `filterOperator` code of a conjunctive group.
pub const FILTER_OPERATOR_AND: u8 = 0;

/// Compiled search job body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireQuery {
    pub query: QueryBlock,
    pub rows: RowsBlock,
    pub request_params: RequestParams,
}

impl WireQuery {
    /// Top-level keys whose joint presence marks a JSON object as a wire query.
    pub const TOP_LEVEL_KEYS: [&'static str; 3] = ["query", "rows", "requestParams"];
}

/// Body submitted to the search endpoint.
///
/// Caller-supplied wire JSON stays a raw [`Value`] so that keys and operators
/// this crate does not model reach the platform byte-for-byte.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireRequest {
    Compiled(WireQuery),
    Raw(Value),
}

impl WireRequest {
    /// `query.entityName`, when present.
    pub fn entity_name(&self) -> Option<&str> {
        match self {
            WireRequest::Compiled(query) => Some(&query.query.entity_name),
            WireRequest::Raw(value) => value.pointer("/query/entityName").and_then(Value::as_str),
        }
    }
}

impl From<WireQuery> for WireRequest {
    fn from(query: WireQuery) -> Self {
        WireRequest::Compiled(query)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBlock {
    pub entity_name: String,
    pub filter: FilterGroup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterGroup {
    pub filter_operator: u8,
    pub filters: Vec<Condition>,
}

impl FilterGroup {
    /// An empty AND group.
    pub fn and() -> Self {
        Self {
            filter_operator: FILTER_OPERATOR_AND,
            filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsBlock {
    pub columns: Vec<String>,
    #[serde(default)]
    pub filter: Vec<Value>,
    #[serde(default)]
    pub grouping: String,
    pub ordering: Vec<Ordering>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ordering {
    pub path: String,
    pub sort_order: SortDirection,
}

/// Sort direction as spelled on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Fixed metadata identifying the call as an interactive UI search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParams {
    pub search_source: u32,
    pub search_source_name: String,
}

impl Default for RequestParams {
    fn default() -> Self {
        Self {
            search_source: 1,
            search_source_name: "MainTab".to_string(),
        }
    }
}

/// Condition operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Equals,
    Between,
    LastDays,
    In,
}

/// One entry of an `In` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct InValue {
    pub value: Value,
    pub display: Option<Value>,
}

impl InValue {
    /// Entry whose display value duplicates the raw value.
    pub fn mirrored(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            display: Some(value.clone()),
            value,
        }
    }

    pub fn with_display(value: impl Into<Value>, display: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            display: Some(display.into()),
        }
    }
}

/// One node of the AND list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition", into = "RawCondition")]
pub enum Condition {
    Equals {
        path: String,
        value: Value,
    },
    /// Inclusive range; upper bound travels under `path` + [`BETWEEN_UPPER_SUFFIX`].
    Between {
        path: String,
        lower: Value,
        upper: Value,
    },
    LastDays {
        path: String,
        days: u32,
    },
    In {
        path: String,
        values: Vec<InValue>,
    },
}

impl Condition {
    pub fn path(&self) -> &str {
        match self {
            Condition::Equals { path, .. }
            | Condition::Between { path, .. }
            | Condition::LastDays { path, .. }
            | Condition::In { path, .. } => path,
        }
    }

    pub fn operator(&self) -> Operator {
        match self {
            Condition::Equals { .. } => Operator::Equals,
            Condition::Between { .. } => Operator::Between,
            Condition::LastDays { .. } => Operator::LastDays,
            Condition::In { .. } => Operator::In,
        }
    }
}

/// Generic `{path, operator, values}` shape used for (de)serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCondition {
    path: String,
    operator: Operator,
    values: Vec<Map<String, Value>>,
}

fn entry(path: &str, value: Value, display: Option<Value>) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(path.to_string(), value);
    if let Some(display) = display {
        map.insert(DISPLAY_VALUE_KEY.to_string(), display);
    }
    map
}

impl From<Condition> for RawCondition {
    fn from(condition: Condition) -> Self {
        let operator = condition.operator();
        match condition {
            Condition::Equals { path, value } => RawCondition {
                values: vec![entry(&path, value, None)],
                path,
                operator,
            },
            Condition::Between { path, lower, upper } => {
                let mut pair = Map::new();
                pair.insert(path.clone(), lower);
                pair.insert(format!("{}{}", path, BETWEEN_UPPER_SUFFIX), upper);
                RawCondition {
                    values: vec![pair],
                    path,
                    operator,
                }
            }
            Condition::LastDays { path, days } => RawCondition {
                values: vec![entry(&path, Value::from(days), Some(Value::from(days)))],
                path,
                operator,
            },
            Condition::In { path, values } => RawCondition {
                values: values
                    .into_iter()
                    .map(|v| entry(&path, v.value, v.display))
                    .collect(),
                path,
                operator,
            },
        }
    }
}

impl TryFrom<RawCondition> for Condition {
    type Error = String;

    fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
        let RawCondition {
            path,
            operator,
            mut values,
        } = raw;
        let first = |values: &mut Vec<Map<String, Value>>| {
            if values.is_empty() {
                Err(format!("{:?} condition on '{}' has no values", operator, path))
            } else {
                Ok(values.swap_remove(0))
            }
        };

        match operator {
            Operator::Equals => {
                let mut value = first(&mut values)?;
                let value = value
                    .remove(&path)
                    .ok_or_else(|| format!("Equals condition is missing key '{}'", path))?;
                Ok(Condition::Equals { path, value })
            }
            Operator::Between => {
                let mut pair = first(&mut values)?;
                let upper_key = format!("{}{}", path, BETWEEN_UPPER_SUFFIX);
                let lower = pair
                    .remove(&path)
                    .ok_or_else(|| format!("Between condition is missing key '{}'", path))?;
                let upper = pair
                    .remove(&upper_key)
                    .ok_or_else(|| format!("Between condition is missing key '{}'", upper_key))?;
                Ok(Condition::Between { path, lower, upper })
            }
            Operator::LastDays => {
                let value = first(&mut values)?;
                let days = value
                    .get(&path)
                    .and_then(Value::as_u64)
                    .and_then(|d| u32::try_from(d).ok())
                    .ok_or_else(|| format!("LastDays condition on '{}' needs a day count", path))?;
                Ok(Condition::LastDays { path, days })
            }
            Operator::In => {
                let values = values
                    .into_iter()
                    .map(|mut item| {
                        let value = item
                            .remove(&path)
                            .ok_or_else(|| format!("In value is missing key '{}'", path))?;
                        Ok(InValue {
                            value,
                            display: item.remove(DISPLAY_VALUE_KEY),
                        })
                    })
                    .collect::<Result<Vec<_>, String>>()?;
                Ok(Condition::In { path, values })
            }
        }
    }
}
