//! Reshaping of raw responses into records.

use crate::traits::{ConnectorError, ConnectorResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One result row keyed by column name, in column order.
pub type Record = Map<String, Value>;

/// Tabular search result: positional rows aligned to `columns`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Zips every row with the column list.
    pub fn records(&self) -> ConnectorResult<Vec<Record>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                if row.len() != self.columns.len() {
                    return Err(ConnectorError::Mapping(format!(
                        "Row {} has {} values but the result has {} columns",
                        index,
                        row.len(),
                        self.columns.len()
                    )));
                }
                Ok(self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect())
            })
            .collect()
    }
}

/// `{id, name}` pair from an enum lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumItem {
    pub id: Value,
    pub name: Value,
}

/// Raw enum lookup entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnumEntry {
    #[serde(default)]
    data_field: Value,
    #[serde(default)]
    display_field: Value,
}

/// Reshapes an enum lookup response (a JSON list) into `{id, name}` pairs.
///
/// Entries lacking either field map to `null` for that side.
pub fn map_enum(entries: &[Value]) -> ConnectorResult<Vec<EnumItem>> {
    entries
        .iter()
        .map(|entry| {
            let entry: EnumEntry = serde_json::from_value(entry.clone()).map_err(|e| {
                ConnectorError::Mapping(format!("Enum entry is not an object: {}", e))
            })?;
            Ok(EnumItem {
                id: entry.data_field,
                name: entry.display_field,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_zip_columns_and_rows() {
        let results: ResultSet =
            serde_json::from_value(json!({ "columns": ["x", "y"], "rows": [[1, 2]] })).unwrap();
        let records = results.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(Value::Object(records[0].clone()), json!({ "x": 1, "y": 2 }));
    }

    #[test]
    fn test_records_keep_column_order() {
        let results = ResultSet::new(
            vec!["z".to_string(), "a".to_string(), "m".to_string()],
            vec![vec![json!(1), json!(2), json!(3)]],
        );
        let records = results.records().unwrap();
        let keys: Vec<&str> = records[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(
            serde_json::to_string(&records[0]).unwrap(),
            r#"{"z":1,"a":2,"m":3}"#
        );
    }

    #[test]
    fn test_records_arity_mismatch() {
        let results = ResultSet::new(
            vec!["x".to_string(), "y".to_string()],
            vec![vec![json!(1), json!(2)], vec![json!(3)]],
        );
        let err = results.records().unwrap_err();
        assert!(matches!(err, ConnectorError::Mapping(ref m) if m.contains("Row 1")));
    }

    #[test]
    fn test_empty_result() {
        let results: ResultSet = serde_json::from_value(json!({})).unwrap();
        assert!(results.is_empty());
        assert!(results.records().unwrap().is_empty());
    }

    #[test]
    fn test_threat_model_mapping() {
        let items = map_enum(&[json!({ "dataField": "1", "displayField": "Rule A" })]).unwrap();
        assert_eq!(
            items,
            vec![EnumItem {
                id: json!("1"),
                name: json!("Rule A"),
            }]
        );
    }

    #[test]
    fn test_enum_missing_fields_are_null() {
        let items = map_enum(&[json!({ "dataField": 7 })]).unwrap();
        assert_eq!(items[0].id, json!(7));
        assert_eq!(items[0].name, Value::Null);
    }

    #[test]
    fn test_enum_entry_must_be_object() {
        assert!(matches!(
            map_enum(&[json!("oops")]),
            Err(ConnectorError::Mapping(_))
        ));
    }
}
