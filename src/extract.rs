//! Source Extract Module
//!
//! Point-in-time reads of a tracked source table. An extract is the full
//! set of live rows for one entity type at the moment the scheduler ran -
//! the snapshot engine only ever reads it.

use crate::error::{not_found_error, validation_error, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::debug;

/// One live source row: a stable natural id plus its column values.
/// Column values are kept as JSON scalars; which of them drive versioning
/// is decided later by the snapshot options, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRow {
    pub id: String,
    pub values: BTreeMap<String, Value>,
}

impl SourceRow {
    pub fn new(id: impl Into<String>, values: BTreeMap<String, Value>) -> Self {
        Self {
            id: id.into(),
            values,
        }
    }

    /// Value of a column, treating an absent column as SQL null
    pub fn value(&self, column: &str) -> &Value {
        self.values.get(column).unwrap_or(&Value::Null)
    }
}

/// Parse an extract from its JSON representation: an array of flat objects.
/// `key_column` names the field carrying the natural id (string or integer
/// accepted); the remaining fields become the row's column values.
pub fn parse_extract(raw: &str, key_column: &str) -> AppResult<Vec<SourceRow>> {
    let objects: Vec<BTreeMap<String, Value>> = serde_json::from_str(raw)?;

    let mut rows = Vec::with_capacity(objects.len());
    let mut seen_ids: HashSet<String> = HashSet::new();

    for (index, mut object) in objects.into_iter().enumerate() {
        let id = match object.remove(key_column) {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Null) | None => {
                return Err(validation_error(format!(
                    "Extract row {} is missing key column '{}'",
                    index, key_column
                )));
            }
            Some(other) => {
                return Err(validation_error(format!(
                    "Extract row {} has non-scalar key '{}': {}",
                    index, key_column, other
                )));
            }
        };

        if !seen_ids.insert(id.clone()) {
            return Err(validation_error(format!(
                "Extract contains duplicate id '{}'",
                id
            )));
        }

        rows.push(SourceRow::new(id, object));
    }

    debug!("Parsed extract: {} rows", rows.len());
    Ok(rows)
}

/// Load an extract file from disk. A missing file is reported as NotFound -
/// it is never interpreted as "source is empty".
pub fn load_extract(path: &Path, key_column: &str) -> AppResult<Vec<SourceRow>> {
    if !path.exists() {
        return Err(not_found_error(format!(
            "Extract file not found: {}",
            path.display()
        )));
    }
    let raw = std::fs::read_to_string(path)?;
    parse_extract(&raw, key_column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use serde_json::json;

    #[test]
    fn test_parse_extract_splits_key_from_values() {
        let raw = r#"[
            {"id": 7, "city": "Lyon", "tier": "gold"},
            {"id": "8", "city": null, "tier": "silver"}
        ]"#;
        let rows = parse_extract(raw, "id").unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "7");
        assert_eq!(rows[0].value("city"), &json!("Lyon"));
        assert_eq!(rows[1].id, "8");
        assert_eq!(rows[1].value("city"), &Value::Null);
        // Absent column reads as null
        assert_eq!(rows[1].value("region"), &Value::Null);
    }

    #[test]
    fn test_parse_extract_honors_custom_key_column() {
        let raw = r#"[{"customer_id": 42, "city": "Turin"}]"#;
        let rows = parse_extract(raw, "customer_id").unwrap();
        assert_eq!(rows[0].id, "42");
        assert!(!rows[0].values.contains_key("customer_id"));
    }

    #[test]
    fn test_parse_extract_rejects_duplicate_ids() {
        let raw = r#"[{"id": 1, "a": 1}, {"id": 1, "a": 2}]"#;
        let err = parse_extract(raw, "id").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_parse_extract_rejects_missing_key() {
        let raw = r#"[{"city": "Oslo"}]"#;
        let err = parse_extract(raw, "id").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let raw_null = r#"[{"id": null, "city": "Oslo"}]"#;
        let err = parse_extract(raw_null, "id").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_load_extract_missing_file_is_not_found() {
        let err = load_extract(Path::new("/nonexistent/extract.json"), "id").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
