//! Rows read back from the backend after an insert

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// A generic key-value record, in the column order the backend returned
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    values: Map<String, Value>,
}

impl Row {
    /// Wraps an already-decoded record
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Raw JSON value of a column
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Text column
    pub fn string(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    /// Integer column
    pub fn int(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }

    /// Floating-point column; integers widen
    pub fn float(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(Value::as_f64)
    }

    /// Boolean column; SQLite's 0/1 integers are accepted
    pub fn bool(&self, column: &str) -> Option<bool> {
        match self.get(column)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|i| i != 0),
            _ => None,
        }
    }

    /// UUID column (stored as text)
    pub fn uuid(&self, column: &str) -> Option<Uuid> {
        self.string(column).and_then(|s| Uuid::parse_str(s).ok())
    }

    /// Timestamp column (stored as RFC 3339 text)
    ///
    /// Timestamps without an offset are read as UTC.
    pub fn time(&self, column: &str) -> Option<DateTime<Utc>> {
        let s = self.string(column)?;
        match DateTime::parse_from_rfc3339(s) {
            Ok(d) => Some(d.with_timezone(&Utc)),
            Err(_) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|d| d.and_utc()),
        }
    }

    /// JSON column; text columns holding JSON are decoded
    pub fn json(&self, column: &str) -> Option<Value> {
        match self.get(column)? {
            Value::String(s) => serde_json::from_str(s).ok(),
            Value::Null => None,
            other => Some(other.clone()),
        }
    }

    /// Whether the column is missing or `NULL`
    pub fn is_null(&self, column: &str) -> bool {
        self.get(column).map_or(true, Value::is_null)
    }

    /// Column names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Unwraps the record
    pub fn into_inner(self) -> Map<String, Value> {
        self.values
    }
}

impl From<Map<String, Value>> for Row {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row() -> Row {
        let Value::Object(map) = json!({
            "id": "2f1d6a3e-8c1b-4c59-9f0e-3c8a2c0f4b71",
            "age": 40,
            "active": 1,
            "meta": "{\"tier\":2}",
            "created": "2024-01-01T00:00:00+00:00",
            "bio": null,
        }) else {
            unreachable!()
        };
        Row::new(map)
    }

    #[test]
    fn test_typed_getters() {
        let row = row();
        assert!(row.uuid("id").is_some());
        assert_eq!(row.int("age"), Some(40));
        assert_eq!(row.float("age"), Some(40.0));
        assert_eq!(row.bool("active"), Some(true));
        assert_eq!(row.json("meta"), Some(json!({"tier": 2})));
        assert!(row.time("created").is_some());
        assert!(row.is_null("bio"));
        assert!(row.is_null("missing"));
    }

    #[test]
    fn test_time_without_offset_is_utc() {
        let Value::Object(map) = json!({"at": "2024-03-01T12:30:00.25"}) else {
            unreachable!()
        };
        let at = Row::new(map).time("at").unwrap();
        assert_eq!(at.to_rfc3339(), "2024-03-01T12:30:00.250+00:00");
    }

    #[test]
    fn test_columns_keep_backend_order() {
        let binding = row();
        let columns: Vec<&str> = binding.columns().collect();
        assert_eq!(columns, vec!["id", "age", "active", "meta", "created", "bio"]);
    }
}
