//! Validation Port
//!
//! A narrow capability trait that validation results implement so the
//! `test_assert` matcher can inspect them without depending on the crate that
//! defines them.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────┐
//! │   validation crate   │        │     test_assert      │
//! │  (system under test) │        │ (Validation matcher) │
//! └──────────┬───────────┘        └──────────┬───────────┘
//!            │ implements                    │ consumes
//!            ▼                               ▼
//!        ┌──────────────────────────────────────┐
//!        │     validation_port::ErrorSource     │
//!        └──────────────────────────────────────┘
//! ```
//!
//! The matcher only sees the serialized projection of the errors, decoded
//! into [`InvalidRecord`]s. The concrete error type never crosses the seam.
//!
//! # Example
//!
//! ```rust
//! use serde::Serialize;
//! use validation_port::ErrorSource;
//!
//! #[derive(Serialize)]
//! struct Invalid {
//!     field: String,
//!     code: u32,
//! }
//!
//! struct ValidationResult {
//!     errors: Vec<Invalid>,
//! }
//!
//! impl ErrorSource for ValidationResult {
//!     type Error = Invalid;
//!
//!     fn errors(&self) -> &[Invalid] {
//!         &self.errors
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Anything that exposes a list of serializable validation errors
pub trait ErrorSource {
    /// The concrete error type; only its serialized form is ever inspected
    type Error: Serialize;

    /// Returns the errors accumulated by the validation run
    fn errors(&self) -> &[Self::Error];
}

impl<E: Serialize> ErrorSource for Vec<E> {
    type Error = E;

    fn errors(&self) -> &[E] {
        self
    }
}

impl<E: Serialize> ErrorSource for [E] {
    type Error = E;

    fn errors(&self) -> &[E] {
        self
    }
}

impl<T: ErrorSource + ?Sized> ErrorSource for &T {
    type Error = T::Error;

    fn errors(&self) -> &[T::Error] {
        (**self).errors()
    }
}

/// Loosely-typed projection of a single validation error
///
/// Every validation error type is expected to serialize to (a superset of)
/// this shape. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidRecord {
    /// Field the error is attached to; `None` for fieldless errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Application-level error code
    pub code: i64,

    /// Structured payload (e.g. `{"max": 10}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,

    /// Human readable message
    #[serde(default, rename = "error", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl InvalidRecord {
    /// Creates a record for a field with a code and nothing else
    pub fn new(field: impl Into<String>, code: i64) -> Self {
        Self {
            field: Some(field.into()),
            code,
            data: None,
            message: None,
        }
    }

    /// Sets the data payload
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    /// Sets the message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// The field name, with an absent field reported as `""`
    pub fn field_or_empty(&self) -> &str {
        self.field.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_decodes_message_from_error_key() {
        let record: InvalidRecord = serde_json::from_value(json!({
            "field": "name",
            "code": 1001,
            "error": "required",
        }))
        .unwrap();

        assert_eq!(record.field.as_deref(), Some("name"));
        assert_eq!(record.code, 1001);
        assert_eq!(record.message.as_deref(), Some("required"));
        assert!(record.data.is_none());
    }

    #[test]
    fn test_record_ignores_unknown_keys() {
        let record: InvalidRecord =
            serde_json::from_value(json!({"code": 3, "severity": "high"})).unwrap();
        assert_eq!(record.code, 3);
        assert_eq!(record.field_or_empty(), "");
    }

    #[test]
    fn test_vec_is_an_error_source() {
        let errors = vec![InvalidRecord::new("age", 7)];
        assert_eq!(ErrorSource::errors(&errors).len(), 1);
        assert_eq!(ErrorSource::errors(&&errors)[0].code, 7);
    }
}
