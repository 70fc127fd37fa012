//! Validation Error Matcher
//!
//! Asserts on the errors of any validation result that implements
//! [`ErrorSource`]. The errors are serialized and re-read as generic
//! [`InvalidRecord`]s, so this crate never names the concrete error type of
//! the crate under test.
//!
//! ```rust
//! use serde_json::json;
//! use test_assert::{InvalidRecord, Validation};
//!
//! let errors = vec![
//!     InvalidRecord::new("name", 5),
//!     InvalidRecord::new("age", 7).with_data(json!({"max": 10}).as_object().unwrap().clone()),
//! ];
//!
//! Validation::new(&errors)
//!     .field("name", 5)
//!     .field("age", (7, json!({"max": 10})))
//!     .fields_have_no_errors(&["email"]);
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use validation_port::{ErrorSource, InvalidRecord};

/// The code and optional data a validation error is expected to carry
#[derive(Debug, Clone, PartialEq)]
pub struct Expect {
    code: i64,
    data: Option<Map<String, Value>>,
}

impl Expect {
    /// Expects an error with this code and no data
    pub fn code(code: i64) -> Self {
        Self { code, data: None }
    }

    /// Expects the given data alongside the code
    ///
    /// # Panics
    ///
    /// Panics if `data` is not a JSON object
    pub fn with_data(mut self, data: Value) -> Self {
        match data {
            Value::Object(map) => self.data = Some(map),
            Value::Null => self.data = None,
            other => panic!("validation data must be an object, got: {}", other),
        }
        self
    }

    /// Derives the expectation from anything that serializes to `{code, data?}`
    ///
    /// Lets tests pass typed validation constants instead of repeating
    /// their codes by hand.
    ///
    /// # Panics
    ///
    /// Panics if the value does not serialize or has no numeric `code`
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Self {
        let value = serde_json::to_value(value)
            .unwrap_or_else(|err| panic!("expectation is not serializable: {}", err));

        let code = match value.get("code") {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or_else(|| panic!("expectation code is out of range: {}", n)),
            _ => panic!("expectation has no numeric code: {}", value),
        };

        Self {
            code,
            data: value.get("data").and_then(Value::as_object).cloned(),
        }
    }

    /// The expected code
    pub fn expected_code(&self) -> i64 {
        self.code
    }

    fn matches(&self, record: &InvalidRecord) -> bool {
        if record.code != self.code {
            return false;
        }
        match (&record.data, &self.data) {
            (None, None) => true,
            (Some(actual), Some(expected)) => maps_equal(actual, expected),
            _ => false,
        }
    }
}

macro_rules! expect_from_code {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Expect {
                fn from(code: $t) -> Self {
                    Expect::code(i64::from(code))
                }
            }

            impl From<($t, Value)> for Expect {
                fn from((code, data): ($t, Value)) -> Self {
                    Expect::code(i64::from(code)).with_data(data)
                }
            }
        )*
    };
}

expect_from_code!(i32, i64, u16, u32);

/// Matcher over the errors of a single validation result
#[derive(Debug, Clone)]
pub struct Validation {
    json: String,
    errors: Vec<InvalidRecord>,
}

impl Validation {
    /// Captures the errors of `result`
    ///
    /// # Panics
    ///
    /// Panics if the errors don't serialize to a list of `{field?, code, data?, error?}`
    /// records. That is a bug in the test setup, not an assertion failure.
    pub fn new<R: ErrorSource + ?Sized>(result: &R) -> Self {
        let json = serde_json::to_string_pretty(result.errors())
            .unwrap_or_else(|err| panic!("validation errors are not serializable: {}", err));
        let errors: Vec<InvalidRecord> = serde_json::from_str(&json)
            .unwrap_or_else(|err| panic!("validation errors have an unexpected shape: {}", err));

        Self { json, errors }
    }

    /// The captured records, in their original order
    pub fn errors(&self) -> &[InvalidRecord] {
        &self.errors
    }

    /// Asserts there is an error without a field matching `expect`
    #[track_caller]
    pub fn fieldless(&self, expect: impl Into<Expect>) -> &Self {
        self.field("", expect)
    }

    /// Asserts there is an error on `field` matching `expect`
    ///
    /// `expect` can be a bare code (`5`), a code with data
    /// (`(7, json!({"max": 10}))`) or an [`Expect`] built with [`Expect::of`].
    /// An empty `field` matches errors without a field.
    #[track_caller]
    pub fn field(&self, field: &str, expect: impl Into<Expect>) -> &Self {
        let expect = expect.into();

        let found = self
            .errors
            .iter()
            .any(|record| record.field_or_empty() == field && expect.matches(record));
        if found {
            return self;
        }

        let mut message = String::from("\nexpected validation error:\n");
        if !field.is_empty() {
            message.push_str(&format!("  field={}\n", field));
        }
        message.push_str(&format!("  code={}\n", expect.code));
        let data = expect
            .data
            .as_ref()
            .map_or_else(|| "null".to_string(), |d| Value::Object(d.clone()).to_string());
        message.push_str(&format!("  data={}\n\n", data));
        message.push_str(&format!("got: {}", self.json));
        panic!("{}", message);
    }

    /// Asserts there is an error on `field` with exactly this message
    #[track_caller]
    pub fn field_message(&self, field: &str, expected_message: &str) -> &Self {
        let found = self.errors.iter().any(|record| {
            record.field_or_empty() == field && record.message.as_deref() == Some(expected_message)
        });
        if !found {
            panic!(
                "\nexpected validation error message:\n  field={}\n  message={}\ngot: {}",
                field, expected_message, self.json
            );
        }
        self
    }

    /// Asserts none of `fields` has an error; fieldless errors are ignored
    #[track_caller]
    pub fn fields_have_no_errors(&self, fields: &[&str]) -> &Self {
        for record in &self.errors {
            let Some(field) = record.field.as_deref() else {
                continue;
            };
            if fields.contains(&field) {
                let got = serde_json::to_string(record).unwrap_or_else(|_| format!("{:?}", record));
                panic!("Expected no error for field '{}', but got:\n{}", field, got);
            }
        }
        self
    }
}

/// Deep equality where numbers compare by value (`10 == 10.0`)
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => maps_equal(x, y),
        _ => a == b,
    }
}

fn maps_equal(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| values_equal(value, other)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Vec<Value> {
        vec![
            json!({"field": "name", "code": 5}),
            json!({"field": "age", "code": 7, "data": {"max": 10}}),
            json!({"code": 9, "error": "request body too large"}),
        ]
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert!(values_equal(&json!({"max": 10}), &json!({"max": 10.0})));
        assert!(!values_equal(&json!({"max": 10}), &json!({"max": 11})));
        assert!(!values_equal(&json!({"max": 10}), &json!({"max": 10, "min": 1})));
    }

    #[test]
    fn test_expect_of_reads_code_and_data() {
        let expect = Expect::of(&json!({"code": 1002, "data": {"min": 3}, "error": "too short"}));
        assert_eq!(expect.expected_code(), 1002);
        assert_eq!(expect.data, json!({"min": 3}).as_object().cloned());
    }

    #[test]
    fn test_fieldless_matches_records_without_field() {
        Validation::new(&sample()).fieldless(9);
    }

    #[test]
    #[should_panic(expected = "got: [")]
    fn test_failure_dumps_all_errors() {
        Validation::new(&sample()).field("email", 1);
    }

    #[test]
    #[should_panic(expected = "unexpected shape")]
    fn test_malformed_errors_are_fatal() {
        Validation::new(&vec![json!({"field": "name"})]);
    }
}
