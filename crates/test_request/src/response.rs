//! Captured responses and their assertions

use std::collections::HashMap;

use axum::response::Response;
use serde_json::Value;
use test_assert::assert;

/// Application code carried by validation failures
pub const VALIDATION_CODE: i64 = 20000;

/// A handler's response, read fully into memory
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: u16,
    /// Body as text (lossy UTF-8)
    pub body: String,
    /// Body parsed as JSON, if it was JSON
    pub json: Option<Value>,
    /// `content-length` header, or the body length when absent
    pub content_length: u64,
    /// Headers with lower-cased names; the last value wins for repeated names
    pub headers: HashMap<String, String>,
    /// Error returned by an env handler, if any
    pub error: Option<anyhow::Error>,
}

impl TestResponse {
    /// Captures a response built outside the request builder
    ///
    /// # Panics
    ///
    /// Panics if the body can't be read
    pub async fn capture(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .unwrap_or_else(|err| panic!("failed to read response body: {}", err));

        let body = String::from_utf8_lossy(&bytes).into_owned();
        // not every body is JSON; the test decides whether that matters
        let json = serde_json::from_str(&body).ok();

        let headers: HashMap<String, String> = parts
            .headers
            .iter()
            .map(|(name, value)| {
                let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
                (name.as_str().to_string(), value)
            })
            .collect();

        let content_length = headers
            .get("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(bytes.len() as u64);

        Self {
            status: parts.status.as_u16(),
            body,
            json,
            content_length,
            headers,
            error: None,
        }
    }

    /// The `code` field of the JSON body; float codes are truncated
    pub fn code(&self) -> Option<i64> {
        self.json.as_ref()?.get("code").and_then(as_code)
    }

    /// Asserts the status code
    #[track_caller]
    pub fn expect_status(&self, expected: u16) -> &Self {
        assert::equal(self.status, expected);
        self
    }

    /// Asserts the JSON body's application `code`
    #[track_caller]
    pub fn expect_code(&self, expected: i64) -> &Self {
        assert::equal(self.code(), Some(expected));
        self
    }

    /// Asserts a 404, and the application code when given
    #[track_caller]
    pub fn expect_not_found(&self, code: impl Into<Option<i64>>) -> &Self {
        self.expect_status_and_code(404, code.into())
    }

    /// Asserts a 401, and the application code when given
    #[track_caller]
    pub fn expect_not_authorized(&self, code: impl Into<Option<i64>>) -> &Self {
        self.expect_status_and_code(401, code.into())
    }

    /// Asserts a 400, and the application code when given
    #[track_caller]
    pub fn expect_invalid(&self, code: impl Into<Option<i64>>) -> &Self {
        self.expect_status_and_code(400, code.into())
    }

    #[track_caller]
    fn expect_status_and_code(&self, status: u16, code: Option<i64>) -> &Self {
        self.expect_status(status);
        if let Some(code) = code {
            self.expect_code(code);
        }
        self
    }

    /// Asserts a 200, 201 or 204
    #[track_caller]
    pub fn ok(&self) -> &Self {
        if !matches!(self.status, 200 | 201 | 204) {
            assert::fail(format!(
                "Expect 200/201/204 status code, got: {}\n{}",
                self.status, self.body
            ));
        }
        self
    }

    /// Asserts a header value; `name` is case-insensitive
    #[track_caller]
    pub fn header(&self, name: &str, expected: &str) -> &Self {
        let actual = self.headers.get(&name.to_ascii_lowercase()).map(String::as_str);
        assert::equal(actual, Some(expected));
        self
    }

    /// Parses the body as JSON
    ///
    /// # Panics
    ///
    /// Panics if the body isn't valid JSON
    #[track_caller]
    pub fn json(&self) -> Value {
        match serde_json::from_str(&self.body) {
            Ok(value) => value,
            Err(err) => assert::fail(format!("response body is not JSON ({}): {}", err, self.body)),
        }
    }

    /// Prints the status, headers and body
    pub fn inspect(&self) -> &Self {
        println!("status: {}", self.status);
        for (name, value) in &self.headers {
            println!("{} = {}", name, value);
        }
        println!("{}", self.body);
        self
    }

    /// Asserts a validation failure carrying every `(field, code)` pair
    ///
    /// Expects a 400 with application code [`VALIDATION_CODE`], groups the
    /// body's `invalid` array by field, and checks each expected pair against
    /// its field's group. Every mismatch is collected before failing, so one
    /// run reports them all. Returns the grouped errors.
    #[track_caller]
    pub fn expect_validation(&self, expected: &[(&str, i64)]) -> HashMap<String, Vec<Value>> {
        self.expect_status(400);
        self.expect_code(VALIDATION_CODE);

        let mut lookup: HashMap<String, Vec<Value>> = HashMap::new();
        let invalid = self
            .json
            .as_ref()
            .and_then(|json| json.get("invalid"))
            .and_then(Value::as_array);
        for error in invalid.into_iter().flatten() {
            let field = error.get("field").and_then(Value::as_str).unwrap_or_default();
            lookup.entry(field.to_string()).or_default().push(error.clone());
        }

        let mut mismatches = Vec::new();
        for (field, expected_code) in expected {
            let actual_codes: Vec<i64> = lookup
                .get(*field)
                .map(|errors| {
                    errors
                        .iter()
                        .filter_map(|e| e.get("code").and_then(as_code))
                        .collect()
                })
                .unwrap_or_default();

            if !actual_codes.contains(expected_code) {
                mismatches.push(format!(
                    "Expect validation code for field '{}' to be {}, got {:?}",
                    field, expected_code, actual_codes
                ));
            }
        }

        if !mismatches.is_empty() {
            assert::fail(mismatches.join("\n"));
        }
        lookup
    }
}

/// Reads an application code, accepting `20000.0` as `20000`
fn as_code(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::Json;
    use serde_json::json;

    async fn capture(status: StatusCode, body: Value) -> TestResponse {
        TestResponse::capture((status, Json(body)).into_response()).await
    }

    #[tokio::test]
    async fn test_float_codes_are_accepted() {
        let res = capture(StatusCode::NOT_FOUND, json!({"code": 1004.0})).await;
        assert_eq!(res.code(), Some(1004));
        res.expect_not_found(Some(1004));
    }

    #[tokio::test]
    async fn test_float_codes_in_validation_errors() {
        let body = json!({
            "code": 20000.0,
            "invalid": [{"field": "name", "code": 5.0}],
        });
        let res = capture(StatusCode::BAD_REQUEST, body).await;
        let grouped = res.expect_validation(&[("name", 5)]);
        assert_eq!(grouped["name"].len(), 1);
    }

    #[tokio::test]
    async fn test_missing_code() {
        let res = capture(StatusCode::OK, json!({"ok": true})).await;
        assert_eq!(res.code(), None);
        assert_eq!(res.content_length, res.body.len() as u64);
    }
}
