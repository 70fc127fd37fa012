//! Tests for dispatching requests through routers and plain handlers

use std::collections::HashMap;

use axum::{
    body::Body,
    extract::{Path, Query},
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use test_request::{req, TestResponse, VALIDATION_CODE};
use thiserror::Error;
use validation_port::InvalidRecord;

const UNAUTHORIZED: i64 = 1001;
const NOT_FOUND: i64 = 1004;

/// Error shape of the application under test
#[derive(Debug, Error)]
enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Validation failed")]
    Validation(Vec<InvalidRecord>),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({"code": NOT_FOUND, "error": format!("{} not found", what)}),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({"code": UNAUTHORIZED, "error": "unauthorized"}),
            ),
            ApiError::Validation(invalid) => (
                StatusCode::BAD_REQUEST,
                json!({"code": VALIDATION_CODE, "error": "invalid data", "invalid": invalid}),
            ),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Clone, Debug)]
struct CurrentUser(String);

async fn show_user(Path(id): Path<u32>) -> Result<Json<Value>, ApiError> {
    match id {
        1 => Ok(Json(json!({"id": 1, "name": "leto"}))),
        _ => Err(ApiError::NotFound("user".to_string())),
    }
}

async fn create_user(Json(body): Json<Value>) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut invalid = Vec::new();
    let name = body["name"].as_str().unwrap_or_default();
    if name.len() < 3 {
        invalid.push(InvalidRecord::new("name", 5).with_message("must be at least 3 characters"));
    }
    if body["age"].as_i64().unwrap_or_default() > 10 {
        let data = json!({"max": 10}).as_object().cloned().unwrap_or_default();
        invalid.push(InvalidRecord::new("age", 7).with_data(data));
    }
    if !invalid.is_empty() {
        return Err(ApiError::Validation(invalid));
    }
    Ok((StatusCode::CREATED, Json(body)))
}

async fn echo(Json(body): Json<Value>) -> Json<Value> {
    Json(body)
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Json<HashMap<String, String>> {
    Json(params)
}

async fn secure(headers: HeaderMap) -> Result<&'static str, ApiError> {
    match headers.get("authorization") {
        Some(token) if token == "Bearer sietch" => Ok("welcome"),
        _ => Err(ApiError::Unauthorized),
    }
}

async fn whoami(Extension(user): Extension<CurrentUser>) -> String {
    user.0
}

fn app() -> Router {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/:id", get(show_user))
        .route("/echo", post(echo))
        .route("/search", get(search))
        .route("/secure", get(secure))
        .route("/whoami", get(whoami))
}

mod routing {
    use super::*;

    #[tokio::test]
    async fn test_found_and_not_found() {
        let res = req().path("/users/1").get(app()).await;
        res.ok().header("Content-Type", "application/json");
        assert_eq!(res.json()["name"], "leto");

        req().path("/users/2")
            .get(app())
            .await
            .expect_not_found(NOT_FOUND)
            .expect_not_found(None);
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        let payload = json!({"spice": [1, 2, 3], "nested": {"flow": true}});
        let res = req().path("/echo").json(&payload).post(app()).await;
        res.ok();
        assert_eq!(res.json, Some(payload));
    }

    #[tokio::test]
    async fn test_query_reaches_the_handler() {
        let res = req()
            .path("/search")
            .query_map([("q", "sand worm"), ("page", "2")])
            .get(app())
            .await;
        assert_eq!(res.json(), json!({"q": "sand worm", "page": "2"}));
    }

    #[tokio::test]
    async fn test_headers_and_extensions() {
        req().path("/secure").get(app()).await.expect_not_authorized(UNAUTHORIZED);

        let res = req()
            .path("/secure")
            .header("Authorization", "Bearer sietch")
            .get(app())
            .await;
        res.ok();
        assert_eq!(res.body, "welcome");

        let res = req()
            .path("/whoami")
            .extension(CurrentUser("jessica".to_string()))
            .get(app())
            .await;
        assert_eq!(res.body, "jessica");
    }

    #[tokio::test]
    async fn test_created_counts_as_ok() {
        req().path("/users")
            .json(&json!({"name": "chani", "age": 9}))
            .post(app())
            .await
            .expect_status(201)
            .ok();
    }

    #[tokio::test]
    #[should_panic(expected = "Expect 200/201/204 status code, got: 404")]
    async fn test_ok_reports_the_status() {
        req().path("/users/9").get(app()).await.ok();
    }
}

mod validation {
    use super::*;

    async fn invalid_user() -> TestResponse {
        req().path("/users")
            .json(&json!({"name": "al", "age": 40}))
            .post(app())
            .await
    }

    #[tokio::test]
    async fn test_expected_codes_match() {
        let res = invalid_user().await;
        res.expect_invalid(VALIDATION_CODE);

        let grouped = res.expect_validation(&[("name", 5), ("age", 7)]);
        assert_eq!(grouped["name"].len(), 1);
        assert_eq!(grouped["age"][0]["data"], json!({"max": 10}));
    }

    #[tokio::test]
    #[should_panic(expected = "Expect validation code for field 'name' to be 6, got [5]")]
    async fn test_wrong_code_fails() {
        invalid_user().await.expect_validation(&[("name", 6)]);
    }

    #[tokio::test]
    #[should_panic(
        expected = "to be 6, got [5]\nExpect validation code for field 'email' to be 1, got []"
    )]
    async fn test_every_mismatch_is_reported() {
        invalid_user()
            .await
            .expect_validation(&[("name", 6), ("age", 7), ("email", 1)]);
    }
}

mod plain_handlers {
    use super::*;

    async fn teapot(request: Request<Body>) -> impl IntoResponse {
        let agent = request
            .headers()
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none")
            .to_string();
        (StatusCode::IM_A_TEAPOT, [("x-agent", agent)], "short and stout")
    }

    #[tokio::test]
    async fn test_request_fn() {
        let res = req().header("User-Agent", "thumper").request_fn(teapot).await;
        res.expect_status(418).header("X-Agent", "thumper");
        assert_eq!(res.content_length, "short and stout".len() as u64);
        assert!(res.json.is_none());
        assert!(res.error.is_none());
    }

    #[tokio::test]
    async fn test_capture_a_built_response() {
        let response = ApiError::NotFound("spice".to_string()).into_response();
        let res = TestResponse::capture(response).await;
        res.expect_not_found(NOT_FOUND);
        assert_eq!(res.json()["error"], "spice not found");
    }

    #[tokio::test]
    #[should_panic(expected = "response body is not JSON")]
    async fn test_strict_json_parse() {
        let res = req().request_fn(teapot).await;
        res.json();
    }
}
