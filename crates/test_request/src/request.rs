//! Fabricated requests
//!
//! [`RequestBuilder`] is a value: every method consumes the builder and
//! returns a new one, so a partially configured builder can be cloned and
//! branched without the branches affecting each other.

use std::convert::Infallible;
use std::future::Future;

use axum::body::Body;
use axum::http::{Extensions, HeaderName, HeaderValue, Method, Request};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tower::{Service, ServiceExt};
use tracing::debug;
use url::Url;

use crate::response::TestResponse;

/// Host used when the builder doesn't set one
pub const DEFAULT_HOST: &str = "test.local";

const CONTENT_TYPE: &str = "content-type";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Starts a GET request to `/`
pub fn req() -> RequestBuilder {
    RequestBuilder::new()
}

/// Accumulates the parts of a request to send to a handler
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    host: Option<String>,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: String,
    extensions: Extensions,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    /// A GET request to `/` with no headers or body
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            host: None,
            path: "/".to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body: String::new(),
            extensions: Extensions::new(),
        }
    }

    /// Sets the path
    ///
    /// A query string in `path` is kept and sent ahead of the pairs added
    /// with [`query`](Self::query).
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the HTTP method
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets a header, replacing any previous value for the same name
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Appends a query parameter; repeated keys are kept
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Appends every pair as a query parameter
    pub fn query_map<K, V, I>(self, pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        pairs
            .into_iter()
            .fold(self, |builder, (key, value)| builder.query(key, value))
    }

    /// Sets the body verbatim
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the body to `value` encoded as JSON
    ///
    /// Also sets `content-type: application/json` unless a content type was
    /// already given.
    ///
    /// # Panics
    ///
    /// Panics if `value` fails to serialize
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.body = serde_json::to_string(value)
            .unwrap_or_else(|err| panic!("request body is not serializable: {}", err));
        if self.header_value(CONTENT_TYPE).is_none() {
            self.headers.push((CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string()));
        }
        self
    }

    fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Attaches a typed value to the request extensions
    pub fn extension<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    /// The path the request is sent to, without any query string
    pub fn route(&self) -> &str {
        self.split_path().0
    }

    fn split_path(&self) -> (&str, Option<&str>) {
        match self.path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (self.path.as_str(), None),
        }
    }

    /// Materializes the request
    ///
    /// # Panics
    ///
    /// Panics if the host, path or a header isn't valid
    pub fn conn(&self) -> Request<Body> {
        let host = self.host.as_deref().unwrap_or(DEFAULT_HOST);
        let mut url = Url::parse(&format!("http://{}", host))
            .unwrap_or_else(|err| panic!("invalid host '{}': {}", host, err));
        let (path, inline_query) = self.split_path();
        url.set_path(path);
        url.set_query(inline_query);
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }

        let mut request = Request::new(Body::from(self.body.clone()));
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = url
            .as_str()
            .parse()
            .unwrap_or_else(|err| panic!("invalid uri '{}': {}", url, err));
        *request.extensions_mut() = self.extensions.clone();

        let headers = request.headers_mut();
        for (name, value) in &self.headers {
            let name = HeaderName::try_from(name.as_str())
                .unwrap_or_else(|err| panic!("invalid header name '{}': {}", name, err));
            let value = HeaderValue::try_from(value.as_str())
                .unwrap_or_else(|err| panic!("invalid header value '{}': {}", value, err));
            headers.insert(name, value);
        }

        request
    }

    /// Sends the request through a service, such as an `axum::Router`
    pub async fn request<S>(self, service: S) -> TestResponse
    where
        S: Service<Request<Body>, Response = Response, Error = Infallible>,
    {
        let request = self.conn();
        let (method, uri) = (request.method().clone(), request.uri().clone());

        let response = match service.oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };

        debug!(method = %method, uri = %uri, status = response.status().as_u16(), "test request dispatched");
        TestResponse::capture(response).await
    }

    /// Sends the request to a plain async handler
    pub async fn request_fn<F, Fut, R>(self, handler: F) -> TestResponse
    where
        F: FnOnce(Request<Body>) -> Fut,
        Fut: Future<Output = R>,
        R: IntoResponse,
    {
        let request = self.conn();
        let (method, uri) = (request.method().clone(), request.uri().clone());

        let response = handler(request).await.into_response();

        debug!(method = %method, uri = %uri, status = response.status().as_u16(), "test request dispatched");
        TestResponse::capture(response).await
    }

    /// Sends a GET through `service`
    pub async fn get<S>(self, service: S) -> TestResponse
    where
        S: Service<Request<Body>, Response = Response, Error = Infallible>,
    {
        self.method(Method::GET).request(service).await
    }

    /// Sends a POST through `service`
    pub async fn post<S>(self, service: S) -> TestResponse
    where
        S: Service<Request<Body>, Response = Response, Error = Infallible>,
    {
        self.method(Method::POST).request(service).await
    }

    /// Sends a PUT through `service`
    pub async fn put<S>(self, service: S) -> TestResponse
    where
        S: Service<Request<Body>, Response = Response, Error = Infallible>,
    {
        self.method(Method::PUT).request(service).await
    }

    /// Sends a DELETE through `service`
    pub async fn delete<S>(self, service: S) -> TestResponse
    where
        S: Service<Request<Body>, Response = Response, Error = Infallible>,
    {
        self.method(Method::DELETE).request(service).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request = req().conn();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.uri().to_string(), "http://test.local/");
    }

    #[test]
    fn test_query_is_encoded_and_repeatable() {
        let request = req()
            .path("/search")
            .query("q", "a b&c")
            .query_map([("tag", "x"), ("tag", "y")])
            .conn();
        assert_eq!(request.uri().path(), "/search");
        assert_eq!(request.uri().query(), Some("q=a+b%26c&tag=x&tag=y"));
    }

    #[test]
    fn test_query_in_path_is_merged() {
        let builder = req().path("/users?id=1").query("page", "2");
        let request = builder.conn();
        assert_eq!(request.uri().path(), "/users");
        assert_eq!(request.uri().query(), Some("id=1&page=2"));
        assert_eq!(builder.route(), "/users");
    }

    #[test]
    fn test_json_sets_content_type() {
        let request = req().json(&serde_json::json!({"a": 1})).conn();
        assert_eq!(request.headers()["content-type"], "application/json");

        let request = req()
            .header("Content-Type", "application/vnd.api+json")
            .json(&serde_json::json!({"a": 1}))
            .conn();
        assert_eq!(request.headers().get_all("content-type").iter().count(), 1);
        assert_eq!(request.headers()["content-type"], "application/vnd.api+json");
    }

    #[test]
    fn test_header_replaces_case_insensitively() {
        let request = req()
            .header("X-Project", "a")
            .header("x-project", "b")
            .host("api.example.com")
            .conn();
        assert_eq!(request.headers().get_all("x-project").iter().count(), 1);
        assert_eq!(request.headers()["x-project"], "b");
        assert_eq!(request.uri().host(), Some("api.example.com"));
    }

    #[test]
    fn test_branches_do_not_share_state() {
        let base = req().path("/users").header("x-user", "1");
        let with_query = base.clone().query("page", "2");
        assert!(base.conn().uri().query().is_none());
        assert_eq!(with_query.conn().uri().query(), Some("page=2"));
    }

    #[test]
    fn test_extensions_are_attached() {
        #[derive(Clone, Debug, PartialEq)]
        struct UserId(u32);

        let request = req().extension(UserId(7)).conn();
        assert_eq!(request.extensions().get::<UserId>(), Some(&UserId(7)));
    }
}
