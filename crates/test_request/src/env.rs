//! Dispatch to handlers that take an application context
//!
//! Handlers of the shape `async fn(Request<Body>, E) -> Result<R, E::Error>`
//! get their context value alongside the request. The context decides how
//! the request is logged and how a handler error becomes a response.

use std::future::Future;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, Instrument, Span};

use crate::request::RequestBuilder;
use crate::response::TestResponse;

/// Application context handed to env-style handlers
///
/// Handlers receive their own clone; the original stays with the dispatcher
/// for the error hook.
pub trait Env: Clone {
    /// Error a handler may return
    type Error: std::error::Error + Send + Sync + 'static;

    /// Span the handler runs in
    fn request(&self, route: &str) -> Span;

    /// Turns a handler error into the response a client would see
    fn server_error(&self, err: &Self::Error) -> Response;
}

/// Starts a request that dispatches with `env`
pub fn req_env<E: Env>(env: E) -> EnvRequestBuilder<E> {
    EnvRequestBuilder {
        env,
        builder: RequestBuilder::new(),
    }
}

/// A [`RequestBuilder`] paired with the context it will be dispatched with
#[derive(Debug, Clone)]
pub struct EnvRequestBuilder<E> {
    env: E,
    builder: RequestBuilder,
}

impl<E: Env> EnvRequestBuilder<E> {
    /// Wraps an existing builder
    pub fn new(env: E, builder: RequestBuilder) -> Self {
        Self { env, builder }
    }

    fn map(self, f: impl FnOnce(RequestBuilder) -> RequestBuilder) -> Self {
        Self {
            env: self.env,
            builder: f(self.builder),
        }
    }

    /// Sets the path; a query string in it is kept
    pub fn path(self, path: impl Into<String>) -> Self {
        self.map(|b| b.path(path))
    }

    /// Sets the HTTP method
    pub fn method(self, method: Method) -> Self {
        self.map(|b| b.method(method))
    }

    /// Sets the host
    pub fn host(self, host: impl Into<String>) -> Self {
        self.map(|b| b.host(host))
    }

    /// Sets a header, replacing any previous value for the same name
    pub fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.map(|b| b.header(name, value))
    }

    /// Appends a query parameter; repeated keys are kept
    pub fn query(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.map(|b| b.query(key, value))
    }

    /// Appends every pair as a query parameter
    pub fn query_map<K, V, I>(self, pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.map(|b| b.query_map(pairs))
    }

    /// Sets the body verbatim
    pub fn body(self, body: impl Into<String>) -> Self {
        self.map(|b| b.body(body))
    }

    /// Sets the body to `value` encoded as JSON, with a JSON content type
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Self {
        self.map(|b| b.json(value))
    }

    /// Attaches a typed value to the request extensions
    pub fn extension<T: Clone + Send + Sync + 'static>(self, value: T) -> Self {
        self.map(|b| b.extension(value))
    }

    /// Materializes the request without dispatching it
    pub fn conn(&self) -> Request<Body> {
        self.builder.conn()
    }

    /// Runs `handler` inside the span from [`Env::request`]
    ///
    /// A handler error is rendered with [`Env::server_error`] and kept on
    /// [`TestResponse::error`].
    pub async fn request<F, Fut, R>(self, handler: F) -> TestResponse
    where
        F: FnOnce(Request<Body>, E) -> Fut,
        Fut: Future<Output = Result<R, E::Error>>,
        R: IntoResponse,
    {
        let Self { env, builder } = self;
        let span = env.request(builder.route());
        let request = builder.conn();
        let (method, uri) = (request.method().clone(), request.uri().clone());

        let result = handler(request, env.clone()).instrument(span.clone()).await;

        let (response, error) = match result {
            Ok(response) => (response.into_response(), None),
            Err(err) => {
                let response = span.in_scope(|| env.server_error(&err));
                (response, Some(anyhow::Error::new(err)))
            }
        };

        span.in_scope(|| {
            debug!(method = %method, uri = %uri, status = response.status().as_u16(), failed = error.is_some(), "test request dispatched");
        });

        let mut captured = TestResponse::capture(response).await;
        captured.error = error;
        captured
    }

    /// Sends a GET to `handler`
    pub async fn get<F, Fut, R>(self, handler: F) -> TestResponse
    where
        F: FnOnce(Request<Body>, E) -> Fut,
        Fut: Future<Output = Result<R, E::Error>>,
        R: IntoResponse,
    {
        self.method(Method::GET).request(handler).await
    }

    /// Sends a POST to `handler`
    pub async fn post<F, Fut, R>(self, handler: F) -> TestResponse
    where
        F: FnOnce(Request<Body>, E) -> Fut,
        Fut: Future<Output = Result<R, E::Error>>,
        R: IntoResponse,
    {
        self.method(Method::POST).request(handler).await
    }

    /// Sends a PUT to `handler`
    pub async fn put<F, Fut, R>(self, handler: F) -> TestResponse
    where
        F: FnOnce(Request<Body>, E) -> Fut,
        Fut: Future<Output = Result<R, E::Error>>,
        R: IntoResponse,
    {
        self.method(Method::PUT).request(handler).await
    }

    /// Sends a DELETE to `handler`
    pub async fn delete<F, Fut, R>(self, handler: F) -> TestResponse
    where
        F: FnOnce(Request<Body>, E) -> Fut,
        Fut: Future<Output = Result<R, E::Error>>,
        R: IntoResponse,
    {
        self.method(Method::DELETE).request(handler).await
    }
}
