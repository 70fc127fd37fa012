//! In-process request harness for Axum handlers
//!
//! Build a request with [`req`], send it through a router, a plain async
//! handler, or an env-style handler, then assert on the [`TestResponse`].
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use test_request::req;
//!
//! # async fn run() {
//! let app = Router::new().route("/health", get(|| async { "ok" }));
//! req().path("/health").get(app).await.ok();
//! # }
//! ```

pub mod env;
pub mod request;
pub mod response;

pub use env::{req_env, Env, EnvRequestBuilder};
pub use request::{req, RequestBuilder, DEFAULT_HOST};
pub use response::{TestResponse, VALIDATION_CODE};
