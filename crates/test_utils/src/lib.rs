//! Test Utilities Crate
//!
//! One import for a test suite: the assertion library, the validation
//! matcher, the SQL data factory and the request harness, plus the
//! bootstrap pieces every suite needs.
//!
//! # Modules
//!
//! - `config`: Suite configuration read from `TEST_*` environment variables
//! - `telemetry`: Tracing subscriber for test output
//! - `database`: PostgreSQL test database, container-backed or external
//! - `error`: Errors from the bootstrap helpers

pub mod config;
pub mod database;
pub mod error;
pub mod telemetry;

pub use config::TestConfig;
pub use database::TestDatabase;
pub use error::SupportError;
pub use telemetry::init_test_tracing;

pub use test_assert::{assert, Expect, Validation};
pub use test_factory::{kv, FieldValue, Fields, Kv, PgStorage, Row, Sqlite, SqlStorage, Table};
pub use test_request::{req, req_env, Env, TestResponse, VALIDATION_CODE};
pub use validation_port::{ErrorSource, InvalidRecord};
