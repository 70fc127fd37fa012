//! Test Data Factories
//!
//! Declarative factories that insert one fully-specified row per call, with
//! per-call overrides and defaults, and return the row as the backend stored it.
//!
//! # Backends
//!
//! - [`Table`]: executes through an injected [`SqlStorage`] (PostgreSQL via
//!   [`PgStorage`], or any other implementation)
//! - [`Sqlite`]: executes on a SQLite connection handed in per call through
//!   a [`SqliteProvider`]
//!
//! Both generate the same statements: an insert (an upsert when primary
//! keys are given) ending in `returning *`, and a `delete from` for
//! truncation.
//!
//! # Example
//!
//! ```rust
//! use rusqlite::Connection;
//! use test_factory::{kv, Fields, Kv, Sqlite};
//!
//! let conn = Connection::open_in_memory().unwrap();
//! conn.execute_batch("create table users (id integer primary key, name text not null)").unwrap();
//!
//! let users = Sqlite::new("users", |kv: &Kv| {
//!     Fields::new()
//!         .set("id", kv.int_or("id", 1))
//!         .set("name", kv.string_or("name", "leto"))
//! }, &["id"]);
//!
//! let row = users.insert(&conn, kv! { "name" => "paul" });
//! assert_eq!(row.string("name"), Some("paul"));
//! ```

pub mod error;
pub mod row;
pub mod sql;
pub mod sqlite;
pub mod storage;
pub mod table;
pub mod value;

pub use error::FactoryError;
pub use row::Row;
pub use sql::{build_sql, postgres_placeholder, sqlite_placeholder, Statements};
pub use sqlite::{Sqlite, SqliteProvider};
pub use storage::{PgStorage, SqlStorage};
pub use table::Table;
pub use value::{FieldValue, Fields, FromField, Kv, RawJson};
