//! Factory over SQLite, with the connection supplied per call
//!
//! The factory holds no connection. Each operation receives a
//! [`SqliteProvider`], so one table definition can be reused across
//! per-test databases.

use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::types::{Value as SqliteValue, ValueRef};
use rusqlite::Connection;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::FactoryError;
use crate::row::Row;
use crate::sql::{encode_json_text, sqlite_placeholder, TableDefinition};
use crate::value::{FieldValue, Fields, Kv};

/// Hands out a live SQLite connection for the duration of a callback
pub trait SqliteProvider {
    /// Runs `f` with a connection
    fn with_db<R>(&self, f: impl FnOnce(&Connection) -> R) -> R;
}

impl SqliteProvider for Connection {
    fn with_db<R>(&self, f: impl FnOnce(&Connection) -> R) -> R {
        f(self)
    }
}

impl SqliteProvider for Mutex<Connection> {
    fn with_db<R>(&self, f: impl FnOnce(&Connection) -> R) -> R {
        let conn = self.lock().unwrap_or_else(PoisonError::into_inner);
        f(&conn)
    }
}

impl<P: SqliteProvider + ?Sized> SqliteProvider for Arc<P> {
    fn with_db<R>(&self, f: impl FnOnce(&Connection) -> R) -> R {
        (**self).with_db(f)
    }
}

/// Test-data factory for one SQLite table
#[derive(Debug, Clone)]
pub struct Sqlite {
    definition: TableDefinition,
}

impl Sqlite {
    /// Defines a factory for `name`
    ///
    /// `builder` is invoked once with no overrides to fix the column list.
    pub fn new<F>(name: impl Into<String>, builder: F, pks: &[&str]) -> Self
    where
        F: Fn(&Kv) -> Fields + Send + Sync + 'static,
    {
        Self {
            definition: TableDefinition::new(name.into(), Arc::new(builder), sqlite_placeholder, pks),
        }
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// The generated insert statement
    pub fn insert_sql(&self) -> &str {
        &self.definition.statements.insert
    }

    /// The generated delete statement
    pub fn delete_sql(&self) -> &str {
        &self.definition.statements.delete
    }

    /// Deletes every row in the table
    pub fn try_truncate<P: SqliteProvider + ?Sized>(&self, provider: &P) -> Result<&Self, FactoryError> {
        debug!(table = %self.name(), "sqlite factory truncate");
        provider.with_db(|conn| conn.execute(self.delete_sql(), []))?;
        Ok(self)
    }

    /// Deletes every row in the table
    ///
    /// # Panics
    ///
    /// Panics if the statement fails
    pub fn truncate<P: SqliteProvider + ?Sized>(&self, provider: &P) -> &Self {
        match self.try_truncate(provider) {
            Ok(table) => table,
            Err(err) => panic!("failed to truncate '{}': {}", self.name(), err),
        }
    }

    /// Builds one row from `kv`, inserts it and returns it as stored
    pub fn try_insert<P: SqliteProvider + ?Sized>(&self, provider: &P, kv: Kv) -> Result<Row, FactoryError> {
        let (_, params) = self.definition.params(&kv, encode_json_text)?;
        let values: Vec<SqliteValue> = params.into_iter().map(to_sqlite).collect();

        debug!(table = %self.name(), params = values.len(), "sqlite factory insert");
        let row = provider.with_db(|conn| {
            conn.query_row(
                self.insert_sql(),
                rusqlite::params_from_iter(values),
                sqlite_row_to_row,
            )
        })?;
        Ok(row)
    }

    /// Builds one row from `kv`, inserts it and returns it as stored
    ///
    /// # Panics
    ///
    /// Panics if the builder output drifts or the statement fails
    pub fn insert<P: SqliteProvider + ?Sized>(&self, provider: &P, kv: Kv) -> Row {
        match self.try_insert(provider, kv) {
            Ok(row) => row,
            Err(err) => panic!("failed to insert into '{}': {}", self.name(), err),
        }
    }
}

/// SQLite has no native uuid, time, list or JSON types; those bind as text
fn to_sqlite(value: FieldValue) -> SqliteValue {
    match value {
        FieldValue::Null => SqliteValue::Null,
        FieldValue::Bool(b) => SqliteValue::Integer(i64::from(b)),
        FieldValue::Int(i) => SqliteValue::Integer(i),
        FieldValue::UInt16(u) => SqliteValue::Integer(i64::from(u)),
        FieldValue::Float(f) => SqliteValue::Real(f),
        FieldValue::Text(s) | FieldValue::RawJson(s) => SqliteValue::Text(s),
        FieldValue::Uuid(u) => SqliteValue::Text(u.to_string()),
        FieldValue::Time(t) => SqliteValue::Text(t.to_rfc3339()),
        FieldValue::Strings(list) => SqliteValue::Text(Value::from(list).to_string()),
        FieldValue::Json(v) => SqliteValue::Text(v.to_string()),
    }
}

fn sqlite_row_to_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    let statement = row.as_ref();
    let mut values = Map::with_capacity(statement.column_count());

    for index in 0..statement.column_count() {
        let name = statement.column_name(index)?.to_string();
        let value = match row.get_ref(index)? {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::from(i),
            ValueRef::Real(f) => Value::from(f),
            ValueRef::Text(bytes) => Value::from(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => Value::from(bytes.to_vec()),
        };
        values.insert(name, value);
    }

    Ok(Row::new(values))
}
