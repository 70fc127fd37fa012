//! SQL storage backends for [`Table`](crate::Table)
//!
//! [`SqlStorage`] is the seam the generic factory executes through. The
//! PostgreSQL adapter binds parameters with SQLx and has the server render
//! the written row as JSON, so every column type reads back the same way.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgTypeInfo};
use sqlx::query::Query;
use sqlx::{Encode, PgPool, Postgres, Row as _, Type};
use tracing::debug;

use crate::error::FactoryError;
use crate::row::Row;
use crate::sql::{encode_json_text, postgres_placeholder};
use crate::value::FieldValue;

/// A SQL executor with positional parameters
#[async_trait]
pub trait SqlStorage: Send + Sync {
    /// Encodes a JSON payload into a bindable value
    ///
    /// Defaults to JSON text.
    fn encode_json(&self, value: &Value) -> Result<FieldValue, FactoryError> {
        encode_json_text(value)
    }

    /// Placeholder for the parameter at zero-based `index`
    fn placeholder(&self, index: usize) -> String;

    /// Executes a statement, returning the number of affected rows
    async fn execute(&self, sql: &str, params: &[FieldValue]) -> Result<u64, FactoryError>;

    /// Executes a statement that yields exactly one row
    ///
    /// For writes the statement ends in `returning *`.
    async fn fetch_row(&self, sql: &str, params: &[FieldValue]) -> Result<Row, FactoryError>;
}

/// [`SqlStorage`] over a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Creates a new PgStorage with the given connection pool
    ///
    /// # Arguments
    ///
    /// * `pool` - The PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SqlStorage for PgStorage {
    fn encode_json(&self, value: &Value) -> Result<FieldValue, FactoryError> {
        // bound as jsonb by `bind_params`
        Ok(FieldValue::Json(value.clone()))
    }

    fn placeholder(&self, index: usize) -> String {
        postgres_placeholder(index)
    }

    async fn execute(&self, sql: &str, params: &[FieldValue]) -> Result<u64, FactoryError> {
        let query = bind_params(sqlx::query(sql), params)?;
        let result = query.execute(&self.pool).await?;
        debug!(rows = result.rows_affected(), "statement executed");
        Ok(result.rows_affected())
    }

    async fn fetch_row(&self, sql: &str, params: &[FieldValue]) -> Result<Row, FactoryError> {
        let sql = read_back_sql(sql);
        let query = bind_params(sqlx::query(&sql), params)?;
        let record: Value = query.fetch_one(&self.pool).await?.try_get(0)?;
        json_to_row(record)
    }
}

/// Wraps a row-returning statement so the row comes back as one JSON record
///
/// `to_json` keeps column order and renders any column type, including
/// `numeric`, arrays, enums and network types.
fn read_back_sql(sql: &str) -> String {
    format!("with written as (\n{}\n)\nselect to_json(written) from written", sql)
}

fn json_to_row(record: Value) -> Result<Row, FactoryError> {
    match record {
        Value::Object(values) => Ok(Row::new(values)),
        other => Err(FactoryError::NotARecord(other.to_string())),
    }
}

/// A NULL whose type the server infers from the column it lands in
struct UntypedNull;

impl Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        // oid 0 leaves the parameter type unspecified
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

/// Binds every parameter by its kind
fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[FieldValue],
) -> Result<Query<'q, Postgres, PgArguments>, FactoryError> {
    for param in params {
        query = match param {
            FieldValue::Null => query.bind(UntypedNull),
            FieldValue::Bool(b) => query.bind(*b),
            FieldValue::Int(i) => query.bind(*i),
            FieldValue::UInt16(u) => query.bind(i32::from(*u)),
            FieldValue::Float(f) => query.bind(*f),
            FieldValue::Text(s) => query.bind(s.clone()),
            FieldValue::Uuid(u) => query.bind(*u),
            FieldValue::Time(t) => query.bind(*t),
            FieldValue::Strings(list) => query.bind(list.clone()),
            FieldValue::Json(v) => query.bind(sqlx::types::Json(v.clone())),
            FieldValue::RawJson(s) => {
                let value: Value = serde_json::from_str(s)?;
                query.bind(sqlx::types::Json(value))
            }
        };
    }
    Ok(query)
}
