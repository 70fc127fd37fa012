//! SQL generation shared by every factory backend
//!
//! The column list is taken once, from the builder applied to an empty
//! override set, and reused for every insert on the same table.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::FactoryError;
use crate::value::{FieldValue, Fields, Kv};

/// Builder turning per-call overrides into a complete row
pub type Builder = Arc<dyn Fn(&Kv) -> Fields + Send + Sync>;

/// PostgreSQL positional placeholder (`$1`, `$2`, ...)
pub fn postgres_placeholder(index: usize) -> String {
    format!("${}", index + 1)
}

/// SQLite positional placeholder (`?1`, `?2`, ...)
pub fn sqlite_placeholder(index: usize) -> String {
    format!("?{}", index + 1)
}

/// Statements generated for one table
#[derive(Debug, Clone, PartialEq)]
pub struct Statements {
    /// Column names, in bind order
    pub keys: Vec<String>,
    /// Upserting insert that returns the written row
    pub insert: String,
    /// Deletes every row
    pub delete: String,
}

/// Generates the insert and delete statements for `table`
///
/// `fields` fixes the column order. With primary keys, the insert becomes
/// an upsert that overwrites every column on conflict.
pub fn build_sql(
    table: &str,
    fields: &Fields,
    placeholder: impl Fn(usize) -> String,
    pks: &[&str],
) -> Statements {
    let keys: Vec<String> = fields.keys().into_iter().map(str::to_string).collect();

    let mut insert = if keys.is_empty() {
        format!("insert into {} default values", table)
    } else {
        let placeholders: Vec<String> = (0..keys.len()).map(&placeholder).collect();
        format!(
            "insert into {} ({})\nvalues ({})",
            table,
            keys.join(","),
            placeholders.join(",")
        )
    };

    if !pks.is_empty() {
        insert.push_str(&format!("\non conflict ({}) do ", pks.join(",")));
        if keys.is_empty() {
            insert.push_str("nothing");
        } else {
            let updates: Vec<String> = keys
                .iter()
                .map(|k| format!("{} = excluded.{}", k, k))
                .collect();
            insert.push_str("update set ");
            insert.push_str(&updates.join(", "));
        }
    }
    insert.push_str("\nreturning *");

    Statements {
        keys,
        insert,
        delete: format!("delete from {}", table),
    }
}

/// A table name, its builder and the statements derived from them
#[derive(Clone)]
pub(crate) struct TableDefinition {
    pub(crate) name: String,
    builder: Builder,
    pub(crate) statements: Statements,
}

impl TableDefinition {
    pub(crate) fn new(
        name: String,
        builder: Builder,
        placeholder: impl Fn(usize) -> String,
        pks: &[&str],
    ) -> Self {
        let statements = build_sql(&name, &builder(&Kv::new()), placeholder, pks);
        Self {
            name,
            builder,
            statements,
        }
    }

    /// Runs the builder and orders its output into bind parameters
    ///
    /// JSON payloads go through `encode_json`; everything else is bound as-is.
    pub(crate) fn params(
        &self,
        kv: &Kv,
        encode_json: impl Fn(&Value) -> Result<FieldValue, FactoryError>,
    ) -> Result<(Fields, Vec<FieldValue>), FactoryError> {
        let fields = (self.builder)(kv);
        let keys = &self.statements.keys;

        if fields.len() != keys.len() || keys.iter().any(|k| fields.get(k).is_none()) {
            return Err(FactoryError::ColumnDrift {
                table: self.name.clone(),
                expected: keys.clone(),
                actual: fields.keys().into_iter().map(str::to_string).collect(),
            });
        }

        let mut params = Vec::with_capacity(keys.len());
        for key in keys {
            match fields.get(key) {
                Some(FieldValue::Json(value)) => params.push(encode_json(value)?),
                Some(value) => params.push(value.clone()),
                None => unreachable!("column set checked above"),
            }
        }
        Ok((fields, params))
    }
}

impl fmt::Debug for TableDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableDefinition")
            .field("name", &self.name)
            .field("statements", &self.statements)
            .finish_non_exhaustive()
    }
}

/// Default JSON encoding: the payload as JSON text
pub fn encode_json_text(value: &Value) -> Result<FieldValue, FactoryError> {
    Ok(FieldValue::Text(serde_json::to_string(value)?))
}
