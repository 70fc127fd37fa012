//! Factory over an injected [`SqlStorage`]
//!
//! ```rust,ignore
//! let storage: Arc<dyn SqlStorage> = Arc::new(PgStorage::new(pool));
//! let users = Table::new(storage, "users", |kv: &Kv| {
//!     Fields::new()
//!         .set("id", kv.uuid_or("id", Uuid::new_v4()))
//!         .set("name", kv.string_or("name", "leto"))
//! }, &["id"]);
//!
//! users.truncate().await;
//! let row = users.insert(kv! { "name" => "paul" }).await;
//! assert_eq!(row.string("name"), Some("paul"));
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::error::FactoryError;
use crate::row::Row;
use crate::sql::TableDefinition;
use crate::storage::SqlStorage;
use crate::value::{Fields, Kv};

/// Test-data factory for one table
#[derive(Clone)]
pub struct Table {
    storage: Arc<dyn SqlStorage>,
    definition: TableDefinition,
}

impl Table {
    /// Defines a factory for `name`
    ///
    /// `builder` is invoked once with no overrides to fix the column list.
    /// Every later invocation must return the same set of columns.
    pub fn new<F>(storage: Arc<dyn SqlStorage>, name: impl Into<String>, builder: F, pks: &[&str]) -> Self
    where
        F: Fn(&Kv) -> Fields + Send + Sync + 'static,
    {
        let placeholder = |i| storage.placeholder(i);
        let definition = TableDefinition::new(name.into(), Arc::new(builder), placeholder, pks);
        Self {
            storage,
            definition,
        }
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Column names, in bind order
    pub fn columns(&self) -> &[String] {
        &self.definition.statements.keys
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
    pub async fn try_truncate(&self) -> Result<&Self, FactoryError> {
        debug!(table = %self.name(), "factory truncate");
        self.storage.execute(self.delete_sql(), &[]).await?;
        Ok(self)
    }

    /// Deletes every row in the table
    ///
    /// # Panics
    ///
    /// Panics if the statement fails
    pub async fn truncate(&self) -> &Self {
        match self.try_truncate().await {
            Ok(table) => table,
            Err(err) => panic!("failed to truncate '{}': {}", self.name(), err),
        }
    }

    /// Builds one row from `kv`, inserts it and returns it as stored
    pub async fn try_insert(&self, kv: Kv) -> Result<Row, FactoryError> {
        let storage = &self.storage;
        let (_, params) = self
            .definition
            .params(&kv, |value| storage.encode_json(value))?;

        debug!(table = %self.name(), params = params.len(), "factory insert");
        self.storage.fetch_row(self.insert_sql(), &params).await
    }

    /// Builds one row from `kv`, inserts it and returns it as stored
    ///
    /// # Panics
    ///
    /// Panics if the builder output drifts or the statement fails
    pub async fn insert(&self, kv: Kv) -> Row {
        match self.try_insert(kv).await {
            Ok(row) => row,
            Err(err) => panic!("failed to insert into '{}': {}", self.name(), err),
        }
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}
