//! Tests for the storage-backed factory using a recording storage

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use test_factory::{
    kv, postgres_placeholder, FactoryError, FieldValue, Fields, Kv, Row, SqlStorage, Table,
};

/// Records every statement and echoes the bound parameters back as the row
#[derive(Default)]
struct RecordingStorage {
    statements: Mutex<Vec<(String, Vec<FieldValue>)>>,
    columns: Mutex<Vec<String>>,
}

impl RecordingStorage {
    fn statements(&self) -> Vec<(String, Vec<FieldValue>)> {
        self.statements.lock().unwrap().clone()
    }

    fn record(&self, sql: &str, params: &[FieldValue]) {
        self.statements
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
    }
}

fn to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => json!(b),
        FieldValue::Int(i) => json!(i),
        FieldValue::UInt16(u) => json!(u),
        FieldValue::Float(f) => json!(f),
        FieldValue::Text(s) | FieldValue::RawJson(s) => json!(s),
        FieldValue::Uuid(u) => json!(u.to_string()),
        FieldValue::Time(t) => json!(t.to_rfc3339()),
        FieldValue::Strings(list) => json!(list),
        FieldValue::Json(v) => v.clone(),
    }
}

#[async_trait]
impl SqlStorage for RecordingStorage {
    fn placeholder(&self, index: usize) -> String {
        postgres_placeholder(index)
    }

    async fn execute(&self, sql: &str, params: &[FieldValue]) -> Result<u64, FactoryError> {
        self.record(sql, params);
        Ok(0)
    }

    async fn fetch_row(&self, sql: &str, params: &[FieldValue]) -> Result<Row, FactoryError> {
        self.record(sql, params);
        let columns = self.columns.lock().unwrap().clone();
        let values: Map<String, Value> = columns
            .into_iter()
            .zip(params.iter().map(to_json))
            .collect();
        Ok(Row::new(values))
    }
}

fn users(storage: &Arc<RecordingStorage>) -> Table {
    *storage.columns.lock().unwrap() = vec!["name".into(), "age".into()];
    Table::new(
        storage.clone(),
        "users",
        |kv: &Kv| {
            Fields::new()
                .set("name", kv.string_or("name", "x"))
                .set("age", kv.int_or("age", 1))
        },
        &["id"],
    )
}

mod sql_shape {
    use super::*;

    #[tokio::test]
    async fn test_insert_upserts_on_primary_key() {
        let storage = Arc::new(RecordingStorage::default());
        let table = users(&storage);

        table.insert(Kv::new()).await;

        let statements = storage.statements();
        assert_eq!(statements.len(), 1);
        let (sql, params) = &statements[0];
        assert!(sql.starts_with("insert into users (name,age)\nvalues ($1,$2)"));
        assert!(sql.contains("on conflict (id) do update set name = excluded.name, age = excluded.age"));
        assert!(sql.ends_with("returning *"));
        assert_eq!(
            params,
            &vec![FieldValue::Text("x".into()), FieldValue::Int(1)]
        );
    }

    #[tokio::test]
    async fn test_truncate_deletes_without_params() {
        let storage = Arc::new(RecordingStorage::default());
        let table = users(&storage);

        table.truncate().await.truncate().await;

        let statements = storage.statements();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].0, "delete from users");
        assert!(statements[0].1.is_empty());
    }

    #[test]
    fn test_columns_are_fixed_at_definition() {
        let storage = Arc::new(RecordingStorage::default());
        let table = users(&storage);
        assert_eq!(table.columns(), ["name".to_string(), "age".to_string()]);
        assert_eq!(table.delete_sql(), "delete from users");
    }
}

mod inserts {
    use super::*;

    #[tokio::test]
    async fn test_overrides_bind_in_declared_order() {
        let storage = Arc::new(RecordingStorage::default());
        let table = users(&storage);

        let row = table.insert(kv! { "age" => 40, "name" => "leto" }).await;

        assert_eq!(row.string("name"), Some("leto"));
        assert_eq!(row.int("age"), Some(40));
        let (_, params) = &storage.statements()[0];
        assert_eq!(params[0], FieldValue::Text("leto".into()));
        assert_eq!(params[1], FieldValue::Int(40));
    }

    #[tokio::test]
    async fn test_json_payloads_use_the_storage_encoder() {
        let storage = Arc::new(RecordingStorage::default());
        *storage.columns.lock().unwrap() = vec!["meta".into()];
        let table = Table::new(
            storage.clone(),
            "settings",
            |kv: &Kv| Fields::new().set("meta", FieldValue::Json(kv.json_or("meta", json!({})))),
            &[],
        );

        table.insert(kv! { "meta" => FieldValue::json(json!({"tier": 2})) }).await;

        let (_, params) = &storage.statements()[0];
        assert_eq!(params[0], FieldValue::Text("{\"tier\":2}".into()));
    }

    #[tokio::test]
    async fn test_column_drift_is_an_error() {
        let storage = Arc::new(RecordingStorage::default());
        let table = Table::new(
            storage.clone(),
            "users",
            |kv: &Kv| match kv.string("nickname") {
                Some(nick) => Fields::new().set("name", "x").set("nickname", nick),
                None => Fields::new().set("name", "x"),
            },
            &[],
        );

        let err = table
            .try_insert(kv! { "nickname" => "usul" })
            .await
            .unwrap_err();
        assert!(matches!(err, FactoryError::ColumnDrift { .. }));
        assert!(storage.statements().is_empty());
    }

    #[tokio::test]
    #[should_panic(expected = "Type mismatch for 'age': expected int, got text")]
    async fn test_insert_panics_on_type_mismatch() {
        let storage = Arc::new(RecordingStorage::default());
        let table = users(&storage);
        table.insert(kv! { "age" => "forty" }).await;
    }
}
