//! PostgreSQL test database
//!
//! Starts a throwaway container, or connects to `TEST_DATABASE_URL` when it
//! is set, and hands out factory tables bound to the pool.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use test_factory::{Fields, Kv, PgStorage, SqlStorage, Table};
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::TestConfig;
use crate::error::SupportError;

const POSTGRES_PORT: u16 = 5432;

/// A PostgreSQL database for one test or one suite
pub struct TestDatabase {
    // dropped with the database so the container outlives the pool
    _container: Option<ContainerAsync<GenericImage>>,
    pool: PgPool,
    storage: Arc<PgStorage>,
    url: String,
}

impl TestDatabase {
    /// Starts a database using the environment's configuration
    pub async fn new() -> Result<Self, SupportError> {
        let config = TestConfig::from_env()?;
        Self::start(&config).await
    }

    /// Starts a database for `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the container fails to start or the pool can't connect
    pub async fn start(config: &TestConfig) -> Result<Self, SupportError> {
        let (container, url) = match &config.database_url {
            Some(url) => (None, url.clone()),
            None => {
                let container = GenericImage::new(&config.database_image, &config.database_tag)
                    .with_exposed_port(POSTGRES_PORT.tcp())
                    .with_wait_for(WaitFor::message_on_stderr(
                        "database system is ready to accept connections",
                    ))
                    .with_env_var("POSTGRES_USER", &config.database_user)
                    .with_env_var("POSTGRES_PASSWORD", &config.database_password)
                    .with_env_var("POSTGRES_DB", &config.database_name)
                    .start()
                    .await?;

                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(POSTGRES_PORT).await?;
                (Some(container), config.connection_url(&host, port))
            }
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&url)
            .await?;

        info!(external = container.is_none(), "test database ready");

        Ok(Self {
            _container: container,
            storage: Arc::new(PgStorage::new(pool.clone())),
            pool,
            url,
        })
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Storage handle to inject into factory tables
    pub fn storage(&self) -> Arc<dyn SqlStorage> {
        self.storage.clone()
    }

    /// Declares a factory table bound to this database
    pub fn table<F>(&self, name: &str, builder: F, pks: &[&str]) -> Table
    where
        F: Fn(&Kv) -> Fields + Send + Sync + 'static,
    {
        Table::new(self.storage(), name, builder, pks)
    }

    /// Runs a schema script, statements separated by `;`
    pub async fn execute_schema(&self, sql: &str) -> Result<(), SupportError> {
        sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(())
    }
}

/// Global test database for shared integration tests
static SHARED_TEST_DB: OnceCell<Arc<TestDatabase>> = OnceCell::const_new();

/// Gets or creates a database shared by every test in the binary
///
/// Tests sharing it should truncate the tables they use before inserting.
///
/// # Panics
///
/// Panics if the database fails to initialize
pub async fn shared_test_database() -> Arc<TestDatabase> {
    SHARED_TEST_DB
        .get_or_init(|| async {
            match TestDatabase::new().await {
                Ok(db) => Arc::new(db),
                Err(err) => panic!("failed to create shared test database: {}", err),
            }
        })
        .await
        .clone()
}
