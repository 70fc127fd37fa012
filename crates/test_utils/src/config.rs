//! Test suite configuration

use serde::Deserialize;

/// Settings for the test environment
///
/// Every field can be overridden with a `TEST_` prefixed environment
/// variable, e.g. `TEST_DATABASE_URL` or `TEST_LOG_FILTER`. A `.env` file is
/// read first when present.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// PostgreSQL image to start
    pub database_image: String,
    /// Tag of the image
    pub database_tag: String,
    pub database_user: String,
    pub database_password: String,
    pub database_name: String,
    /// Connect here instead of starting a container
    pub database_url: Option<String>,
    /// Filter used when `RUST_LOG` isn't set
    pub log_filter: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            database_image: "postgres".to_string(),
            database_tag: "16-alpine".to_string(),
            database_user: "test_user".to_string(),
            database_password: "test_password".to_string(),
            database_name: "factory_test".to_string(),
            database_url: None,
            log_filter: "warn".to_string(),
        }
    }
}

impl TestConfig {
    /// Loads configuration from the environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        config::Config::builder()
            .add_source(config::Environment::with_prefix("TEST"))
            .build()?
            .try_deserialize()
    }

    /// Connection URL for a server at `host:port`
    pub fn connection_url(&self, host: &str, port: u16) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.database_user, self.database_password, host, port, self.database_name
        )
    }
}
