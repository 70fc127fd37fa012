//! Errors from the test bootstrap helpers

use thiserror::Error;

/// Failures while preparing the test environment
#[derive(Debug, Error)]
pub enum SupportError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Container error: {0}")]
    Container(#[from] testcontainers::TestcontainersError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl SupportError {
    /// Whether the failure came from Docker rather than the database itself
    pub fn is_container(&self) -> bool {
        matches!(self, SupportError::Container(_))
    }
}
