//! Factory error types
//!
//! Errors surfaced by the `try_*` factory operations. The non-`try`
//! operations turn these into panics, since a factory that cannot insert its
//! row means the test itself is broken.

use thiserror::Error;

/// Errors that can occur while building or inserting a factory row
#[derive(Debug, Error)]
pub enum FactoryError {
    /// An override was stored with a different kind than the accessor asked for
    #[error("Type mismatch for '{key}': expected {expected}, got {actual}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// An override had the right kind but unusable content
    #[error("Invalid {expected} for '{key}': {reason}")]
    InvalidValue {
        key: String,
        expected: &'static str,
        reason: String,
    },

    /// The builder returned a different column set than at definition time
    #[error("Builder for '{table}' produced columns {actual:?}, expected {expected:?}")]
    ColumnDrift {
        table: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// The backend's read-back wasn't a single record
    #[error("Expected a record from the backend, got {0}")]
    NotARecord(String),

    /// A JSON payload failed to encode or decode
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLx error from the PostgreSQL backend
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    /// Error from the SQLite backend
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl FactoryError {
    /// Creates a type mismatch error for an override key
    pub fn mismatch(key: &str, expected: &'static str, actual: &'static str) -> Self {
        FactoryError::TypeMismatch {
            key: key.to_string(),
            expected,
            actual,
        }
    }

    /// Creates an invalid-content error for an override key
    pub fn invalid(key: &str, expected: &'static str, reason: String) -> Self {
        FactoryError::InvalidValue {
            key: key.to_string(),
            expected,
            reason,
        }
    }

    /// Checks if this error is an override of the wrong kind
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, FactoryError::TypeMismatch { .. })
    }

    /// Checks if the statement returned no row
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FactoryError::Sql(sqlx::Error::RowNotFound)
                | FactoryError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_display() {
        let error = FactoryError::mismatch("age", "int", "text");
        assert!(error.is_type_mismatch());
        assert_eq!(
            error.to_string(),
            "Type mismatch for 'age': expected int, got text"
        );
    }

    #[test]
    fn test_not_found_classification() {
        assert!(FactoryError::from(sqlx::Error::RowNotFound).is_not_found());
        assert!(FactoryError::from(rusqlite::Error::QueryReturnedNoRows).is_not_found());
        assert!(!FactoryError::mismatch("a", "int", "bool").is_not_found());
    }
}
