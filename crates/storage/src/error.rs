//! Error types for the upsert store.

use thiserror::Error;

/// Errors raised by the store and its backends.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Unknown column '{column}' for table {table}")]
    UnknownColumn { table: &'static str, column: String },

    #[error("Missing value for match key '{column}' on table {table}")]
    MissingMatchKey {
        table: &'static str,
        column: &'static str,
    },

    #[error("Type mismatch for column '{column}': expected {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
    },

    #[error("Constraint violation on {table}: {detail}")]
    ConstraintViolation { table: &'static str, detail: String },

    #[error("Commit failed: {0}")]
    CommitFailed(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Connection(err.to_string())
            }
            sqlx::Error::ColumnDecode { index, source } => StoreError::TypeMismatch {
                column: format!("{} ({})", index, source),
                expected: "declared column type",
            },
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
