//! # Store Errors
//!
//! Every failure surfaced by the store, classified so the command layer
//! can tell bad input from a broken store.
//!
//! ```text
//!   sqlx::Error / MigrateError / ValidationError
//!        │
//!        ▼
//!   DbError ──► NotFound, UniqueViolation, ForeignKeyViolation,
//!        │      MultipleMatches, Validation  (caller can act on these)
//!        │
//!        └────► ConnectionFailed, MigrationFailed, QueryFailed,
//!               TransactionFailed, PoolExhausted, Internal
//! ```
//!
//! A failed multi-step write leaves the store as it was: the transaction
//! is dropped without commit. Nothing here retries.

use apteczka_core::ValidationError;
use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// No row with this key.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE column already holds the value.
    ///
    /// Renaming a tag to another tag's name ends here.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A row points at a parent that does not exist.
    ///
    /// Raised for a package of an unknown product, and by workbook imports
    /// whose rows reference missing parents.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// More than one product claims the same barcode.
    ///
    /// A data-quality signal for the caller; never resolved by picking one.
    #[error("Multiple matches found for barcode {barcode}: {count} products")]
    MultipleMatches { barcode: String, count: usize },

    /// Input rejected before touching the store.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Fatal at startup: the store cannot be used with a half-built schema.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Shorthand for [`DbError::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Column named by SQLite in "UNIQUE constraint failed: tags.name".
fn constrained_column(message: &str) -> String {
    message
        .rsplit(": ")
        .next()
        .filter(|col| !col.is_empty() && *col != message)
        .unwrap_or("value")
        .to_string()
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "?"),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        field: constrained_column(&message),
                        value: String::new(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    _ => DbError::QueryFailed(message),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_matches_message() {
        let err = DbError::MultipleMatches {
            barcode: "5909990".to_string(),
            count: 2,
        };
        assert_eq!(
            err.to_string(),
            "Multiple matches found for barcode 5909990: 2 products"
        );
    }

    #[test]
    fn test_validation_converts() {
        let err: DbError = ValidationError::required("tag").into();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[test]
    fn test_constrained_column() {
        assert_eq!(constrained_column("UNIQUE constraint failed: tags.name"), "tags.name");
        assert_eq!(constrained_column("constraint failed"), "value");
    }
}
