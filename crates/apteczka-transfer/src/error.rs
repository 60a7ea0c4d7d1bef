//! # Transfer Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Transfer Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Workbook      │  │     Registry feed       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  MissingSheets  │  │  Http / HttpStatus      │ │
//! │  │                 │  │  Workbook       │  │  Csv                    │ │
//! │  │                 │  │  Io             │  │  MissingColumns         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Database: any DbError from the store, passed through           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancellation of a registry download is not an error; it is reported as
//! [`FeedStatus::Cancelled`](crate::registry::FeedStatus::Cancelled).

use apteczka_db::DbError;
use thiserror::Error;

/// Result type alias for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Transfer error type.
#[derive(Debug, Error)]
pub enum TransferError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid registry configuration.
    #[error("Invalid transfer configuration: {0}")]
    InvalidConfig(String),

    // =========================================================================
    // Workbook Errors
    // =========================================================================
    /// The workbook lacks sheets the import cannot do without.
    #[error("Workbook is missing required sheets: {}", .0.join(", "))]
    MissingSheets(Vec<String>),

    /// Reading or writing the spreadsheet failed.
    #[error("Workbook error: {0}")]
    Workbook(String),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // =========================================================================
    // Registry Errors
    // =========================================================================
    /// Download failed before a response arrived.
    #[error("Registry download failed: {0}")]
    Http(String),

    /// Registry answered with a non-success status.
    #[error("Registry responded with HTTP {0}")]
    HttpStatus(u16),

    /// Malformed feed.
    #[error("Registry feed parse error: {0}")]
    Csv(String),

    /// Feed header lacks mandatory columns.
    #[error("Registry feed is missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    // =========================================================================
    // Store Errors
    // =========================================================================
    /// Store operation failed.
    #[error(transparent)]
    Db(#[from] DbError),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for TransferError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => TransferError::HttpStatus(status.as_u16()),
            None => TransferError::Http(err.to_string()),
        }
    }
}

impl From<csv::Error> for TransferError {
    fn from(err: csv::Error) -> Self {
        TransferError::Csv(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for TransferError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        TransferError::Workbook(err.to_string())
    }
}

impl From<calamine::XlsxError> for TransferError {
    fn from(err: calamine::XlsxError) -> Self {
        TransferError::Workbook(err.to_string())
    }
}

impl TransferError {
    /// True when the input was rejected before the store was touched.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            TransferError::MissingSheets(_)
                | TransferError::MissingColumns(_)
                | TransferError::Csv(_)
                | TransferError::Workbook(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sheets_message() {
        let err = TransferError::MissingSheets(vec!["meds".into(), "meds_metadata".into()]);
        assert_eq!(
            err.to_string(),
            "Workbook is missing required sheets: meds, meds_metadata"
        );
        assert!(err.is_input_error());
    }

    #[test]
    fn test_db_error_is_transparent() {
        let err: TransferError = DbError::not_found("Product", "p-1").into();
        assert_eq!(err.to_string(), "Product not found: p-1");
        assert!(!err.is_input_error());
    }
}
