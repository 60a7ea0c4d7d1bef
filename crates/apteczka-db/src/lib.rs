//! # apteczka-db: Database Layer for Apteczka
//!
//! Persistent store of the home medicine cabinet: SQLite through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Apteczka Data Flow                               │
//! │                                                                         │
//! │  Command layer / apteczka-transfer                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  apteczka-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ TagRepo        │    │ 001 schema   │  │   │
//! │  │   │ SqlitePool    │◄───│ MedicationRepo │    │ 002 pkg tags │  │   │
//! │  │   │ query/execute │    │ PackageRepo    │    │ 003 registry │  │   │
//! │  │   │               │    │ InventoryRepo  │    │ 004 indexes  │  │   │
//! │  │   │               │    │ BulkRepo       │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL, foreign keys ON)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, generic query primitives
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`value`] - Dynamic SQL values
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use apteczka_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("apteczka.db")).await?;
//!
//! let fever = db.tags().add_tag("fever").await?;
//! let apap = db.medications().add_medication_metadata("Apap", None, &[fever]).await?;
//! db.packages().add_medication_package(&apap, Some(20), Some("2027-05"), &[]).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod value;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use value::{RowSet, SqlValue};

// Repository re-exports for convenience
pub use repository::bulk::{
    BulkRepository, ColumnInfo, TableCount, TableDump, TABLES_EXPORT_ORDER, TABLES_IMPORT_ORDER,
    TABLES_WIPE_ORDER,
};
pub use repository::inventory::InventoryRepository;
pub use repository::medication::{ImportOutcome, MedicationRepository};
pub use repository::package::PackageRepository;
pub use repository::tag::TagRepository;
