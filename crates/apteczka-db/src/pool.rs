//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Composition root (AppState::open)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Repositories (tags, medications, packages, inventory, bulk)           │
//! │  Generic primitives (query, query_rows, execute)                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The handle is constructed explicitly and passed to whoever needs it;
//! there is no process-wide connection.

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{FromRow, SqlitePool};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::bulk::BulkRepository;
use crate::repository::inventory::InventoryRepository;
use crate::repository::medication::MedicationRepository;
use crate::repository::package::PackageRepository;
use crate::repository::tag::TagRepository;
use crate::value::{bind_value, bind_value_as, to_row_set, RowSet, SqlValue};

// =============================================================================
// Configuration
// =============================================================================

/// Path value that selects an in-memory store.
const MEMORY_PATH: &str = ":memory:";

/// Pool and file settings of a store.
///
/// ```rust,ignore
/// let config = DbConfig::new(data_dir.join("apteczka.db")).max_connections(3);
/// let db = Database::new(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created when missing. `:memory:` for a throwaway store.
    pub database_path: PathBuf,

    /// Upper bound of pooled connections (5).
    pub max_connections: u32,

    /// Connections kept open while idle (1).
    pub min_connections: u32,

    /// How long to wait for a free connection (30 s).
    pub connect_timeout: Duration,

    /// Idle connections beyond `min_connections` close after this (10 min).
    pub idle_timeout: Duration,

    /// Bring the schema up to date on open (true).
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(10 * 60),
            run_migrations: true,
        }
    }

    /// A private in-memory store, used by tests.
    ///
    /// Each SQLite in-memory connection is a separate database, so the pool
    /// is pinned to exactly one connection that never expires.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let parsed = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
        } else {
            SqliteConnectOptions::from_str(&format!(
                "sqlite://{}?mode=rwc",
                self.database_path.display()
            ))
            .map(|o| o.journal_mode(SqliteJournalMode::Wal).create_if_missing(true))
        };
        let options = parsed.map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        // Foreign keys are off in SQLite unless asked for on every connection.
        Ok(options
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true))
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let options = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.connect_timeout);

        if self.is_in_memory() {
            options.idle_timeout(None).max_lifetime(None)
        } else {
            options.idle_timeout(Some(self.idle_timeout))
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Store handle: the pool plus repository accessors.
///
/// Clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the store and, unless disabled, migrates it.
    ///
    /// File stores use WAL journaling and NORMAL synchronous mode; every
    /// connection enforces foreign keys.
    ///
    /// ## Errors
    /// `ConnectionFailed` when the file cannot be opened, `MigrationFailed`
    /// when the schema cannot be brought up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Opening store"
        );

        let pool = config
            .pool_options()
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        debug!("Store ready");
        Ok(db)
    }

    /// Applies pending migrations, then refolds tag name keys.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await?;
        self.tags().refresh_name_keys().await?;
        Ok(())
    }

    /// Highest applied schema version.
    pub async fn schema_version(&self) -> DbResult<i64> {
        migrations::schema_version(&self.pool).await
    }

    /// Returns a reference to the connection pool.
    ///
    /// Prefer repository methods when available.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // Generic primitives
    // =========================================================================

    /// Runs a read query and maps each row to `T`.
    pub async fn query<T>(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let mut query = sqlx::query_as::<_, T>(sql);
        for param in params {
            query = bind_value_as(query, param);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    /// Runs a read query and returns untyped rows.
    pub async fn query_rows(&self, sql: &str, params: &[SqlValue]) -> DbResult<RowSet> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_value(query, param);
        }

        let rows = query.fetch_all(&self.pool).await?;
        to_row_set(&rows)
    }

    /// Runs a write or DDL statement.
    pub async fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<()> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_value(query, param);
        }

        let result = query.execute(&self.pool).await?;
        debug!(rows_affected = result.rows_affected(), "Statement executed");
        Ok(())
    }

    // =========================================================================
    // Repositories
    // =========================================================================

    /// Returns the tag repository.
    pub fn tags(&self) -> TagRepository {
        TagRepository::new(self.pool.clone())
    }

    /// Returns the product metadata repository.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let products = db.medications().search_by_name("apap", 10).await?;
    /// ```
    pub fn medications(&self) -> MedicationRepository {
        MedicationRepository::new(self.pool.clone())
    }

    /// Returns the package repository.
    pub fn packages(&self) -> PackageRepository {
        PackageRepository::new(self.pool.clone())
    }

    /// Returns the inventory read model.
    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.pool.clone())
    }

    /// Returns the whole-table transfer repository.
    pub fn bulk(&self) -> BulkRepository {
        BulkRepository::new(self.pool.clone())
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
