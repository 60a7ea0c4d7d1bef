//! # Database Migrations
//!
//! Embedded, forward-only schema steps for the medicine cabinet store.
//!
//! ## How Migrations Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Migration Process                                  │
//! │                                                                         │
//! │  Store opened                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Check _sqlx_migrations table (one row per applied version)            │
//! │       │                                                                 │
//! │       ├── Table doesn't exist? Create it                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Compare embedded migrations vs applied                                │
//! │       │                                                                 │
//! │       ├── 001_initial_schema.sql   ✓ (already applied)                │
//! │       ├── 002_package_tags.sql     ✓ (already applied)                │
//! │       ├── 003_registry_fields.sql  ⬜ (NEW - needs to run)             │
//! │       └── 004_indexes.sql          ⬜ (NEW - needs to run)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Run pending migrations in order, each exactly once                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Create a new file in `migrations/sqlite/` with the next sequence number
//! 2. Name format: `NNN_description.sql` (e.g., `005_package_notes.sql`)
//! 3. **NEVER** modify existing migrations - the checksum is recorded

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

/// Embedded migrations from the `migrations/sqlite` directory.
///
/// ## Directory Structure
/// ```text
/// migrations/sqlite/
/// ├── 001_initial_schema.sql   # tags, products, product tags, packages
/// ├── 002_package_tags.sql     # package tags
/// ├── 003_registry_fields.sql  # registry columns, barcodes
/// ├── 004_indexes.sql          # lookup indexes
/// └── 005_tag_name_key.sql     # unicode case-folded tag key
/// ```
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations.
///
/// Idempotent: safe on every start. A failure surfaces as
/// `DbError::MigrationFailed` and the store must not be used.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!(
        version = MIGRATOR.migrations.last().map(|m| m.version).unwrap_or(0),
        "All migrations applied successfully"
    );
    Ok(())
}

/// Returns information about migrations.
///
/// ## Returns
/// Tuple of (total_migrations, applied_migrations)
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    // A store that never ran migrations has no bookkeeping table yet
    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    debug!(total, applied, "Migration status");
    Ok((total, applied as usize))
}

/// Highest successfully applied schema version, 0 for a fresh store.
pub async fn schema_version(pool: &SqlitePool) -> DbResult<i64> {
    let version: Option<i64> =
        sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await
            .unwrap_or(None);

    Ok(version.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_fresh_store_has_version_zero() {
        let pool = memory_pool().await;
        assert_eq!(schema_version(&pool).await.unwrap(), 0);
        assert_eq!(migration_status(&pool).await.unwrap().1, 0);
    }

    #[tokio::test]
    async fn test_migrations_apply_once() {
        let pool = memory_pool().await;

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let (total, applied) = migration_status(&pool).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(applied, 5);
        assert_eq!(schema_version(&pool).await.unwrap(), 5);
    }
}
