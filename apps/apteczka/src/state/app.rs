//! # Application State
//!
//! The composition root: one explicitly constructed store handle plus the
//! loaded configuration and the settings operation slot. Every command
//! takes `&AppState`.
//!
//! ## Thread Safety
//! `Database` wraps a `SqlitePool`, which is thread-safe; multiple commands
//! can run queries concurrently without explicit locking. Cloning an
//! `AppState` is cheap and shares everything.

use std::sync::Arc;
use tracing::info;

use super::config::AppConfig;
use super::operation::OperationState;
use crate::error::StartupError;
use apteczka_db::Database;
use apteczka_transfer::RegistryConfig;

#[derive(Debug, Clone)]
pub struct AppState {
    db: Database,
    config: Arc<AppConfig>,
    operation: OperationState,
}

impl AppState {
    /// Opens the store described by `config`.
    ///
    /// ## Startup Sequence
    /// 1. Validate the configuration
    /// 2. Create the data directory for a file-backed store
    /// 3. Connect and run migrations (a failed migration is fatal)
    ///
    /// The export directory is created on first export.
    pub async fn open(config: AppConfig) -> Result<Self, StartupError> {
        config.validate()?;

        if !config.is_in_memory() {
            if let Some(parent) = config.database.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::new(config.db_config()).await?;
        let version = db.schema_version().await?;

        info!(
            path = %config.database.path.display(),
            schema_version = version,
            "Store opened"
        );

        Ok(AppState {
            db,
            config: Arc::new(config),
            operation: OperationState::new(),
        })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &RegistryConfig {
        &self.config.registry
    }

    /// Settings operation slot.
    pub fn operation(&self) -> &OperationState {
        &self.operation
    }

    /// Closes the pool. Further commands fail.
    pub async fn close(&self) {
        self.db.close().await;
    }
}
