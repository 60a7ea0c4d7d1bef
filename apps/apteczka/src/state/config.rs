//! # Application Configuration
//!
//! Settings loaded once at startup.
//!
//! ## Configuration Sources (later overrides earlier)
//! 1. Defaults (this file)
//! 2. Config file (`apteczka.toml` in the platform config directory)
//! 3. Environment variables (`APTECZKA_*`)
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/home/me/.local/share/apteczka/apteczka.db"
//! max_connections = 5
//!
//! [registry]
//! url = "https://rejestrymedyczne.ezdrowie.gov.pl/api/rpl/medicinal-products/public-pl-report/get-csv"
//! timeout_secs = 120
//!
//! [export]
//! directory = "/home/me/.local/share/apteczka/exports"
//! ```
//!
//! Configuration is read-only after startup, so no lock is needed.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use apteczka_db::DbConfig;
use apteczka_transfer::{RegistryConfig, TransferError};

/// Config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "apteczka.toml";

/// Store file name inside the platform data directory.
pub const DATABASE_FILE_NAME: &str = "apteczka.db";

/// Path value selecting a throwaway in-memory store.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    #[error("Failed to save config: {0}")]
    SaveFailed(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}

impl From<TransferError> for ConfigError {
    fn from(err: TransferError) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Store file. `:memory:` selects an in-memory store.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// `[export]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Directory workbook exports are written to.
    #[serde(default = "default_export_directory")]
    pub directory: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        ExportSettings {
            directory: default_export_directory(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub export: ExportSettings,
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("pl", "apteczka", "apteczka")
}

fn default_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DATABASE_FILE_NAME))
}

fn default_export_directory() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("exports"))
        .unwrap_or_else(|| PathBuf::from("exports"))
}

fn default_max_connections() -> u32 {
    5
}

impl AppConfig {
    /// Configuration for tests and throwaway sessions: in-memory store,
    /// exports under `export_dir`.
    pub fn in_memory(export_dir: impl Into<PathBuf>) -> Self {
        AppConfig {
            database: DatabaseSettings {
                path: PathBuf::from(IN_MEMORY_PATH),
                max_connections: 1,
            },
            registry: RegistryConfig::default(),
            export: ExportSettings {
                directory: export_dir.into(),
            },
        }
    }

    /// Loads configuration from file, environment, and defaults.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> Result<(), ConfigError> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.export.directory.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("export.directory must not be empty".into()));
        }

        self.registry.validate()?;

        Ok(())
    }

    /// True when the store lives in memory only.
    pub fn is_in_memory(&self) -> bool {
        self.database.path.as_os_str() == IN_MEMORY_PATH
    }

    /// Pool settings for [`apteczka_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        if self.is_in_memory() {
            DbConfig::in_memory()
        } else {
            DbConfig::new(self.database.path.clone()).max_connections(self.database.max_connections)
        }
    }

    /// Export directory.
    pub fn export_dir(&self) -> &Path {
        &self.export.directory
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("APTECZKA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(url) = std::env::var("APTECZKA_REGISTRY_URL") {
            debug!(url = %url, "Overriding registry URL from environment");
            self.registry.url = url;
        }

        if let Ok(dir) = std::env::var("APTECZKA_EXPORT_DIR") {
            self.export.directory = PathBuf::from(dir);
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.database.path.ends_with(DATABASE_FILE_NAME));
        assert_eq!(config.database.max_connections, 5);
        assert!(!config.is_in_memory());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/meds.db"

            [registry]
            timeout_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/meds.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.registry.timeout_secs, 30);
        assert_eq!(config.registry.human_flag, "ludzki");
        assert_eq!(config.export, ExportSettings::default());
    }

    #[test]
    fn test_save_then_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = AppConfig::in_memory(dir.path().join("out"));
        config.registry.timeout_secs = 45;
        config.save(Some(path.clone())).unwrap();

        let loaded: AppConfig =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.registry.url = "not a url".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_in_memory_selects_single_connection_pool() {
        let config = AppConfig::in_memory("/tmp/exports");
        assert!(config.is_in_memory());
        assert_eq!(config.db_config().max_connections, 1);
        assert_eq!(config.export_dir(), Path::new("/tmp/exports"));
    }
}
