//! # Application State
//!
//! - [`AppState`] - store handle, configuration and operation slot
//! - [`AppConfig`] - settings loaded at startup
//! - [`OperationState`] - progress of export/import/download/wipe

mod app;
mod config;
mod operation;

pub use app::AppState;
pub use config::{
    AppConfig, ConfigError, DatabaseSettings, ExportSettings, CONFIG_FILE_NAME, IN_MEMORY_PATH,
};
pub use operation::{OperationKind, OperationOutcome, OperationState, OperationStatus};
