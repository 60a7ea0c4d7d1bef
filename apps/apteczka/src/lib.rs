//! # Apteczka Application Library
//!
//! Composition root of the medication inventory: loads configuration,
//! initializes logging, opens the store and exposes the command layer a
//! UI shell drives.
//!
//! ## Module Organization
//! ```text
//! apteczka/
//! ├── lib.rs            ◄─── You are here (tracing setup, re-exports)
//! ├── state/
//! │   ├── mod.rs        ◄─── State type exports
//! │   ├── app.rs        ◄─── AppState: store handle + config + operation slot
//! │   ├── config.rs     ◄─── AppConfig (toml file + environment)
//! │   └── operation.rs  ◄─── Settings operation state machine
//! ├── commands/
//! │   ├── inventory.rs  ◄─── List/search/filter/sort
//! │   ├── product.rs    ◄─── Products and barcode lookup
//! │   ├── package.rs    ◄─── Package form
//! │   ├── tags.rs       ◄─── Tags
//! │   └── settings.rs   ◄─── Export/import/registry/wipe
//! └── error.rs          ◄─── API error type for commands
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load configuration (defaults → `apteczka.toml` → `APTECZKA_*`)
//! 3. Open the store and run migrations (`AppState::open`)
//! 4. Hand the state to the shell
//!
//! ```rust,ignore
//! apteczka::init_tracing();
//! let config = AppConfig::load_or_default(None);
//! let state = AppState::open(config).await?;
//! ```

pub mod commands;
pub mod error;
pub mod state;

use tracing_subscriber::EnvFilter;

pub use error::{ApiError, ApiResult, ErrorCode, StartupError};
pub use state::{AppConfig, AppState, OperationOutcome, OperationStatus};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,apteczka=debug,sqlx=warn";

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=apteczka_db=trace` - Show trace for the store only
/// - Default: [`DEFAULT_LOG_FILTER`]
///
/// Calling it again (tests, a shell that already set a subscriber) is a
/// no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
