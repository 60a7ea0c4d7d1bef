//! # apteczka-transfer: Bulk Transfer for Apteczka
//!
//! Moves data in and out of the store in bulk: spreadsheet backups and the
//! public medicine registry.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Transfer Operations                              │
//! │                                                                         │
//! │  export_workbook ──► BulkRepository::dump_table × 6 ──► .xlsx           │
//! │                                                                         │
//! │  import_workbook ◄── .xlsx                                              │
//! │       │  required sheets present?  no ──► MissingSheets (store intact)  │
//! │       ▼                                                                 │
//! │  BulkRepository::replace_all (one transaction)                          │
//! │                                                                         │
//! │  ingest_feed ──► RegistryClient::fetch ──► parse_feed                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  MedicationRepository::import_medicine per row (abortable)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`workbook`] - `.xlsx` export and import
//! - [`registry`] - Registry download, parsing and ingestion
//! - [`abort`] - Cooperative cancellation
//! - [`config`] - Registry settings
//! - [`error`] - Transfer error types

pub mod abort;
pub mod config;
pub mod error;
pub mod registry;
pub mod workbook;

pub use abort::{abort_pair, AbortHandle, AbortSignal};
pub use config::RegistryConfig;
pub use error::{TransferError, TransferResult};
pub use registry::{
    ingest_feed, ingest_records, parse_feed, FeedProgress, FeedReport, FeedStatus, RegistryClient,
};
pub use workbook::{
    default_export_path, export_workbook, import_workbook, read_workbook, ExportSummary,
    ImportSummary,
};
