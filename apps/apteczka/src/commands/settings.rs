//! # Settings Commands
//!
//! Whole-store operations: workbook export/import, registry download and
//! wipe. Each runs through the [`OperationState`](crate::state::OperationState)
//! slot, so only one runs at a time and the shell can show its progress and
//! final outcome.
//!
//! ## Flow
//! ```text
//! begin(kind) ──► work ──► finish(Success | Cancelled | Error) ──► dismiss()
//!     │
//!     └── rejected with OPERATION_IN_PROGRESS while another one runs
//! ```
//!
//! Every command also returns its result directly; failures are both
//! recorded in the slot and returned as `ApiError`.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, OperationKind, OperationOutcome, OperationStatus};
use apteczka_transfer::{
    default_export_path, export_workbook, import_workbook, ingest_feed, ExportSummary,
    FeedReport, FeedStatus, ImportSummary, TransferError,
};

/// Records the result of a finished operation in the slot.
fn settle<T, E>(state: &AppState, result: &Result<T, E>, success: impl FnOnce(&T) -> String)
where
    E: std::fmt::Display,
{
    match result {
        Ok(value) => state
            .operation()
            .finish(OperationOutcome::Success, success(value)),
        Err(e) => state
            .operation()
            .finish(OperationOutcome::Error, e.to_string()),
    }
}

/// Writes the whole store to a new workbook in the export directory.
pub async fn export_data(state: &AppState) -> ApiResult<ExportSummary> {
    state
        .operation()
        .begin(OperationKind::Export, "Exporting data")?;

    let result = export_to(state, state.config().export_dir()).await;
    settle(state, &result, |summary| {
        format!(
            "Exported {} rows to {}",
            summary.tables.iter().map(|t| t.rows).sum::<usize>(),
            summary.path.display()
        )
    });

    Ok(result?)
}

async fn export_to(state: &AppState, dir: &Path) -> Result<ExportSummary, TransferError> {
    std::fs::create_dir_all(dir)?;
    let path = default_export_path(dir);
    export_workbook(state.db(), &path).await
}

/// Replaces the store content with the workbook at `path`.
pub async fn import_data(state: &AppState, path: impl Into<PathBuf>) -> ApiResult<ImportSummary> {
    let path = path.into();
    state
        .operation()
        .begin(OperationKind::Import, format!("Importing {}", path.display()))?;

    let result = import_workbook(state.db(), &path).await;
    settle(state, &result, |summary| {
        format!("Imported {} rows", summary.total_rows())
    });

    Ok(result?)
}

/// Downloads the public registry feed and upserts every human medicine.
///
/// Runs until done or until [`cancel_operation`] is called. Cancellation
/// is not an error: the report comes back with `FeedStatus::Cancelled` and
/// the slot ends in `Cancelled`. Rows ingested before the cancel stay.
pub async fn download_registry(state: &AppState) -> ApiResult<FeedReport> {
    let operation = state.operation();
    let signal = operation.begin(OperationKind::RegistryDownload, "Downloading registry")?;

    let result = ingest_feed(state.db(), state.registry(), signal, |progress| {
        operation.set_message(format!(
            "Processed {} / {} rows",
            progress.processed, progress.total
        ));
    })
    .await;

    match &result {
        Ok(report) if report.status == FeedStatus::Cancelled => operation.finish(
            OperationOutcome::Cancelled,
            format!("Cancelled after {} rows", report.rows_seen),
        ),
        _ => settle(state, &result, |report| {
            format!(
                "Imported {} medicines ({} new), skipped {}",
                report.ingested, report.created, report.skipped
            )
        }),
    }

    Ok(result?)
}

/// Deletes every row of every table.
pub async fn wipe_data(state: &AppState) -> ApiResult<()> {
    state
        .operation()
        .begin(OperationKind::Wipe, "Deleting all data")?;

    let result = state.db().bulk().wipe().await;
    settle(state, &result, |_| "All data deleted".to_string());

    result?;
    info!("Store wiped");
    Ok(())
}

/// Requests cancellation of the running operation.
///
/// ## Errors
/// `VALIDATION_ERROR` when nothing is running.
pub fn cancel_operation(state: &AppState) -> ApiResult<()> {
    if state.operation().cancel() {
        Ok(())
    } else {
        Err(ApiError::validation("No operation is running"))
    }
}

pub fn operation_status(state: &AppState) -> OperationStatus {
    state.operation().status()
}

/// Acknowledges the finished operation.
pub fn dismiss_operation(state: &AppState) -> ApiResult<()> {
    state.operation().dismiss()
}
