//! # Workbook Export / Import
//!
//! The whole store as one `.xlsx` file: one sheet per table, named after
//! the table, with column names in the first row.
//!
//! ## Cell Mapping
//! ```text
//! ┌──────────────────┬──────────────────┬──────────────────────────────┐
//! │ SqlValue         │ written as       │ read back as                 │
//! ├──────────────────┼──────────────────┼──────────────────────────────┤
//! │ Null             │ (empty cell)     │ Null                         │
//! │ Integer / Real   │ number           │ Real (coerced on import)     │
//! │ Text             │ string           │ Text                         │
//! └──────────────────┴──────────────────┴──────────────────────────────┘
//! ```
//!
//! Spreadsheet files are read and written on the blocking thread pool.

use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::Utc;
use rust_xlsxwriter::Workbook;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{TransferError, TransferResult};
use apteczka_db::{Database, SqlValue, TableCount, TableDump, TABLES_EXPORT_ORDER};

/// Sheets an import cannot do without.
pub const REQUIRED_SHEETS: [&str; 2] = ["meds", "meds_metadata"];

/// Result of an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub tables: Vec<TableCount>,
}

/// Result of an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub tables: Vec<TableCount>,
}

impl ImportSummary {
    /// Rows written across all tables.
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// `apteczka-<unix millis>.xlsx` inside `dir`.
pub fn default_export_path(dir: &Path) -> PathBuf {
    dir.join(format!("apteczka-{}.xlsx", Utc::now().timestamp_millis()))
}

/// Writes every table of the store to `path`.
pub async fn export_workbook(db: &Database, path: &Path) -> TransferResult<ExportSummary> {
    let bulk = db.bulk();

    let mut dumps = Vec::with_capacity(TABLES_EXPORT_ORDER.len());
    for table in TABLES_EXPORT_ORDER {
        dumps.push(bulk.dump_table(table).await?);
    }

    let tables: Vec<TableCount> = dumps
        .iter()
        .map(|d| TableCount {
            table: d.table.clone(),
            rows: d.rows.len(),
        })
        .collect();

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_workbook(&target, &dumps))
        .await
        .map_err(|e| TransferError::Workbook(e.to_string()))??;

    info!(path = %path.display(), tables = tables.len(), "Workbook exported");
    Ok(ExportSummary {
        path: path.to_path_buf(),
        tables,
    })
}

/// Replaces the store content with the workbook at `path`.
///
/// ## Errors
/// `MissingSheets` when `meds` or `meds_metadata` is absent; the store is
/// not touched in that case. Other sheets are optional and import empty.
pub async fn import_workbook(db: &Database, path: &Path) -> TransferResult<ImportSummary> {
    let source = path.to_path_buf();
    let dumps = tokio::task::spawn_blocking(move || read_workbook(&source))
        .await
        .map_err(|e| TransferError::Workbook(e.to_string()))??;

    let missing: Vec<String> = REQUIRED_SHEETS
        .into_iter()
        .filter(|sheet| !dumps.iter().any(|d| d.table == *sheet))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(TransferError::MissingSheets(missing));
    }

    let tables = db.bulk().replace_all(&dumps).await?;

    info!(path = %path.display(), "Workbook imported");
    Ok(ImportSummary { tables })
}

/// Writes dumps to an `.xlsx` file, one sheet each.
pub fn write_workbook(path: &Path, dumps: &[TableDump]) -> TransferResult<()> {
    let mut workbook = Workbook::new();

    for dump in dumps {
        let sheet = workbook.add_worksheet();
        sheet.set_name(&dump.table)?;

        for (col, name) in dump.columns.iter().enumerate() {
            sheet.write_string(0, col as u16, name)?;
        }

        for (row_index, row) in dump.rows.iter().enumerate() {
            let row_number = row_index as u32 + 1;
            for (col, value) in row.iter().enumerate() {
                let col = col as u16;
                match value {
                    SqlValue::Null => {}
                    SqlValue::Integer(i) => {
                        sheet.write_number(row_number, col, *i as f64)?;
                    }
                    SqlValue::Real(f) => {
                        sheet.write_number(row_number, col, *f)?;
                    }
                    SqlValue::Text(s) => {
                        sheet.write_string(row_number, col, s)?;
                    }
                }
            }
        }

        debug!(sheet = %dump.table, rows = dump.rows.len(), "Sheet written");
    }

    workbook.save(path)?;
    Ok(())
}

/// Reads every sheet of an `.xlsx` file as a table dump.
pub fn read_workbook(path: &Path) -> TransferResult<Vec<TableDump>> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;

    let mut dumps = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let mut rows = range.rows();

        let Some(header) = rows.next() else {
            dumps.push(TableDump::empty(name));
            continue;
        };

        let columns: Vec<String> = header.iter().map(header_text).collect();
        let data: Vec<Vec<SqlValue>> = rows
            .map(|row| row.iter().map(cell_value).collect())
            .collect();

        debug!(sheet = %name, rows = data.len(), "Sheet read");
        dumps.push(TableDump {
            table: name,
            columns,
            rows: data,
        });
    }

    Ok(dumps)
}

fn header_text(cell: &Data) -> String {
    match cell_value(cell) {
        SqlValue::Text(s) => s.trim().to_string(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Real(f) => f.to_string(),
        SqlValue::Null => String::new(),
    }
}

fn cell_value(cell: &Data) -> SqlValue {
    match cell {
        Data::Empty => SqlValue::Null,
        Data::Int(i) => SqlValue::Integer(*i),
        Data::Float(f) => SqlValue::Real(*f),
        Data::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Data::String(s) => SqlValue::Text(s.clone()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => SqlValue::Text(s.clone()),
        Data::DateTime(dt) => SqlValue::Real(dt.as_f64()),
        Data::Error(e) => SqlValue::Text(e.to_string()),
    }
}
