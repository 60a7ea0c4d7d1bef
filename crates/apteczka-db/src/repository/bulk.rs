//! # Bulk Repository
//!
//! Whole-table dump and restore, used by workbook export/import and by
//! "delete all data".
//!
//! ## Restore Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  dedicated connection                                                   │
//! │  PRAGMA foreign_keys = OFF     (has no effect inside a transaction)     │
//! │  BEGIN                                                                  │
//! │    DELETE child-first:  meds_tags → meds → meds_packaging →             │
//! │                         meds_metadata_tags → meds_metadata → tags       │
//! │    INSERT parent-first: tags → meds_metadata → meds_metadata_tags →     │
//! │                         meds_packaging → meds → meds_tags               │
//! │    refold tag name keys                                                │
//! │    PRAGMA foreign_key_check   (any row → error → ROLLBACK)              │
//! │  COMMIT                                                                 │
//! │  PRAGMA foreign_keys = ON      (always, success or failure)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Columns come from the live schema, not from the dump: unknown dump
//! columns are ignored and columns missing from the dump are NULL.
//! Derived columns (`tags.name_key`) are neither dumped nor restored; they
//! are recomputed after the rows are in.

use serde::{Deserialize, Serialize};
use sqlx::{Connection, Row, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::tag::refresh_name_keys;
use crate::error::{DbError, DbResult};
use crate::value::{bind_value, to_row_set, SqlValue};
use apteczka_core::ValidationError;

/// Tables in the order they are written to a workbook.
pub const TABLES_EXPORT_ORDER: [&str; 6] = [
    "tags",
    "meds_metadata",
    "meds_metadata_tags",
    "meds_packaging",
    "meds",
    "meds_tags",
];

/// Parent-to-child insert order.
pub const TABLES_IMPORT_ORDER: [&str; 6] = TABLES_EXPORT_ORDER;

/// Child-first delete order.
pub const TABLES_WIPE_ORDER: [&str; 6] = [
    "meds_tags",
    "meds",
    "meds_packaging",
    "meds_metadata_tags",
    "meds_metadata",
    "tags",
];

/// Columns the store computes itself.
const DERIVED_COLUMNS: [(&str, &str); 1] = [("tags", "name_key")];

/// One column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
}

/// Every row of one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDump {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl TableDump {
    /// An empty dump of a table.
    pub fn empty(table: impl Into<String>) -> Self {
        TableDump {
            table: table.into(),
            ..Default::default()
        }
    }
}

/// Rows written per table by [`BulkRepository::replace_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCount {
    pub table: String,
    pub rows: usize,
}

/// Repository for whole-table operations.
#[derive(Debug, Clone)]
pub struct BulkRepository {
    pool: SqlitePool,
}

impl BulkRepository {
    /// Creates a new BulkRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BulkRepository { pool }
    }

    /// Columns of a managed table, in declaration order.
    pub async fn table_columns(&self, table: &str) -> DbResult<Vec<ColumnInfo>> {
        let mut conn = self.pool.acquire().await?;
        columns_of(&mut conn, table).await
    }

    /// Reads every row of a managed table.
    pub async fn dump_table(&self, table: &str) -> DbResult<TableDump> {
        let mut conn = self.pool.acquire().await?;

        let columns: Vec<String> = columns_of(&mut conn, table)
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect();

        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            quoted_list(&columns),
            quote_ident(table)
        );
        let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
        let rows = to_row_set(&rows)?.rows;

        debug!(table = %table, rows = rows.len(), "Table dumped");
        Ok(TableDump {
            table: table.to_string(),
            columns,
            rows,
        })
    }

    /// Replaces the content of every managed table with the dumps.
    ///
    /// Tables without a dump end up empty. All-or-nothing: on any error,
    /// including references to missing parents, the store is unchanged.
    pub async fn replace_all(&self, dumps: &[TableDump]) -> DbResult<Vec<TableCount>> {
        for dump in dumps {
            if !TABLES_IMPORT_ORDER.contains(&dump.table.as_str()) {
                warn!(table = %dump.table, "Ignoring dump of unknown table");
            }
        }

        let mut conn = self.pool.acquire().await?;

        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await?;

        let result = replace_in_transaction(&mut conn, dumps).await;

        let restored = sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut *conn)
            .await;

        let counts = result?;
        restored?;

        info!(
            tables = counts.len(),
            rows = counts.iter().map(|c| c.rows).sum::<usize>(),
            "Store replaced from dump"
        );
        Ok(counts)
    }

    /// Deletes every row of every managed table.
    pub async fn wipe(&self) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        for table in TABLES_WIPE_ORDER {
            let sql = format!("DELETE FROM {}", quote_ident(table));
            sqlx::query(&sql).execute(&mut *tx).await?;
        }

        tx.commit().await?;

        info!("All data deleted");
        Ok(())
    }
}

async fn replace_in_transaction(
    conn: &mut SqliteConnection,
    dumps: &[TableDump],
) -> DbResult<Vec<TableCount>> {
    let mut tx = conn.begin().await?;

    for table in TABLES_WIPE_ORDER {
        let sql = format!("DELETE FROM {}", quote_ident(table));
        sqlx::query(&sql).execute(&mut *tx).await?;
    }

    let mut counts = Vec::with_capacity(TABLES_IMPORT_ORDER.len());

    for table in TABLES_IMPORT_ORDER {
        let Some(dump) = dumps.iter().find(|d| d.table == table) else {
            counts.push(TableCount {
                table: table.to_string(),
                rows: 0,
            });
            continue;
        };

        let live = columns_of(&mut tx, table).await?;
        let source_index: Vec<Option<usize>> = live
            .iter()
            .map(|col| dump.columns.iter().position(|c| c.trim() == col.name))
            .collect();

        let names: Vec<String> = live.iter().map(|c| c.name.clone()).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            quoted_list(&names),
            vec!["?"; names.len()].join(", ")
        );

        let mut written = 0;
        for row in &dump.rows {
            if row.iter().all(SqlValue::is_null) {
                continue;
            }

            let mut query = sqlx::query(&sql);
            for (col, index) in live.iter().zip(&source_index) {
                let value = index
                    .and_then(|i| row.get(i).cloned())
                    .unwrap_or(SqlValue::Null)
                    .coerce_to(&col.declared_type);
                query = bind_value(query, &value);
            }
            query.execute(&mut *tx).await?;
            written += 1;
        }

        debug!(table = %table, rows = written, "Table restored");
        counts.push(TableCount {
            table: table.to_string(),
            rows: written,
        });
    }

    refresh_name_keys(&mut tx).await?;

    let dangling = sqlx::query("PRAGMA foreign_key_check")
        .fetch_all(&mut *tx)
        .await?;

    if let Some(first) = dangling.first() {
        let table: String = first.try_get(0).unwrap_or_default();
        let parent: String = first.try_get(2).unwrap_or_default();
        return Err(DbError::ForeignKeyViolation {
            message: format!(
                "{} row(s) reference missing parents (first: {} -> {})",
                dangling.len(),
                table,
                parent
            ),
        });
    }

    tx.commit().await?;
    Ok(counts)
}

async fn columns_of(conn: &mut SqliteConnection, table: &str) -> DbResult<Vec<ColumnInfo>> {
    if !TABLES_EXPORT_ORDER.contains(&table) {
        return Err(ValidationError::invalid_format("table", format!("unknown table '{}'", table)).into());
    }

    let sql = format!("PRAGMA table_info({})", quote_ident(table));
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get("name")?;
        if DERIVED_COLUMNS.contains(&(table, name.as_str())) {
            continue;
        }
        columns.push(ColumnInfo {
            name,
            declared_type: row.try_get("type")?,
        });
    }

    Ok(columns)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quoted_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n))
        .collect::<Vec<_>>()
        .join(", ")
}
