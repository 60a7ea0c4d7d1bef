//! # Dynamic SQL Values
//!
//! [`SqlValue`] is the parameter and cell type of the generic query
//! primitives and of whole-table transfer, where column sets are only known
//! at runtime.
//!
//! ## SQLite Storage Classes
//! ```text
//! ┌──────────────┬──────────────────────┐
//! │ SQLite       │ SqlValue             │
//! ├──────────────┼──────────────────────┤
//! │ NULL         │ Null                 │
//! │ INTEGER      │ Integer(i64)         │
//! │ REAL         │ Real(f64)            │
//! │ TEXT         │ Text(String)         │
//! │ BLOB         │ Text (lossy UTF-8)   │
//! └──────────────┴──────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::error::DbResult;

/// A single SQLite value of any storage class.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    /// Returns true for [`SqlValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts the value to the affinity of a column's declared type.
    ///
    /// Spreadsheets hand every number back as a float and may hold
    /// numbers in text columns; this undoes both so a re-imported row
    /// compares equal to the exported one.
    pub fn coerce_to(self, declared_type: &str) -> SqlValue {
        let declared = declared_type.to_ascii_uppercase();

        if declared.contains("INT") {
            return match self {
                SqlValue::Real(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                    SqlValue::Integer(f as i64)
                }
                SqlValue::Text(s) => match s.trim().parse::<i64>() {
                    Ok(i) => SqlValue::Integer(i),
                    Err(_) if s.trim().is_empty() => SqlValue::Null,
                    Err(_) => SqlValue::Text(s),
                },
                other => other,
            };
        }

        if declared.contains("TEXT") || declared.contains("CHAR") || declared.contains("CLOB") {
            return match self {
                SqlValue::Integer(i) => SqlValue::Text(i.to_string()),
                SqlValue::Real(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                    SqlValue::Text((f as i64).to_string())
                }
                SqlValue::Real(f) => SqlValue::Text(f.to_string()),
                other => other,
            };
        }

        self
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// Column names plus rows of an untyped query result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

// =============================================================================
// Binding / decoding helpers
// =============================================================================

pub(crate) fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(Option::<String>::None),
        SqlValue::Integer(i) => query.bind(*i),
        SqlValue::Real(f) => query.bind(*f),
        SqlValue::Text(s) => query.bind(s.clone()),
    }
}

pub(crate) fn bind_value_as<'q, O>(
    query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    value: &SqlValue,
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(Option::<String>::None),
        SqlValue::Integer(i) => query.bind(*i),
        SqlValue::Real(f) => query.bind(*f),
        SqlValue::Text(s) => query.bind(s.clone()),
    }
}

/// Decodes one column of a row by its runtime storage class.
pub(crate) fn value_at(row: &SqliteRow, index: usize) -> DbResult<SqlValue> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }

    let type_name = raw.type_info().name().to_string();
    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => SqlValue::Integer(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" => SqlValue::Real(row.try_get_unchecked::<f64, _>(index)?),
        "BLOB" => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
            SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => SqlValue::Text(row.try_get_unchecked::<String, _>(index)?),
    };

    Ok(value)
}

/// Converts fetched rows into a [`RowSet`].
pub(crate) fn to_row_set(rows: &[SqliteRow]) -> DbResult<RowSet> {
    let columns = rows
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect()
        })
        .unwrap_or_default();

    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        let mut cells = Vec::with_capacity(row.len());
        for index in 0..row.len() {
            cells.push(value_at(row, index)?);
        }
        values.push(cells);
    }

    Ok(RowSet {
        columns,
        rows: values,
    })
}
