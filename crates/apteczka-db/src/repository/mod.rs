//! # Repository Module
//!
//! Database repository implementations for the medicine cabinet.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Command layer                                                         │
//! │       │                                                                 │
//! │       │  db.packages().add_medication_package(..)                      │
//! │       ▼                                                                 │
//! │  PackageRepository                                                     │
//! │  ├── BEGIN                                                             │
//! │  ├── INSERT INTO meds ...                                              │
//! │  ├── INSERT OR IGNORE INTO meds_tags ... (per tag)                     │
//! │  └── COMMIT  (any error: transaction dropped → ROLLBACK)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation that writes more than one row of related entities does
//! so inside a single transaction.
//!
//! ## Available Repositories
//!
//! - [`TagRepository`](tag::TagRepository) - Tag dictionary
//! - [`MedicationRepository`](medication::MedicationRepository) - Products, barcodes, registry upsert
//! - [`PackageRepository`](package::PackageRepository) - Physical packages and their tags
//! - [`InventoryRepository`](inventory::InventoryRepository) - List/search/sort read model
//! - [`BulkRepository`](bulk::BulkRepository) - Whole-table dump and restore

pub mod bulk;
pub mod inventory;
pub mod medication;
pub mod package;
pub mod tag;

use sqlx::SqliteConnection;

use crate::error::DbResult;

/// Owner side of a tag association table.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TagLink {
    Product,
    Package,
}

impl TagLink {
    fn table(self) -> &'static str {
        match self {
            TagLink::Product => "meds_metadata_tags",
            TagLink::Package => "meds_tags",
        }
    }

    fn owner_column(self) -> &'static str {
        match self {
            TagLink::Product => "metadata_uuid",
            TagLink::Package => "package_uuid",
        }
    }
}

/// Inserts one association row per tag id, ignoring duplicates.
pub(crate) async fn link_tags(
    conn: &mut SqliteConnection,
    link: TagLink,
    owner: &str,
    tag_ids: &[String],
) -> DbResult<()> {
    let sql = format!(
        "INSERT OR IGNORE INTO {} ({}, tag_uuid) VALUES (?1, ?2)",
        link.table(),
        link.owner_column()
    );

    for tag_id in tag_ids {
        sqlx::query(&sql)
            .bind(owner)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Removes every association row of one owner.
pub(crate) async fn unlink_all_tags(
    conn: &mut SqliteConnection,
    link: TagLink,
    owner: &str,
) -> DbResult<u64> {
    let sql = format!(
        "DELETE FROM {} WHERE {} = ?1",
        link.table(),
        link.owner_column()
    );

    let result = sqlx::query(&sql).bind(owner).execute(&mut *conn).await?;
    Ok(result.rows_affected())
}
