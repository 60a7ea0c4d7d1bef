//! # Medication Repository
//!
//! Product metadata ("what the medicine is"), its tags and its barcodes.
//!
//! ## Registry Upsert
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 import_medicine(record) - one transaction               │
//! │                                                                         │
//! │  SELECT uuid FROM meds_metadata WHERE name = record name               │
//! │       │                                                                 │
//! │       ├── found ──► merge description (no repeated lines)              │
//! │       │             overwrite registry fields                          │
//! │       │             DELETE its barcodes                                │
//! │       │                                                                 │
//! │       └── absent ─► INSERT new product with registry fields            │
//! │                                                                         │
//! │  INSERT OR IGNORE parsed barcodes                                      │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Barcode Lookup
//! Stored and scanned codes match when either one ends with the other
//! (EAN-13 vs GTIN-14, partially typed codes). A code owned by more than
//! one product is reported as [`DbError::MultipleMatches`].

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{link_tags, unlink_all_tags, TagLink};
use crate::error::{DbError, DbResult};
use apteczka_core::barcode::{barcodes_match, normalize_barcode, parse_packaging};
use apteczka_core::{merge_description, MedicationMetadata, RegistryRecord};

const METADATA_COLUMNS: &str = "uuid, name, description, product_id, product_name, \
     previous_name, administration_route, strength, pharmaceutical_form, \
     active_substance, leaflet, label_leaflet";

/// Result of upserting one registry row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    /// Product the row was stored under.
    pub uuid: String,
    /// True when a new product was created.
    pub created: bool,
    /// Barcodes now associated with the product.
    pub barcodes: Vec<String>,
}

/// Repository for product metadata operations.
#[derive(Debug, Clone)]
pub struct MedicationRepository {
    pool: SqlitePool,
}

impl MedicationRepository {
    /// Creates a new MedicationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MedicationRepository { pool }
    }

    /// Adds a product and attaches the given tags.
    ///
    /// A blank description is stored as NULL. Returns the new UUID.
    pub async fn add_medication_metadata(
        &self,
        name: &str,
        description: Option<&str>,
        tag_ids: &[String],
    ) -> DbResult<String> {
        let uuid = Uuid::new_v4().to_string();
        let description = description.map(str::trim).filter(|d| !d.is_empty());

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO meds_metadata (uuid, name, description) VALUES (?1, ?2, ?3)")
            .bind(&uuid)
            .bind(name)
            .bind(description)
            .execute(&mut *tx)
            .await?;

        link_tags(&mut tx, TagLink::Product, &uuid, tag_ids).await?;

        tx.commit().await?;

        info!(uuid = %uuid, name = %name, tags = tag_ids.len(), "Product added");
        Ok(uuid)
    }

    /// Gets a product by its UUID.
    pub async fn get_by_id(&self, uuid: &str) -> DbResult<Option<MedicationMetadata>> {
        let sql = format!("SELECT {} FROM meds_metadata WHERE uuid = ?1", METADATA_COLUMNS);

        let product = sqlx::query_as::<_, MedicationMetadata>(&sql)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Live product search: names containing `fragment`, ordered by name.
    pub async fn search_by_name(
        &self,
        fragment: &str,
        limit: u32,
    ) -> DbResult<Vec<MedicationMetadata>> {
        let fragment = fragment.trim();
        debug!(fragment = %fragment, limit, "Searching products");

        let sql = format!(
            "SELECT {} FROM meds_metadata \
             WHERE name LIKE '%' || ?1 || '%' \
             ORDER BY name COLLATE NOCASE \
             LIMIT ?2",
            METADATA_COLUMNS
        );

        let products = sqlx::query_as::<_, MedicationMetadata>(&sql)
            .bind(fragment)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Updates a product's name and description.
    pub async fn update(&self, uuid: &str, name: &str, description: Option<&str>) -> DbResult<()> {
        let description = description.map(str::trim).filter(|d| !d.is_empty());

        let result = sqlx::query("UPDATE meds_metadata SET name = ?1, description = ?2 WHERE uuid = ?3")
            .bind(name)
            .bind(description)
            .bind(uuid)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", uuid));
        }

        info!(uuid = %uuid, "Product updated");
        Ok(())
    }

    /// Replaces the product's tag set.
    pub async fn set_tags(&self, uuid: &str, tag_ids: &[String]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        unlink_all_tags(&mut tx, TagLink::Product, uuid).await?;
        link_tags(&mut tx, TagLink::Product, uuid, tag_ids).await?;

        tx.commit().await?;

        debug!(uuid = %uuid, tags = tag_ids.len(), "Product tags replaced");
        Ok(())
    }

    /// Deletes a product.
    ///
    /// Packages, barcodes and both tag association tables follow through
    /// `ON DELETE CASCADE`.
    pub async fn delete(&self, uuid: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM meds_metadata WHERE uuid = ?1")
            .bind(uuid)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", uuid));
        }

        info!(uuid = %uuid, "Product deleted");
        Ok(())
    }

    /// Barcodes associated with a product.
    pub async fn barcodes(&self, uuid: &str) -> DbResult<Vec<String>> {
        let codes = sqlx::query_scalar::<_, String>(
            "SELECT barcode FROM meds_packaging WHERE metadata_uuid = ?1 ORDER BY barcode",
        )
        .bind(uuid)
        .fetch_all(&self.pool)
        .await?;

        Ok(codes)
    }

    /// Number of products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM meds_metadata")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Upserts a registry row by product name.
    ///
    /// Re-importing the same row is idempotent: the description does not
    /// grow and the barcode set is replaced, not extended.
    pub async fn import_medicine(
        &self,
        record: &RegistryRecord,
        packaging_delimiter: &str,
    ) -> DbResult<ImportOutcome> {
        let name = record.metadata_name();
        if name.is_empty() {
            return Err(apteczka_core::ValidationError::required("name").into());
        }

        let barcodes = record
            .packaging
            .as_deref()
            .map(|text| parse_packaging(text, packaging_delimiter))
            .unwrap_or_default();
        let addition = record.description();

        let mut tx = self.pool.begin().await?;

        let existing: Option<(String, Option<String>)> = sqlx::query_as(
            "SELECT uuid, description FROM meds_metadata WHERE name = ?1 ORDER BY rowid LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&mut *tx)
        .await?;

        let (uuid, created) = match existing {
            Some((uuid, description)) => {
                let merged = merge_description(description.as_deref(), &addition);

                sqlx::query(
                    r#"
                    UPDATE meds_metadata SET
                        description = ?1,
                        product_id = ?2,
                        product_name = ?3,
                        previous_name = ?4,
                        administration_route = ?5,
                        strength = ?6,
                        pharmaceutical_form = ?7,
                        active_substance = ?8,
                        leaflet = ?9,
                        label_leaflet = ?10
                    WHERE uuid = ?11
                    "#,
                )
                .bind(merged)
                .bind(&record.product_id)
                .bind(&record.product_name)
                .bind(&record.previous_name)
                .bind(&record.administration_route)
                .bind(&record.strength)
                .bind(&record.pharmaceutical_form)
                .bind(&record.active_substance)
                .bind(&record.leaflet)
                .bind(&record.label_leaflet)
                .bind(&uuid)
                .execute(&mut *tx)
                .await?;

                sqlx::query("DELETE FROM meds_packaging WHERE metadata_uuid = ?1")
                    .bind(&uuid)
                    .execute(&mut *tx)
                    .await?;

                (uuid, false)
            }
            None => {
                let uuid = Uuid::new_v4().to_string();
                let description = merge_description(None, &addition);

                sqlx::query(
                    r#"
                    INSERT INTO meds_metadata (
                        uuid, name, description, product_id, product_name,
                        previous_name, administration_route, strength,
                        pharmaceutical_form, active_substance, leaflet, label_leaflet
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                    "#,
                )
                .bind(&uuid)
                .bind(name)
                .bind(description)
                .bind(&record.product_id)
                .bind(&record.product_name)
                .bind(&record.previous_name)
                .bind(&record.administration_route)
                .bind(&record.strength)
                .bind(&record.pharmaceutical_form)
                .bind(&record.active_substance)
                .bind(&record.leaflet)
                .bind(&record.label_leaflet)
                .execute(&mut *tx)
                .await?;

                (uuid, true)
            }
        };

        for code in &barcodes {
            sqlx::query("INSERT OR IGNORE INTO meds_packaging (metadata_uuid, barcode) VALUES (?1, ?2)")
                .bind(&uuid)
                .bind(code)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(
            uuid = %uuid,
            name = %name,
            created,
            barcodes = barcodes.len(),
            "Registry row imported"
        );

        Ok(ImportOutcome {
            uuid,
            created,
            barcodes,
        })
    }

    /// Finds the product owning a barcode.
    ///
    /// ## Returns
    /// * `Ok(Some(product))` - exactly one product matches
    /// * `Ok(None)` - no product matches
    /// * `Err(DbError::MultipleMatches)` - the code is ambiguous
    /// * `Err(DbError::Validation)` - the input is not a numeric code
    pub async fn find_medicine_by_barcode(
        &self,
        barcode: &str,
    ) -> DbResult<Option<MedicationMetadata>> {
        let code = normalize_barcode(barcode)?;

        // instr() compares literally, so `_` and `%` in stored codes match only themselves.
        let candidates = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT metadata_uuid, barcode
            FROM meds_packaging
            WHERE barcode <> ''
              AND (instr(barcode, ?1) > 0 OR instr(?1, barcode) > 0)
            "#,
        )
        .bind(&code)
        .fetch_all(&self.pool)
        .await?;

        let mut owners: Vec<String> = candidates
            .into_iter()
            .filter(|(_, stored)| barcodes_match(stored, &code))
            .map(|(uuid, _)| uuid)
            .collect();
        owners.sort();
        owners.dedup();

        match owners.as_slice() {
            [] => {
                debug!(barcode = %code, "No product for barcode");
                Ok(None)
            }
            [uuid] => self.get_by_id(uuid).await,
            _ => {
                warn!(barcode = %code, count = owners.len(), "Barcode matches several products");
                Err(DbError::MultipleMatches {
                    barcode: code,
                    count: owners.len(),
                })
            }
        }
    }
}
