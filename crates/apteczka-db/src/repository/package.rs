//! # Package Repository
//!
//! Physical packages of a product: quantity left, expiration date, and a
//! tag set of their own.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use super::{link_tags, unlink_all_tags, TagLink};
use crate::error::{DbError, DbResult};
use apteczka_core::MedicationPackage;

const PACKAGE_COLUMNS: &str =
    "uuid, metadata_uuid, quantity, expiration_date, created_at, edited_at";

/// Repository for package database operations.
#[derive(Debug, Clone)]
pub struct PackageRepository {
    pool: SqlitePool,
}

impl PackageRepository {
    /// Creates a new PackageRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PackageRepository { pool }
    }

    /// Adds a package of a product together with its tags.
    ///
    /// ## Errors
    /// `ForeignKeyViolation` when the product or a tag does not exist; nothing
    /// is written in that case.
    pub async fn add_medication_package(
        &self,
        metadata_uuid: &str,
        quantity: Option<i64>,
        expiration_date: Option<&str>,
        tag_ids: &[String],
    ) -> DbResult<String> {
        let uuid = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO meds (uuid, metadata_uuid, quantity, expiration_date, created_at, edited_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(&uuid)
        .bind(metadata_uuid)
        .bind(quantity)
        .bind(expiration_date)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        link_tags(&mut tx, TagLink::Package, &uuid, tag_ids).await?;

        tx.commit().await?;

        info!(
            uuid = %uuid,
            metadata_uuid = %metadata_uuid,
            tags = tag_ids.len(),
            "Package added"
        );
        Ok(uuid)
    }

    /// Gets a package by its UUID.
    pub async fn get_by_id(&self, uuid: &str) -> DbResult<Option<MedicationPackage>> {
        let sql = format!("SELECT {} FROM meds WHERE uuid = ?1", PACKAGE_COLUMNS);

        let package = sqlx::query_as::<_, MedicationPackage>(&sql)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(package)
    }

    /// Packages of one product, soonest expiration first.
    pub async fn list_for_product(&self, metadata_uuid: &str) -> DbResult<Vec<MedicationPackage>> {
        let sql = format!(
            "SELECT {} FROM meds WHERE metadata_uuid = ?1 \
             ORDER BY expiration_date IS NULL, expiration_date, created_at",
            PACKAGE_COLUMNS
        );

        let packages = sqlx::query_as::<_, MedicationPackage>(&sql)
            .bind(metadata_uuid)
            .fetch_all(&self.pool)
            .await?;

        Ok(packages)
    }

    /// Updates a package and replaces its tag set.
    ///
    /// Only this package's tag rows are touched.
    pub async fn update_package(
        &self,
        uuid: &str,
        metadata_uuid: &str,
        quantity: Option<i64>,
        expiration_date: Option<&str>,
        tag_ids: &[String],
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE meds SET
                metadata_uuid = ?1,
                quantity = ?2,
                expiration_date = ?3,
                edited_at = ?4
            WHERE uuid = ?5
            "#,
        )
        .bind(metadata_uuid)
        .bind(quantity)
        .bind(expiration_date)
        .bind(Utc::now())
        .bind(uuid)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Package", uuid));
        }

        let removed = unlink_all_tags(&mut tx, TagLink::Package, uuid).await?;
        link_tags(&mut tx, TagLink::Package, uuid, tag_ids).await?;

        tx.commit().await?;

        debug!(uuid = %uuid, removed, added = tag_ids.len(), "Package tags replaced");
        info!(uuid = %uuid, "Package updated");
        Ok(())
    }

    /// Deletes a package and its tag rows.
    pub async fn delete(&self, uuid: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        unlink_all_tags(&mut tx, TagLink::Package, uuid).await?;

        let result = sqlx::query("DELETE FROM meds WHERE uuid = ?1")
            .bind(uuid)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Package", uuid));
        }

        tx.commit().await?;

        info!(uuid = %uuid, "Package deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_add_package_sets_timestamps() {
        let db = db().await;
        let product = db
            .medications()
            .add_medication_metadata("Apap", None, &[])
            .await
            .unwrap();

        let uuid = db
            .packages()
            .add_medication_package(&product, Some(20), Some("2027-01"), &[])
            .await
            .unwrap();

        let package = db.packages().get_by_id(&uuid).await.unwrap().unwrap();
        assert_eq!(package.metadata_uuid, product);
        assert_eq!(package.quantity, Some(20));
        assert_eq!(package.expiration_date.as_deref(), Some("2027-01"));
        assert!(package.created_at.is_some());
        assert_eq!(package.created_at, package.edited_at);
    }

    #[tokio::test]
    async fn test_add_package_for_unknown_product() {
        let db = db().await;
        let err = db
            .packages()
            .add_medication_package("missing", None, None, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_list_for_product_orders_by_expiration() {
        let db = db().await;
        let product = db
            .medications()
            .add_medication_metadata("Apap", None, &[])
            .await
            .unwrap();
        let packages = db.packages();
        packages
            .add_medication_package(&product, None, None, &[])
            .await
            .unwrap();
        packages
            .add_medication_package(&product, None, Some("2028-01-01"), &[])
            .await
            .unwrap();
        packages
            .add_medication_package(&product, None, Some("2026-06-01"), &[])
            .await
            .unwrap();

        let dates: Vec<Option<String>> = packages
            .list_for_product(&product)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.expiration_date)
            .collect();
        assert_eq!(
            dates,
            vec![
                Some("2026-06-01".to_string()),
                Some("2028-01-01".to_string()),
                None
            ]
        );
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_package() {
        let db = db().await;
        assert!(matches!(
            db.packages()
                .update_package("missing", "missing", None, None, &[])
                .await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            db.packages().delete("missing").await,
            Err(DbError::NotFound { .. })
        ));
    }
}
