//! # Tag Repository
//!
//! The tag dictionary shared by products and packages.
//!
//! Tag names are unique without regard to case; `add_tag` hands back the
//! existing tag instead of failing, so the UI can call it for every name
//! the user types.
//!
//! Uniqueness is enforced on `name_key`, the Unicode lowercase of the
//! trimmed name (`"Ból głowy"` and `"BÓL GŁOWY"` share one key).

use std::collections::HashMap;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::TagLink;
use crate::error::{DbError, DbResult};
use apteczka_core::validation::tag_name_key;
use apteczka_core::{Tag, ValidationError};

/// Repository for tag database operations.
#[derive(Debug, Clone)]
pub struct TagRepository {
    pool: SqlitePool,
}

impl TagRepository {
    /// Creates a new TagRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TagRepository { pool }
    }

    /// Returns the UUID of the tag with this name, creating it if needed.
    ///
    /// ## Behavior
    /// - The name is trimmed; an empty name is rejected
    /// - `"Fever"`, `" fever "` and `"FEVER"` all resolve to one tag,
    ///   and so do `"łódź"` and `"ŁÓDŹ"`
    /// - Lookup and insert share one transaction
    pub async fn add_tag(&self, name: &str) -> DbResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::required("tag").into());
        }
        let key = tag_name_key(name);

        let mut tx = self.pool.begin().await?;

        let existing: Option<String> =
            sqlx::query_scalar("SELECT uuid FROM tags WHERE name_key = ?1")
                .bind(&key)
                .fetch_optional(&mut *tx)
                .await?;

        if let Some(uuid) = existing {
            debug!(name = %name, uuid = %uuid, "Tag already exists");
            return Ok(uuid);
        }

        let uuid = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO tags (uuid, name, name_key) VALUES (?1, ?2, ?3)")
            .bind(&uuid)
            .bind(name)
            .bind(&key)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(name = %name, uuid = %uuid, "Tag created");
        Ok(uuid)
    }

    /// Gets a tag by its UUID.
    pub async fn get_by_id(&self, uuid: &str) -> DbResult<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT uuid, name FROM tags WHERE uuid = ?1")
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tag)
    }

    /// Lists every tag ordered by name.
    pub async fn list_all(&self) -> DbResult<Vec<Tag>> {
        let tags =
            sqlx::query_as::<_, Tag>("SELECT uuid, name FROM tags ORDER BY name COLLATE NOCASE")
                .fetch_all(&self.pool)
                .await?;

        Ok(tags)
    }

    /// Live tag search: names containing `fragment`, ordered by name.
    ///
    /// A blank fragment lists the first `limit` tags.
    pub async fn search(&self, fragment: &str, limit: u32) -> DbResult<Vec<Tag>> {
        let fragment = fragment.trim();
        debug!(fragment = %fragment, limit, "Searching tags");

        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT uuid, name
            FROM tags
            WHERE name LIKE '%' || ?1 || '%'
            ORDER BY name COLLATE NOCASE
            LIMIT ?2
            "#,
        )
        .bind(fragment)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    /// Renames a tag.
    ///
    /// ## Errors
    /// - `Validation` for a blank name
    /// - `UniqueViolation` when another tag already has the name
    /// - `NotFound` for an unknown UUID
    pub async fn rename(&self, uuid: &str, new_name: &str) -> DbResult<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(ValidationError::required("tag").into());
        }

        let result = sqlx::query("UPDATE tags SET name = ?1, name_key = ?2 WHERE uuid = ?3")
            .bind(new_name)
            .bind(tag_name_key(new_name))
            .bind(uuid)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => DbError::UniqueViolation {
                    field: "tag".to_string(),
                    value: new_name.to_string(),
                },
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Tag", uuid));
        }

        info!(uuid = %uuid, name = %new_name, "Tag renamed");
        Ok(())
    }

    /// Deletes a tag and every association that references it.
    pub async fn delete(&self, uuid: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM meds_tags WHERE tag_uuid = ?1")
            .bind(uuid)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM meds_metadata_tags WHERE tag_uuid = ?1")
            .bind(uuid)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM tags WHERE uuid = ?1")
            .bind(uuid)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Tag", uuid));
        }

        tx.commit().await?;

        info!(uuid = %uuid, "Tag deleted");
        Ok(())
    }

    /// Recomputes every tag's `name_key`.
    ///
    /// Tags whose names collide under the key are merged into the oldest
    /// one; their product and package links move to it. Returns the number
    /// of tags changed or removed.
    pub async fn refresh_name_keys(&self) -> DbResult<usize> {
        let mut tx = self.pool.begin().await?;
        let changed = refresh_name_keys(&mut tx).await?;
        tx.commit().await?;
        Ok(changed)
    }

    /// Tags attached to a product.
    pub async fn tags_for_product(&self, metadata_uuid: &str) -> DbResult<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.uuid, t.name
            FROM tags t
            INNER JOIN meds_metadata_tags mt ON mt.tag_uuid = t.uuid
            WHERE mt.metadata_uuid = ?1
            ORDER BY t.name COLLATE NOCASE
            "#,
        )
        .bind(metadata_uuid)
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    /// Tags attached to a package.
    pub async fn tags_for_package(&self, package_uuid: &str) -> DbResult<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.uuid, t.name
            FROM tags t
            INNER JOIN meds_tags mt ON mt.tag_uuid = t.uuid
            WHERE mt.package_uuid = ?1
            ORDER BY t.name COLLATE NOCASE
            "#,
        )
        .bind(package_uuid)
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }
}

/// Key refresh on an open connection or transaction.
pub(crate) async fn refresh_name_keys(conn: &mut SqliteConnection) -> DbResult<usize> {
    let rows: Vec<(String, String, Option<String>)> =
        sqlx::query_as("SELECT uuid, name, name_key FROM tags ORDER BY rowid")
            .fetch_all(&mut *conn)
            .await?;

    let mut owners: HashMap<String, String> = HashMap::with_capacity(rows.len());
    let mut stale = Vec::new();
    let mut duplicates = Vec::new();

    for (uuid, name, stored) in rows {
        let key = tag_name_key(&name);
        match owners.get(&key) {
            Some(survivor) => duplicates.push((uuid, survivor.clone())),
            None => {
                if stored.as_deref() != Some(key.as_str()) {
                    stale.push((uuid.clone(), key.clone()));
                }
                owners.insert(key, uuid);
            }
        }
    }

    if stale.is_empty() && duplicates.is_empty() {
        return Ok(0);
    }

    // Stale keys are cleared first so no intermediate state collides.
    for (uuid, _) in &stale {
        sqlx::query("UPDATE tags SET name_key = NULL WHERE uuid = ?1")
            .bind(uuid)
            .execute(&mut *conn)
            .await?;
    }

    for (duplicate, survivor) in &duplicates {
        for link in [TagLink::Product, TagLink::Package] {
            let moved = format!(
                "UPDATE OR IGNORE {} SET tag_uuid = ?1 WHERE tag_uuid = ?2",
                link.table()
            );
            sqlx::query(&moved)
                .bind(survivor)
                .bind(duplicate)
                .execute(&mut *conn)
                .await?;

            let leftover = format!("DELETE FROM {} WHERE tag_uuid = ?1", link.table());
            sqlx::query(&leftover)
                .bind(duplicate)
                .execute(&mut *conn)
                .await?;
        }

        sqlx::query("DELETE FROM tags WHERE uuid = ?1")
            .bind(duplicate)
            .execute(&mut *conn)
            .await?;

        warn!(duplicate = %duplicate, survivor = %survivor, "Merged tag differing only by case");
    }

    for (uuid, key) in &stale {
        sqlx::query("UPDATE tags SET name_key = ?1 WHERE uuid = ?2")
            .bind(key)
            .bind(uuid)
            .execute(&mut *conn)
            .await?;
    }

    debug!(rekeyed = stale.len(), merged = duplicates.len(), "Tag name keys refreshed");
    Ok(stale.len() + duplicates.len())
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_add_tag_deduplicates_case_and_whitespace() {
        let db = db().await;
        let tags = db.tags();

        let a = tags.add_tag("Fever").await.unwrap();
        let b = tags.add_tag("  fever ").await.unwrap();
        let c = tags.add_tag("FEVER").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(tags.list_all().await.unwrap().len(), 1);
        // First spelling wins
        assert_eq!(tags.get_by_id(&a).await.unwrap().unwrap().name, "Fever");
    }

    #[tokio::test]
    async fn test_add_tag_deduplicates_polish_letters() {
        let db = db().await;
        let tags = db.tags();

        let first = tags.add_tag("Ból głowy").await.unwrap();
        let second = tags.add_tag("BÓL GŁOWY").await.unwrap();
        let third = tags.add_tag(" ból Głowy ").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(tags.list_all().await.unwrap().len(), 1);

        // Renaming onto another tag's folded name collides too
        let other = tags.add_tag("żołądek").await.unwrap();
        assert!(matches!(
            tags.rename(&other, "BÓL głowy").await,
            Err(DbError::UniqueViolation { .. })
        ));
        tags.rename(&other, "ŻOŁĄDEK").await.unwrap();
        assert_eq!(tags.add_tag("Żołądek").await.unwrap(), other);
    }

    #[tokio::test]
    async fn test_refresh_name_keys_merges_case_duplicates() {
        let db = db().await;
        let product = db
            .medications()
            .add_medication_metadata("Apap", None, &[])
            .await
            .unwrap();

        // Rows written without the application key, as by an older store
        db.execute(
            "INSERT INTO tags (uuid, name, name_key) VALUES ('t-1', 'Łódź', NULL), ('t-2', 'ŁÓDŹ', NULL)",
            &[],
        )
        .await
        .unwrap();
        db.execute(
            "INSERT INTO meds_metadata_tags (metadata_uuid, tag_uuid) VALUES (?, 't-2')",
            &[product.clone().into()],
        )
        .await
        .unwrap();

        assert_eq!(db.tags().refresh_name_keys().await.unwrap(), 2);

        let all = db.tags().list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].uuid, "t-1");
        let linked = db.tags().tags_for_product(&product).await.unwrap();
        assert_eq!(linked[0].uuid, "t-1");
        assert_eq!(db.tags().add_tag("łódź").await.unwrap(), "t-1");

        assert_eq!(db.tags().refresh_name_keys().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_add_tag_rejects_blank() {
        let db = db().await;
        assert!(matches!(
            db.tags().add_tag("   ").await,
            Err(DbError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_search_and_order() {
        let db = db().await;
        let tags = db.tags();
        for name in ["pain", "Allergy", "painkiller", "cold"] {
            tags.add_tag(name).await.unwrap();
        }

        let names: Vec<String> = tags
            .search("PAIN", 10)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["pain", "painkiller"]);

        let all: Vec<String> = tags
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(all, vec!["Allergy", "cold", "pain", "painkiller"]);

        assert_eq!(tags.search("", 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rename_collision_and_missing() {
        let db = db().await;
        let tags = db.tags();
        let a = tags.add_tag("cold").await.unwrap();
        tags.add_tag("flu").await.unwrap();

        let err = tags.rename(&a, "FLU").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        tags.rename(&a, " cough ").await.unwrap();
        assert_eq!(tags.get_by_id(&a).await.unwrap().unwrap().name, "cough");

        assert!(matches!(
            tags.rename("missing", "x").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_tag() {
        let db = db().await;
        assert!(matches!(
            db.tags().delete("missing").await,
            Err(DbError::NotFound { .. })
        ));
    }
}
