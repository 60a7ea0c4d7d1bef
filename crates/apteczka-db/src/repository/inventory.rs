//! # Inventory Repository
//!
//! Read model behind the main list: one row per package, joined with its
//! product, filtered and sorted as the user asks.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::value::{bind_value_as, SqlValue};
use apteczka_core::{InventoryItem, InventoryQuery};

/// Repository for the inventory list.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Lists packages matching the query.
    ///
    /// ## Filters (all optional, combined with AND)
    /// - search: product name contains the text (ASCII case-insensitive)
    /// - tag_ids: the package or its product carries any of the tags
    /// - expiring_before: expiration date sorts before the given date;
    ///   packages without a date are left out
    pub async fn list(&self, query: &InventoryQuery) -> DbResult<Vec<InventoryItem>> {
        let (sql, params) = build_list_sql(query);

        debug!(
            search = ?query.search_term(),
            sort = %query.sort,
            tags = query.tag_ids.len(),
            "Listing inventory"
        );

        let mut q = sqlx::query_as::<_, InventoryItem>(&sql);
        for param in &params {
            q = bind_value_as(q, param);
        }

        let items = q.fetch_all(&self.pool).await?;

        debug!(count = items.len(), "Inventory listed");
        Ok(items)
    }

    /// Total number of packages.
    pub async fn count_packages(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM meds")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

fn build_list_sql(query: &InventoryQuery) -> (String, Vec<SqlValue>) {
    let mut sql = String::from(
        r#"
        SELECT
            m.uuid AS package_uuid,
            mm.uuid AS metadata_uuid,
            mm.name,
            mm.description,
            m.quantity,
            m.expiration_date
        FROM meds m
        INNER JOIN meds_metadata mm ON mm.uuid = m.metadata_uuid
        WHERE 1 = 1
        "#,
    );
    let mut params: Vec<SqlValue> = Vec::new();

    if let Some(term) = query.search_term() {
        sql.push_str(" AND mm.name LIKE '%' || ? || '%'");
        params.push(term.into());
    }

    if !query.tag_ids.is_empty() {
        let placeholders = vec!["?"; query.tag_ids.len()].join(", ");
        sql.push_str(&format!(
            " AND (EXISTS (SELECT 1 FROM meds_tags pt \
                   WHERE pt.package_uuid = m.uuid AND pt.tag_uuid IN ({p})) \
               OR EXISTS (SELECT 1 FROM meds_metadata_tags mt \
                   WHERE mt.metadata_uuid = mm.uuid AND mt.tag_uuid IN ({p})))",
            p = placeholders
        ));
        // Once per IN list
        for _ in 0..2 {
            params.extend(query.tag_ids.iter().map(|id| SqlValue::from(id.as_str())));
        }
    }

    if let Some(date) = query
        .expiring_before
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        sql.push_str(" AND m.expiration_date IS NOT NULL AND m.expiration_date < ?");
        params.push(date.into());
    }

    sql.push_str(" ORDER BY ");
    sql.push_str(query.sort.order_by_clause());

    (sql, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use apteczka_core::SortOrder;

    async fn seeded() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fever = db.tags().add_tag("fever").await.unwrap();

        let apap = db
            .medications()
            .add_medication_metadata("Apap", None, &[fever.clone()])
            .await
            .unwrap();
        let ibuprom = db
            .medications()
            .add_medication_metadata("Ibuprom", None, &[])
            .await
            .unwrap();

        let packages = db.packages();
        packages
            .add_medication_package(&apap, Some(10), Some("2027-03-01"), &[])
            .await
            .unwrap();
        packages
            .add_medication_package(&ibuprom, Some(5), Some("2026-01-01"), &[fever.clone()])
            .await
            .unwrap();
        packages
            .add_medication_package(&ibuprom, None, None, &[])
            .await
            .unwrap();

        (db, fever)
    }

    fn names(items: &[InventoryItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_default_sort_by_name() {
        let (db, _) = seeded().await;
        let items = db.inventory().list(&InventoryQuery::default()).await.unwrap();
        assert_eq!(names(&items), vec!["Apap", "Ibuprom", "Ibuprom"]);
        assert_eq!(db.inventory().count_packages().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let (db, _) = seeded().await;
        let query = InventoryQuery {
            search: Some(" IBU ".to_string()),
            ..Default::default()
        };
        let items = db.inventory().list(&query).await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_expiration_sort_puts_undated_last() {
        let (db, _) = seeded().await;
        let query = InventoryQuery {
            sort: SortOrder::ExpirationAsc,
            ..Default::default()
        };
        let items = db.inventory().list(&query).await.unwrap();
        let dates: Vec<Option<&str>> = items.iter().map(|i| i.expiration_date.as_deref()).collect();
        assert_eq!(dates, vec![Some("2026-01-01"), Some("2027-03-01"), None]);
    }

    #[tokio::test]
    async fn test_tag_filter_matches_package_or_product_tags() {
        let (db, fever) = seeded().await;
        let query = InventoryQuery {
            tag_ids: vec![fever],
            sort: SortOrder::ExpirationAsc,
            ..Default::default()
        };
        let items = db.inventory().list(&query).await.unwrap();
        // Apap via its product tag, one Ibuprom package via its own tag
        assert_eq!(names(&items), vec!["Ibuprom", "Apap"]);
    }

    #[tokio::test]
    async fn test_expiring_before() {
        let (db, _) = seeded().await;
        let query = InventoryQuery {
            expiring_before: Some("2026-12-31".to_string()),
            ..Default::default()
        };
        let items = db.inventory().list(&query).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, Some(5));
    }
}
