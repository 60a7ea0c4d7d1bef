//! # Inventory Commands
//!
//! The main list: every package joined with its product, searched, filtered
//! by tag and expiration, and sorted.

use std::time::Instant;
use tracing::debug;

use crate::error::ApiResult;
use crate::state::AppState;
use apteczka_core::validation::validate_expiration_date;
use apteczka_core::{InventoryItem, InventoryQuery};

/// Lists packages matching `query`.
///
/// ## Errors
/// `VALIDATION_ERROR` when `expiring_before` is not a date.
pub async fn list_inventory(state: &AppState, mut query: InventoryQuery) -> ApiResult<Vec<InventoryItem>> {
    let start = Instant::now();

    query.expiring_before = match query.expiring_before.as_deref() {
        Some(date) => validate_expiration_date(date)?,
        None => None,
    };

    let items = state.db().inventory().list(&query).await?;

    debug!(
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        count = items.len(),
        sort = %query.sort,
        tags = query.tag_ids.len(),
        "list_inventory complete"
    );

    Ok(items)
}

/// Packages whose expiration date sorts before `date`, soonest first.
pub async fn expiring_before(state: &AppState, date: &str) -> ApiResult<Vec<InventoryItem>> {
    list_inventory(
        state,
        InventoryQuery {
            sort: apteczka_core::SortOrder::ExpirationAsc,
            expiring_before: Some(date.to_string()),
            ..Default::default()
        },
    )
    .await
}
