//! # Product Commands
//!
//! Product search, manual product creation and barcode lookup.
//!
//! ## User Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Add package screen                                             │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │ 🔍 Product: "ibu"                    [scan] [new]       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │      │ typed                  │ scanned            │ new       │
//! │      ▼                        ▼                    ▼           │
//! │  search_products      lookup_barcode          add_product      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use apteczka_core::validation::validate_product_name;
use apteczka_core::{MedicationMetadata, LIVE_SEARCH_LIMIT};
use apteczka_db::DbError;

/// Upper bound for any caller-supplied search limit.
const MAX_SEARCH_LIMIT: u32 = 100;

/// Product DTO for the UI shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub uuid: String,
    pub name: String,
    pub description: Option<String>,
    pub active_substance: Option<String>,
    pub strength: Option<String>,
    pub pharmaceutical_form: Option<String>,
    /// Patient leaflet link, when the product came from the registry.
    pub leaflet: Option<String>,
}

impl From<MedicationMetadata> for ProductDto {
    fn from(m: MedicationMetadata) -> Self {
        ProductDto {
            uuid: m.uuid,
            name: m.name,
            description: m.description,
            active_substance: m.active_substance,
            strength: m.strength,
            pharmaceutical_form: m.pharmaceutical_form,
            leaflet: m.leaflet,
        }
    }
}

/// "New product" form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductForm {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

/// Result of scanning a barcode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum BarcodeLookup {
    Found { product: ProductDto },
    NotFound { barcode: String },
    /// The catalog has several products for this code; nothing is picked.
    MultipleMatches { barcode: String, count: usize },
}

/// Live product search by name.
///
/// Blank input returns nothing; the list only fills while typing.
pub async fn search_products(
    state: &AppState,
    query: &str,
    limit: Option<u32>,
) -> ApiResult<Vec<ProductDto>> {
    let start = Instant::now();
    let query = query.trim();
    let limit = limit.unwrap_or(LIVE_SEARCH_LIMIT).min(MAX_SEARCH_LIMIT);

    if query.is_empty() {
        return Ok(Vec::new());
    }

    let products = state.db().medications().search_by_name(query, limit).await?;
    let dtos: Vec<ProductDto> = products.into_iter().map(ProductDto::from).collect();

    debug!(
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        count = dtos.len(),
        query = %query,
        "search_products complete"
    );

    Ok(dtos)
}

/// Gets a single product by its UUID.
pub async fn get_product(state: &AppState, uuid: &str) -> ApiResult<ProductDto> {
    state
        .db()
        .medications()
        .get_by_id(uuid)
        .await?
        .map(ProductDto::from)
        .ok_or_else(|| ApiError::not_found("Product", uuid))
}

/// Creates a product from the "new product" form.
///
/// ## Errors
/// `VALIDATION_ERROR` for a blank or overlong name; nothing is written.
pub async fn add_product(state: &AppState, form: ProductForm) -> ApiResult<ProductDto> {
    let name = validate_product_name(&form.name)?;

    let uuid = state
        .db()
        .medications()
        .add_medication_metadata(&name, form.description.as_deref(), &form.tag_ids)
        .await?;

    info!(uuid = %uuid, name = %name, tags = form.tag_ids.len(), "Product added");
    get_product(state, &uuid).await
}

/// Looks up a scanned barcode.
///
/// Matching is by suffix in either direction, so a scanner that drops the
/// leading digits still finds the product.
///
/// ## Errors
/// `VALIDATION_ERROR` when the input is not a numeric code.
pub async fn lookup_barcode(state: &AppState, code: &str) -> ApiResult<BarcodeLookup> {
    let code = code.trim();

    match state.db().medications().find_medicine_by_barcode(code).await {
        Ok(Some(product)) => {
            debug!(barcode = %code, uuid = %product.uuid, "Barcode matched");
            Ok(BarcodeLookup::Found {
                product: ProductDto::from(product),
            })
        }
        Ok(None) => Ok(BarcodeLookup::NotFound {
            barcode: code.to_string(),
        }),
        Err(DbError::MultipleMatches { barcode, count }) => {
            warn!(barcode = %barcode, count, "Barcode shared by several products");
            Ok(BarcodeLookup::MultipleMatches { barcode, count })
        }
        Err(e) => Err(e.into()),
    }
}
