//! # Package Commands
//!
//! The add/edit package form and its save logic.
//!
//! ## Tag Inheritance
//! Choosing a product for a NEW package merges the product's tags into the
//! draft. Tags the user already picked stay. Removing an inherited tag only
//! lasts until the product is chosen again. Editing an existing package
//! never inherits: its own tag set is shown and saved as is.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::product::ProductDto;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use apteczka_core::validation::{parse_quantity_input, validate_expiration_date};
use apteczka_core::{CoreError, Tag};

pub use super::product::search_products;

/// In-progress state of the package form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDraft {
    /// Package being edited; `None` while adding.
    pub package_uuid: Option<String>,

    pub product: Option<ProductDto>,

    /// Quantity text as typed. Blank means "not tracked".
    pub quantity: String,

    /// `YYYY-MM-DD`, `YYYY-MM` or blank.
    pub expiration_date: String,

    pub tags: Vec<Tag>,
}

impl PackageDraft {
    /// An empty draft for a new package.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_edit(&self) -> bool {
        self.package_uuid.is_some()
    }

    /// Sets the product, merging its tags into a new-package draft.
    pub fn select_product(&mut self, product: ProductDto, product_tags: Vec<Tag>) {
        self.product = Some(product);

        if self.is_edit() {
            return;
        }

        for tag in product_tags {
            self.add_tag(tag);
        }
    }

    /// Adds a tag unless the draft already has it.
    pub fn add_tag(&mut self, tag: Tag) {
        if !self.tags.iter().any(|t| t.uuid == tag.uuid) {
            self.tags.push(tag);
        }
    }

    pub fn remove_tag(&mut self, tag_uuid: &str) {
        self.tags.retain(|t| t.uuid != tag_uuid);
    }

    pub fn tag_ids(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.uuid.clone()).collect()
    }
}

/// Opens an existing package in edit mode.
pub async fn load_package(state: &AppState, uuid: &str) -> ApiResult<PackageDraft> {
    let db = state.db();

    let package = db
        .packages()
        .get_by_id(uuid)
        .await?
        .ok_or_else(|| ApiError::from(CoreError::PackageNotFound(uuid.to_string())))?;

    let product = db
        .medications()
        .get_by_id(&package.metadata_uuid)
        .await?
        .map(ProductDto::from);

    let tags = db.tags().tags_for_package(uuid).await?;

    Ok(PackageDraft {
        package_uuid: Some(package.uuid),
        product,
        quantity: package.quantity.map(|q| q.to_string()).unwrap_or_default(),
        expiration_date: package.expiration_date.unwrap_or_default(),
        tags,
    })
}

/// Chooses the product of a draft by UUID, loading its tags.
pub async fn select_product(
    state: &AppState,
    draft: &mut PackageDraft,
    product_uuid: &str,
) -> ApiResult<()> {
    let db = state.db();

    let product = db
        .medications()
        .get_by_id(product_uuid)
        .await?
        .ok_or_else(|| ApiError::from(CoreError::ProductNotFound(product_uuid.to_string())))?;
    let tags = db.tags().tags_for_product(product_uuid).await?;

    draft.select_product(ProductDto::from(product), tags);
    Ok(())
}

/// Validates and stores the draft. Returns the package UUID.
///
/// ## Errors
/// `VALIDATION_ERROR` when no product is chosen or quantity/expiration do
/// not parse; nothing is written in that case.
pub async fn save_package(state: &AppState, draft: &PackageDraft) -> ApiResult<String> {
    let product = draft
        .product
        .as_ref()
        .ok_or(CoreError::NoProductSelected)?;
    let quantity = parse_quantity_input(&draft.quantity)?;
    let expiration = validate_expiration_date(&draft.expiration_date)?;
    let tag_ids = draft.tag_ids();

    let packages = state.db().packages();

    match &draft.package_uuid {
        Some(uuid) => {
            packages
                .update_package(uuid, &product.uuid, quantity, expiration.as_deref(), &tag_ids)
                .await?;
            info!(uuid = %uuid, product = %product.uuid, "Package updated");
            Ok(uuid.clone())
        }
        None => {
            let uuid = packages
                .add_medication_package(&product.uuid, quantity, expiration.as_deref(), &tag_ids)
                .await?;
            info!(uuid = %uuid, product = %product.uuid, "Package added");
            Ok(uuid)
        }
    }
}

pub async fn delete_package(state: &AppState, uuid: &str) -> ApiResult<()> {
    state.db().packages().delete(uuid).await?;
    info!(uuid = %uuid, "Package deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(uuid: &str, name: &str) -> Tag {
        Tag {
            uuid: uuid.into(),
            name: name.into(),
        }
    }

    fn product(uuid: &str) -> ProductDto {
        ProductDto {
            uuid: uuid.into(),
            name: "Apap".into(),
            description: None,
            active_substance: None,
            strength: None,
            pharmaceutical_form: None,
            leaflet: None,
        }
    }

    #[test]
    fn test_select_product_merges_tags() {
        let mut draft = PackageDraft::new();
        draft.add_tag(tag("t-kids", "kids"));

        draft.select_product(product("p-1"), vec![tag("t-fever", "fever"), tag("t-kids", "kids")]);

        let names: Vec<&str> = draft.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["kids", "fever"]);
    }

    #[test]
    fn test_removed_inherited_tag_returns_on_reselect() {
        let mut draft = PackageDraft::new();
        draft.select_product(product("p-1"), vec![tag("t-fever", "fever")]);
        draft.remove_tag("t-fever");
        assert!(draft.tags.is_empty());

        draft.select_product(product("p-1"), vec![tag("t-fever", "fever")]);
        assert_eq!(draft.tag_ids(), vec!["t-fever"]);
    }

    #[test]
    fn test_edit_mode_does_not_inherit() {
        let mut draft = PackageDraft {
            package_uuid: Some("pkg-1".into()),
            tags: vec![tag("t-own", "own")],
            ..Default::default()
        };

        draft.select_product(product("p-2"), vec![tag("t-fever", "fever")]);

        assert_eq!(draft.product.as_ref().map(|p| p.uuid.as_str()), Some("p-2"));
        assert_eq!(draft.tag_ids(), vec!["t-own"]);
    }
}
