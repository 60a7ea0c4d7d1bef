//! # Domain Types
//!
//! Core domain types used throughout Apteczka.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐        ┌─────────────────────┐                 │
//! │  │ MedicationMetadata  │ 1    * │ MedicationPackage   │                 │
//! │  │  ─────────────────  │◄───────│  ─────────────────  │                 │
//! │  │  uuid               │        │  uuid               │                 │
//! │  │  name               │        │  metadata_uuid (FK) │                 │
//! │  │  description        │        │  quantity           │                 │
//! │  │  registry fields    │        │  expiration_date    │                 │
//! │  └─────────┬───────────┘        └─────────┬───────────┘                 │
//! │            │ *                            │ *                           │
//! │            ▼                              ▼                             │
//! │  ┌─────────────────────────────────────────────────┐                   │
//! │  │                      Tag                        │                   │
//! │  │   uuid, name (unique, case-insensitive)         │                   │
//! │  └─────────────────────────────────────────────────┘                   │
//! │                                                                         │
//! │  Barcodes: (metadata_uuid, barcode) rows, several per product           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity is keyed by a UUID v4 string generated on the device.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Tag
// =============================================================================

/// A user-defined label attachable to products and packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Tag {
    pub uuid: String,
    pub name: String,
}

// =============================================================================
// Medication Metadata
// =============================================================================

/// The catalog entry for a medication, distinct from any physical package.
///
/// The optional fields after `description` are filled by the public
/// medicine registry import; hand-entered products leave them empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MedicationMetadata {
    /// Unique identifier (UUID v4).
    pub uuid: String,

    /// Display name (trade name for registry imports).
    pub name: String,

    /// Free-text description. Registry imports append to it.
    pub description: Option<String>,

    /// Registry identifier of the medicinal product.
    pub product_id: Option<String>,

    /// Product name as published by the registry.
    pub product_name: Option<String>,

    pub previous_name: Option<String>,
    pub administration_route: Option<String>,
    pub strength: Option<String>,
    pub pharmaceutical_form: Option<String>,
    pub active_substance: Option<String>,

    /// Link to the patient leaflet.
    pub leaflet: Option<String>,

    /// Link to the combined label-leaflet document.
    pub label_leaflet: Option<String>,
}

// =============================================================================
// Medication Package
// =============================================================================

/// A physical, trackable instance of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MedicationPackage {
    pub uuid: String,

    /// Product this package belongs to.
    pub metadata_uuid: String,

    /// Remaining units, if the user tracks them.
    pub quantity: Option<i64>,

    /// Expiration date as entered (`YYYY-MM-DD` or `YYYY-MM`).
    pub expiration_date: Option<String>,

    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,

    #[ts(as = "Option<String>")]
    pub edited_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Inventory (list screen read model)
// =============================================================================

/// One row of the inventory list: a package joined with its product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryItem {
    pub package_uuid: String,
    pub metadata_uuid: String,
    pub name: String,
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub expiration_date: Option<String>,
}

/// Ordering of the inventory list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Product name A → Z.
    #[default]
    NameAsc,
    /// Product name Z → A.
    NameDesc,
    /// Soonest expiration first; packages without a date last.
    ExpirationAsc,
    /// Latest expiration first; packages without a date last.
    ExpirationDesc,
}

impl SortOrder {
    /// SQL `ORDER BY` clause for this ordering.
    ///
    /// Column aliases refer to the inventory query (`mm` = product, `m` = package).
    pub fn order_by_clause(&self) -> &'static str {
        match self {
            SortOrder::NameAsc => "mm.name COLLATE NOCASE ASC, m.expiration_date ASC",
            SortOrder::NameDesc => "mm.name COLLATE NOCASE DESC, m.expiration_date ASC",
            SortOrder::ExpirationAsc => {
                "m.expiration_date IS NULL, m.expiration_date ASC, mm.name COLLATE NOCASE ASC"
            }
            SortOrder::ExpirationDesc => {
                "m.expiration_date IS NULL, m.expiration_date DESC, mm.name COLLATE NOCASE ASC"
            }
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::NameAsc => write!(f, "az"),
            SortOrder::NameDesc => write!(f, "za"),
            SortOrder::ExpirationAsc => write!(f, "expiring"),
            SortOrder::ExpirationDesc => write!(f, "latest"),
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = crate::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "az" | "name_asc" => Ok(SortOrder::NameAsc),
            "za" | "name_desc" => Ok(SortOrder::NameDesc),
            "expiring" | "expiration_asc" => Ok(SortOrder::ExpirationAsc),
            "latest" | "expiration_desc" => Ok(SortOrder::ExpirationDesc),
            other => Err(crate::ValidationError::invalid_format(
                "sort",
                format!("unknown sort order '{}'", other),
            )),
        }
    }
}

/// Search, filter and sort parameters of the inventory list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryQuery {
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,

    pub sort: SortOrder,

    /// Keep packages where the package or its product has any of these tags.
    pub tag_ids: Vec<String>,

    /// Keep packages whose expiration date sorts before this ISO date.
    pub expiring_before: Option<String>,
}

impl InventoryQuery {
    /// Trimmed search text, `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

// =============================================================================
// Registry Record
// =============================================================================

/// One row of the public medicine registry feed, already mapped by header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RegistryRecord {
    pub product_id: Option<String>,
    pub product_name: String,
    pub common_name: String,
    /// Preparation kind flag (human / veterinary).
    pub kind: String,
    pub previous_name: Option<String>,
    pub administration_route: Option<String>,
    pub strength: Option<String>,
    pub pharmaceutical_form: Option<String>,
    /// Newline-separated packaging entries carrying barcodes.
    pub packaging: Option<String>,
    pub active_substance: Option<String>,
    pub leaflet: Option<String>,
    pub label_leaflet: Option<String>,
}

impl RegistryRecord {
    /// True when the row describes a human medicine with a common name.
    pub fn is_ingestible(&self, human_flag: &str) -> bool {
        self.kind.trim().eq_ignore_ascii_case(human_flag.trim())
            && !self.common_name.trim().is_empty()
    }

    /// Name the product is stored (and upserted) under.
    ///
    /// Falls back to the common name for rows without a trade name.
    pub fn metadata_name(&self) -> &str {
        let name = self.product_name.trim();
        if name.is_empty() {
            self.common_name.trim()
        } else {
            name
        }
    }

    /// Description text contributed by this row: common name and strength.
    pub fn description(&self) -> String {
        match self.strength.as_deref().map(str::trim) {
            Some(strength) if !strength.is_empty() => {
                format!("{} {}", self.common_name.trim(), strength)
            }
            _ => self.common_name.trim().to_string(),
        }
    }
}

/// Merges registry description text into an existing description.
///
/// A line already present is not appended again, so ingesting the same
/// row twice leaves the description unchanged.
pub fn merge_description(existing: Option<&str>, addition: &str) -> Option<String> {
    let addition = addition.trim();
    match existing.map(str::trim).filter(|s| !s.is_empty()) {
        None if addition.is_empty() => None,
        None => Some(addition.to_string()),
        Some(current)
            if addition.is_empty() || current.lines().any(|line| line.trim() == addition) =>
        {
            Some(current.to_string())
        }
        Some(current) => Some(format!("{}\n{}", current, addition)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
