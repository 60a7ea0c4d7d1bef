//! # Validation Module
//!
//! Input validation for the product, package and tag forms.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: UI shell                                                     │
//! │  ├── Input masks (date picker, numeric keyboard)                       │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Command layer (Rust)                                         │
//! │  └── THIS MODULE: field rules before any write                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE tag names                                                  │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  The store itself accepts any expiration text and any quantity.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::MAX_PACKAGE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_PRODUCT_NAME_CHARS: usize = 200;
const MAX_TAG_NAME_CHARS: usize = 64;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name and returns it trimmed.
///
/// ## Example
/// ```rust
/// use apteczka_core::validation::validate_product_name;
///
/// assert_eq!(validate_product_name("  Ibuprofen 200 mg ").unwrap(), "Ibuprofen 200 mg");
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<String> {
    required_text("name", name, MAX_PRODUCT_NAME_CHARS)
}

/// Validates a tag name and returns it trimmed.
pub fn validate_tag_name(name: &str) -> ValidationResult<String> {
    required_text("tag", name, MAX_TAG_NAME_CHARS)
}

/// Key two tag names share when they differ only by case or surrounding
/// whitespace.
///
/// Folds every alphabet, unlike SQLite's ASCII-only `NOCASE`.
///
/// ```rust
/// use apteczka_core::validation::tag_name_key;
///
/// assert_eq!(tag_name_key(" BÓL Głowy "), tag_name_key("ból głowy"));
/// ```
pub fn tag_name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a package quantity.
///
/// Zero is allowed (an empty package kept for its leaflet).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if !(0..=MAX_PACKAGE_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_PACKAGE_QUANTITY,
        });
    }

    Ok(())
}

/// Parses the quantity text field of the package form.
///
/// Blank input means "not tracked" and yields `None`.
///
/// ## Example
/// ```rust
/// use apteczka_core::validation::parse_quantity_input;
///
/// assert_eq!(parse_quantity_input("24").unwrap(), Some(24));
/// assert_eq!(parse_quantity_input(" ").unwrap(), None);
/// assert!(parse_quantity_input("dużo").is_err());
/// ```
pub fn parse_quantity_input(input: &str) -> ValidationResult<Option<i64>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    let qty: i64 = input.parse().map_err(|_| {
        ValidationError::invalid_format("quantity", "must be a whole number")
    })?;
    validate_quantity(qty)?;

    Ok(Some(qty))
}

// =============================================================================
// Date Validators
// =============================================================================

/// Validates an expiration date and returns it normalized.
///
/// ## Accepted Formats
/// - `YYYY-MM-DD` (full date)
/// - `YYYY-MM` (month precision, as printed on most packages)
///
/// Blank input yields `None`.
pub fn validate_expiration_date(input: &str) -> ValidationResult<Option<String>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(Some(date.format("%Y-%m-%d").to_string()));
    }

    // Month precision: validate via the first day of that month.
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", input), "%Y-%m-%d") {
        return Ok(Some(date.format("%Y-%m").to_string()));
    }

    Err(ValidationError::invalid_format(
        "expiration_date",
        "expected YYYY-MM-DD or YYYY-MM",
    ))
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use apteczka_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required("id"));
    }

    uuid::Uuid::parse_str(id)
        .map_err(|_| ValidationError::invalid_format("id", "must be a valid UUID"))?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_name() {
        assert_eq!(validate_product_name(" Apap ").unwrap(), "Apap");
        assert!(validate_product_name("   ").is_err());
        assert!(validate_product_name(&"x".repeat(201)).is_err());
        // Multi-byte names count characters, not bytes
        assert!(validate_product_name(&"ż".repeat(200)).is_ok());
    }

    #[test]
    fn test_validate_tag_name() {
        assert_eq!(validate_tag_name(" ból głowy ").unwrap(), "ból głowy");
        assert!(matches!(
            validate_tag_name(""),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_tag_name(&"t".repeat(65)).is_err());
    }

    #[test]
    fn test_tag_name_key_folds_polish_letters() {
        assert_eq!(tag_name_key("ŁÓDŹ"), "łódź");
        assert_eq!(tag_name_key("  Ćma "), tag_name_key("ćMA"));
        assert_ne!(tag_name_key("ból"), tag_name_key("bol"));
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(0).is_ok());
        assert!(validate_quantity(30).is_ok());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_PACKAGE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_parse_quantity_input() {
        assert_eq!(parse_quantity_input("").unwrap(), None);
        assert_eq!(parse_quantity_input(" 10 ").unwrap(), Some(10));
        assert!(parse_quantity_input("1.5").is_err());
        assert!(parse_quantity_input("-3").is_err());
    }

    #[test]
    fn test_validate_expiration_date() {
        assert_eq!(
            validate_expiration_date("2026-05-20").unwrap(),
            Some("2026-05-20".to_string())
        );
        assert_eq!(
            validate_expiration_date("2026-05").unwrap(),
            Some("2026-05".to_string())
        );
        assert_eq!(validate_expiration_date("  ").unwrap(), None);
        assert!(validate_expiration_date("2026-13-01").is_err());
        assert!(validate_expiration_date("2025-02-30").is_err());
        assert!(validate_expiration_date("20.05.2026").is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
