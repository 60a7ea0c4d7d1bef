//! # Barcodes
//!
//! Parsing of the registry "packaging" block and barcode matching rules.
//!
//! ## Packaging Block Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  One entry per line, fields separated by a delimiter:                   │
//! │                                                                         │
//! │   28 tabl. w blistrze ¦ 5909990123456 ¦ Rp                              │
//! │   56 tabl. w blistrze ¦ 5909990123463 ¦ Rp                              │
//! │   1 butelka                                   ← no barcode, skipped     │
//! │                                                                         │
//! │  The second field is the barcode candidate. It is accepted only when    │
//! │  it is made of ASCII digits.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Suffix Matching
//! Scanners report the same package as EAN-13 or as GTIN-14 with a leading
//! zero, and users sometimes type only the tail of a code. A stored code
//! and a scanned code match when either one ends with the other.

use crate::error::ValidationError;

/// Field delimiter inside a packaging entry.
pub const DEFAULT_PACKAGING_DELIMITER: &str = "¦";

/// Extracts the barcodes of a packaging block.
///
/// Duplicates are dropped; the order of first appearance is kept.
///
/// ## Example
/// ```rust
/// use apteczka_core::barcode::parse_packaging;
///
/// let codes = parse_packaging("10 amp. | 5901234567890 | Lz\n1 fiol.", "|");
/// assert_eq!(codes, vec!["5901234567890"]);
/// ```
pub fn parse_packaging(text: &str, delimiter: &str) -> Vec<String> {
    let mut barcodes: Vec<String> = Vec::new();

    for line in text.lines() {
        let Some(candidate) = line.split(delimiter).nth(1).map(str::trim) else {
            continue;
        };

        if !is_numeric(candidate) {
            continue;
        }

        if !barcodes.iter().any(|existing| existing == candidate) {
            barcodes.push(candidate.to_string());
        }
    }

    barcodes
}

/// Normalizes a scanned or typed barcode.
///
/// ## Rules
/// - Surrounding whitespace is removed
/// - Must not be empty
/// - Must contain only ASCII digits
pub fn normalize_barcode(input: &str) -> Result<String, ValidationError> {
    let code = input.trim();

    if code.is_empty() {
        return Err(ValidationError::required("barcode"));
    }

    if !is_numeric(code) {
        return Err(ValidationError::invalid_format(
            "barcode",
            "must contain only digits",
        ));
    }

    Ok(code.to_string())
}

/// Returns true when either code is a suffix of the other.
pub fn barcodes_match(stored: &str, scanned: &str) -> bool {
    if stored.is_empty() || scanned.is_empty() {
        return false;
    }
    stored.ends_with(scanned) || scanned.ends_with(stored)
}

fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_packaging_takes_second_field() {
        let text = "28 tabl. ¦ 5909990123456 ¦ Rp\n56 tabl. ¦ 5909990123463 ¦ Rp";
        assert_eq!(
            parse_packaging(text, DEFAULT_PACKAGING_DELIMITER),
            vec!["5909990123456", "5909990123463"]
        );
    }

    #[test]
    fn test_parse_packaging_skips_invalid_entries() {
        let text = "\
1 butelka
10 amp. ¦ brak ¦ Lz
20 kaps. ¦  ¦ OTC
30 kaps. ¦ 59099 90 ¦ OTC
60 kaps. ¦ 5909990000017 ¦ OTC
";
        assert_eq!(
            parse_packaging(text, DEFAULT_PACKAGING_DELIMITER),
            vec!["5909990000017"]
        );
    }

    #[test]
    fn test_parse_packaging_drops_duplicates() {
        let text = "a ¦ 123 ¦ x\r\nb ¦ 123 ¦ y\r\nc ¦ 456";
        assert_eq!(
            parse_packaging(text, DEFAULT_PACKAGING_DELIMITER),
            vec!["123", "456"]
        );
    }

    #[test]
    fn test_parse_packaging_empty() {
        assert!(parse_packaging("", DEFAULT_PACKAGING_DELIMITER).is_empty());
    }

    #[test]
    fn test_normalize_barcode() {
        assert_eq!(normalize_barcode(" 5909990 ").unwrap(), "5909990");
        assert!(matches!(
            normalize_barcode("   "),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            normalize_barcode("59099-90"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_barcodes_match_suffix_both_ways() {
        assert!(barcodes_match("5909990123456", "123456"));
        assert!(barcodes_match("5909990123456", "05909990123456"));
        assert!(barcodes_match("5909990123456", "5909990123456"));
        assert!(!barcodes_match("5909990123456", "5909990"));
        assert!(!barcodes_match("", "1"));
    }
}
