//! # apteczka-core: Pure Domain Logic for Apteczka
//!
//! This crate holds the domain model of the medication inventory as pure
//! types and functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Apteczka Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    UI shell (mobile screens)                    │   │
//! │  │    List ──► Add package ──► Add product ──► Settings            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 apps/apteczka (commands)                        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ apteczka-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                   │   │
//! │  │   │   types   │  │  barcode  │  │ validation│                   │   │
//! │  │   │  Tag      │  │ packaging │  │   rules   │                   │   │
//! │  │   │  Package  │  │  suffix   │  │  checks   │                   │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              apteczka-db / apteczka-transfer                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Tag, MedicationMetadata, MedicationPackage, ...)
//! - [`barcode`] - Registry packaging parsing and barcode matching
//! - [`error`] - Domain error types
//! - [`validation`] - Form input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use apteczka_core::barcode::{parse_packaging, DEFAULT_PACKAGING_DELIMITER};
//!
//! let packaging = "28 tabl. ¦ 5909990123456 ¦ Rp\n56 tabl. ¦ 5909990123463 ¦ Rp";
//! let codes = parse_packaging(packaging, DEFAULT_PACKAGING_DELIMITER);
//!
//! assert_eq!(codes, vec!["5909990123456", "5909990123463"]);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod barcode;
pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Upper bound for a package quantity entered in a form.
///
/// Nothing in the store enforces it; it guards against typos like an extra
/// zero when counting tablets.
pub const MAX_PACKAGE_QUANTITY: i64 = 100_000;

/// Default row limit of the live search used by product and tag pickers.
pub const LIVE_SEARCH_LIMIT: u32 = 10;
