//! # Commands Module
//!
//! Everything a UI shell can ask the backend to do.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs        ◄─── You are here (exports)
//! ├── inventory.rs  ◄─── Inventory list: search, tag filter, sort
//! ├── product.rs    ◄─── Product search, new product, barcode lookup
//! ├── package.rs    ◄─── Package form: draft, tag inheritance, save
//! ├── tags.rs       ◄─── Tag CRUD
//! └── settings.rs   ◄─── Export, import, registry download, wipe
//! ```
//!
//! ## How Commands Work
//! Every command is a plain async function taking `&AppState` first and
//! returning `Result<T, ApiError>`:
//!
//! ```rust,ignore
//! let state = AppState::open(AppConfig::load_or_default(None)).await?;
//! let items = commands::inventory::list_inventory(&state, InventoryQuery::default()).await?;
//! ```
//!
//! A shell (mobile bridge, desktop IPC, CLI) maps its own calls onto these
//! functions and serializes `ApiError` as `{ code, message }`.

pub mod inventory;
pub mod package;
pub mod product;
pub mod settings;
pub mod tags;
