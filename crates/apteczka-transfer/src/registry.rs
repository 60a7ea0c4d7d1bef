//! # Registry Feed
//!
//! Downloads the public registry of medicinal products and upserts every
//! human-medicine row into the store.
//!
//! ## Ingestion Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  RegistryClient::fetch ──select!── AbortSignal::aborted                 │
//! │       │                                   │                             │
//! │       │ body                              └──► FeedStatus::Cancelled    │
//! │       ▼                                                                 │
//! │  parse_feed (csv, ';', columns looked up by header name)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  for each row:                                                          │
//! │     aborted? ───────────────────────────────► FeedStatus::Cancelled     │
//! │     kind != human flag or no common name ──► skipped                    │
//! │     MedicationRepository::import_medicine ──► ingested                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  FeedStatus::Completed                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each row is committed on its own, so a cancelled or failed run keeps
//! the rows ingested before it stopped.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::abort::AbortSignal;
use crate::config::RegistryConfig;
use crate::error::{TransferError, TransferResult};
use apteczka_core::RegistryRecord;
use apteczka_db::Database;

// =============================================================================
// Column Mapping
// =============================================================================

pub const COL_PRODUCT_ID: &str = "Identyfikator Produktu Leczniczego";
pub const COL_PRODUCT_NAME: &str = "Nazwa Produktu Leczniczego";
pub const COL_COMMON_NAME: &str = "Nazwa powszechnie stosowana";
pub const COL_KIND: &str = "Rodzaj preparatu";
pub const COL_PREVIOUS_NAME: &str = "Nazwa poprzednia produktu";
pub const COL_ADMINISTRATION_ROUTE: &str = "Droga podania - Gatunek - Tkanka - Okres karencji";
pub const COL_STRENGTH: &str = "Moc";
pub const COL_PHARMACEUTICAL_FORM: &str = "Postać farmaceutyczna";
pub const COL_PACKAGING: &str = "Opakowanie";
pub const COL_ACTIVE_SUBSTANCE: &str = "Substancja czynna";
pub const COL_LEAFLET: &str = "Ulotka";
pub const COL_LABEL_LEAFLET: &str = "Etykieto-ulotka";

const MANDATORY_COLUMNS: [&str; 3] = [COL_PRODUCT_NAME, COL_COMMON_NAME, COL_KIND];

const FEED_DELIMITER: u8 = b';';

/// Positions of the known columns in the feed header.
#[derive(Debug, Default)]
struct ColumnMap {
    product_id: Option<usize>,
    product_name: usize,
    common_name: usize,
    kind: usize,
    previous_name: Option<usize>,
    administration_route: Option<usize>,
    strength: Option<usize>,
    pharmaceutical_form: Option<usize>,
    packaging: Option<usize>,
    active_substance: Option<usize>,
    leaflet: Option<usize>,
    label_leaflet: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> TransferResult<Self> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let find = |name: &str| names.iter().position(|h| h == name);

        let missing: Vec<String> = MANDATORY_COLUMNS
            .into_iter()
            .filter(|name| find(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(TransferError::MissingColumns(missing));
        }

        Ok(ColumnMap {
            product_id: find(COL_PRODUCT_ID),
            product_name: find(COL_PRODUCT_NAME).unwrap_or_default(),
            common_name: find(COL_COMMON_NAME).unwrap_or_default(),
            kind: find(COL_KIND).unwrap_or_default(),
            previous_name: find(COL_PREVIOUS_NAME),
            administration_route: find(COL_ADMINISTRATION_ROUTE),
            strength: find(COL_STRENGTH),
            pharmaceutical_form: find(COL_PHARMACEUTICAL_FORM),
            packaging: find(COL_PACKAGING),
            active_substance: find(COL_ACTIVE_SUBSTANCE),
            leaflet: find(COL_LEAFLET),
            label_leaflet: find(COL_LABEL_LEAFLET),
        })
    }

    fn record(&self, row: &csv::StringRecord) -> RegistryRecord {
        let text = |index: usize| row.get(index).map(str::trim).unwrap_or_default().to_string();
        let optional = |index: Option<usize>| {
            index
                .and_then(|i| row.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        RegistryRecord {
            product_id: optional(self.product_id),
            product_name: text(self.product_name),
            common_name: text(self.common_name),
            kind: text(self.kind),
            previous_name: optional(self.previous_name),
            administration_route: optional(self.administration_route),
            strength: optional(self.strength),
            pharmaceutical_form: optional(self.pharmaceutical_form),
            packaging: optional(self.packaging),
            active_substance: optional(self.active_substance),
            leaflet: optional(self.leaflet),
            label_leaflet: optional(self.label_leaflet),
        }
    }
}

/// Parses the registry CSV report.
///
/// Every data row is returned; filtering happens at ingestion.
pub fn parse_feed(text: &str) -> TransferResult<Vec<RegistryRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(FEED_DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns = ColumnMap::from_headers(reader.headers()?)?;

    let mut records = Vec::new();
    for row in reader.records() {
        records.push(columns.record(&row?));
    }

    debug!(rows = records.len(), "Registry feed parsed");
    Ok(records)
}

// =============================================================================
// Download
// =============================================================================

/// HTTP client for the registry report.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: reqwest::Client,
    url: String,
}

impl RegistryClient {
    /// Creates a client from validated settings.
    pub fn new(config: &RegistryConfig) -> TransferResult<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransferError::InvalidConfig(e.to_string()))?;

        Ok(RegistryClient {
            client,
            url: config.url.clone(),
        })
    }

    /// Downloads the report.
    ///
    /// The body is read into memory whole; the request and the body read are
    /// raced together against `abort`. Returns `Ok(None)` when cancelled
    /// before the body arrived.
    pub async fn fetch(&self, abort: &mut AbortSignal) -> TransferResult<Option<String>> {
        info!(url = %self.url, "Downloading registry feed");

        let request = async {
            let response = self.client.get(&self.url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(TransferError::HttpStatus(status.as_u16()));
            }
            Ok(response.text().await?)
        };

        tokio::select! {
            biased;

            _ = abort.aborted() => {
                info!("Registry download cancelled");
                Ok(None)
            }
            body = request => {
                let body = body?;
                info!(bytes = body.len(), "Registry feed downloaded");
                Ok(Some(body))
            }
        }
    }
}

// =============================================================================
// Ingestion
// =============================================================================

/// How a feed run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    Completed,
    Cancelled,
}

/// Counters of a feed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedReport {
    pub status: FeedStatus,
    /// Data rows looked at before the run ended.
    pub rows_seen: usize,
    /// Rows upserted into the store.
    pub ingested: usize,
    /// Of `ingested`, rows that created a new product.
    pub created: usize,
    /// Rows filtered out (not a human medicine, no common name).
    pub skipped: usize,
}

impl FeedReport {
    fn new() -> Self {
        FeedReport {
            status: FeedStatus::Completed,
            rows_seen: 0,
            ingested: 0,
            created: 0,
            skipped: 0,
        }
    }

    fn cancelled(mut self) -> Self {
        self.status = FeedStatus::Cancelled;
        self
    }
}

/// Progress callback payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedProgress {
    pub processed: usize,
    pub total: usize,
}

const PROGRESS_EVERY: usize = 250;

/// Downloads, parses and ingests the registry feed.
pub async fn ingest_feed(
    db: &Database,
    config: &RegistryConfig,
    mut abort: AbortSignal,
    progress: impl FnMut(FeedProgress),
) -> TransferResult<FeedReport> {
    let client = RegistryClient::new(config)?;

    let Some(body) = client.fetch(&mut abort).await? else {
        return Ok(FeedReport::new().cancelled());
    };

    if abort.is_aborted() {
        return Ok(FeedReport::new().cancelled());
    }

    let records = parse_feed(&body)?;
    ingest_records(db, &records, config, &abort, progress).await
}

/// Upserts parsed rows, checking for cancellation before each one.
pub async fn ingest_records(
    db: &Database,
    records: &[RegistryRecord],
    config: &RegistryConfig,
    abort: &AbortSignal,
    mut progress: impl FnMut(FeedProgress),
) -> TransferResult<FeedReport> {
    let medications = db.medications();
    let total = records.len();
    let mut report = FeedReport::new();

    info!(rows = total, "Ingesting registry rows");

    for record in records {
        if abort.is_aborted() {
            warn!(
                rows_seen = report.rows_seen,
                ingested = report.ingested,
                "Registry ingestion cancelled"
            );
            return Ok(report.cancelled());
        }

        report.rows_seen += 1;

        if !record.is_ingestible(&config.human_flag) {
            report.skipped += 1;
        } else {
            let outcome = medications
                .import_medicine(record, &config.packaging_delimiter)
                .await?;
            report.ingested += 1;
            if outcome.created {
                report.created += 1;
            }
        }

        if report.rows_seen % PROGRESS_EVERY == 0 || report.rows_seen == total {
            progress(FeedProgress {
                processed: report.rows_seen,
                total,
            });
        }
    }

    info!(
        rows_seen = report.rows_seen,
        ingested = report.ingested,
        created = report.created,
        skipped = report.skipped,
        "Registry ingestion complete"
    );
    Ok(report)
}
