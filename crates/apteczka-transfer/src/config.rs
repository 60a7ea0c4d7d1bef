//! # Registry Configuration
//!
//! Settings of the public medicine registry download. Loaded as the
//! `[registry]` section of the application config file.
//!
//! ## Configuration File Format
//! ```toml
//! [registry]
//! url = "https://rejestrymedyczne.ezdrowie.gov.pl/api/rpl/medicinal-products/public-pl-report/get-csv"
//! timeout_secs = 120
//! human_flag = "ludzki"
//! packaging_delimiter = "¦"
//! user_agent = "apteczka/0.1"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{TransferError, TransferResult};
use apteczka_core::barcode::DEFAULT_PACKAGING_DELIMITER;

/// Public registry of medicinal products, CSV report.
pub const DEFAULT_REGISTRY_URL: &str =
    "https://rejestrymedyczne.ezdrowie.gov.pl/api/rpl/medicinal-products/public-pl-report/get-csv";

/// Registry download and parsing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// CSV report URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Whole-request timeout (seconds). The full report is tens of megabytes.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Value of the preparation-kind column marking human medicines.
    #[serde(default = "default_human_flag")]
    pub human_flag: String,

    /// Field delimiter inside the packaging column.
    #[serde(default = "default_packaging_delimiter")]
    pub packaging_delimiter: String,

    /// User-Agent header sent with the download.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_url() -> String {
    DEFAULT_REGISTRY_URL.to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_human_flag() -> String {
    "ludzki".to_string()
}

fn default_packaging_delimiter() -> String {
    DEFAULT_PACKAGING_DELIMITER.to_string()
}

fn default_user_agent() -> String {
    format!("apteczka/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            url: default_url(),
            timeout_secs: default_timeout(),
            human_flag: default_human_flag(),
            packaging_delimiter: default_packaging_delimiter(),
            user_agent: default_user_agent(),
        }
    }
}

impl RegistryConfig {
    /// Request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> TransferResult<()> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(TransferError::InvalidConfig(format!(
                "Registry URL must start with http:// or https://, got: {}",
                self.url
            )));
        }

        if self.timeout_secs == 0 {
            return Err(TransferError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.human_flag.trim().is_empty() {
            return Err(TransferError::InvalidConfig("human_flag must not be empty".into()));
        }

        if self.packaging_delimiter.is_empty() {
            return Err(TransferError::InvalidConfig(
                "packaging_delimiter must not be empty".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RegistryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.human_flag, "ludzki");
        assert_eq!(config.packaging_delimiter, "¦");
        assert_eq!(config.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_validation_failures() {
        let config = RegistryConfig {
            url: "ftp://example.org/rpl.csv".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(TransferError::InvalidConfig(_))));

        let config = RegistryConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RegistryConfig {
            packaging_delimiter: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
