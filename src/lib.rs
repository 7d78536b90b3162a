//! # Arbitration Case Checker
//!
//! ## Overview
//! Retrieves arbitration-case records for a given taxpayer ID (INN) from the
//! public case-search site `kad.arbitr.ru` by driving a WebDriver session,
//! persists them to a SQLite store with duplicate suppression, and exposes
//! review/filter/export operations over the stored records.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `scraper`: the source connector — WebDriver client and the
//!   scrape-and-normalize pipeline for the result page
//! - `storage`: SQLite persistence gateway with deduplicated inserts and
//!   filtered reads
//! - `export`: CSV and JSON serialization of stored records
//! - `app`: coordinator sequencing validation, scraping, presentation and
//!   persistence for each user-facing operation
//! - `config`: configuration management and settings
//! - `errors`: centralized error handling and types
//!
//! ## Usage
//! ```rust,no_run
//! use arbitr_checker::{app::App, config::Config, scraper::ArbitrScraper, storage::CaseStore};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config.toml")?;
//!     let scraper = ArbitrScraper::new(config.webdriver.clone(), config.source.clone())?;
//!     let store = CaseStore::new(&config.storage.db_path);
//!     let _app = App::new(scraper, store, config.source.max_results);
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod config;
pub mod errors;
pub mod export;
pub mod scraper;
pub mod storage;

pub use app::App;
pub use config::Config;
pub use errors::{CheckerError, Result};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single arbitration case as retrieved from the source and persisted.
///
/// `case_number` is the natural key: the persisted set never holds two records
/// with the same number. `case_date` is `None` when the source date could not
/// be parsed; such records are kept, not dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Case number assigned by the arbitration court.
    pub case_number: String,
    /// Registration date of the case, if the source date was parsable.
    pub case_date: Option<NaiveDate>,
    /// Taxpayer ID the record was retrieved for.
    pub inn: String,
}

impl CaseRecord {
    /// ISO-8601 date text for display and export; empty when the date is unknown.
    pub fn date_iso(&self) -> String {
        self.case_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// Check the taxpayer ID shape: decimal digits only, length 10 or 12.
///
/// The coordinator enforces this before the source connector is ever invoked;
/// the connector itself does not re-validate.
pub fn is_valid_inn(inn: &str) -> bool {
    matches!(inn.len(), 10 | 12) && inn.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_inn_lengths() {
        assert!(is_valid_inn("1234567890"));
        assert!(is_valid_inn("123456789012"));
    }

    #[test]
    fn test_invalid_inn_shapes() {
        assert!(!is_valid_inn(""));
        assert!(!is_valid_inn("123456789"));
        assert!(!is_valid_inn("12345678901"));
        assert!(!is_valid_inn("1234567890123"));
        assert!(!is_valid_inn("12345abcde"));
        assert!(!is_valid_inn("1234 67890"));
        // Full-width digits are multi-byte, so both checks reject them.
        assert!(!is_valid_inn("１２３４５６７８９０"));
    }

    #[test]
    fn test_date_iso() {
        let with_date = CaseRecord {
            case_number: "А40-1/2023".to_string(),
            case_date: NaiveDate::from_ymd_opt(2023, 3, 15),
            inn: "1234567890".to_string(),
        };
        assert_eq!(with_date.date_iso(), "2023-03-15");

        let without_date = CaseRecord {
            case_date: None,
            ..with_date
        };
        assert_eq!(without_date.date_iso(), "");
    }
}
