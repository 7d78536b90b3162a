//! # Source Connector Module
//!
//! ## Purpose
//! Defines the common interface for case sources and provides the
//! kad.arbitr.ru implementation driven over the WebDriver wire protocol.
//!
//! ## Input/Output Specification
//! - **Input**: Taxpayer ID (pre-validated by the coordinator), result limit
//! - **Output**: Ordered sequence of [`CaseRecord`]s in page order
//! - **Side effect**: one WebDriver session per call, torn down on every exit
//!   path
//!
//! ## Architecture
//! - `CaseSource` trait: the seam between coordinator and connector
//! - `webdriver.rs`: minimal W3C WebDriver client over HTTP/JSON
//! - `arbitr.rs`: scrape-and-normalize pipeline for the case-search page

pub mod arbitr;
pub mod webdriver;

pub use arbitr::ArbitrScraper;

use crate::errors::Result;
use crate::CaseRecord;
use async_trait::async_trait;

/// Trait for case sources.
///
/// One call performs one independent live query; results may legitimately
/// differ between calls. An empty vector is a valid, non-error outcome.
#[async_trait]
pub trait CaseSource {
    /// Name of this source, for status messages and logs
    fn name(&self) -> &str;

    /// Fetch up to `max_results` case records for a taxpayer ID, in the order
    /// the source lists them
    async fn fetch_cases(&self, inn: &str, max_results: usize) -> Result<Vec<CaseRecord>>;
}
