//! # kad.arbitr.ru Source Connector
//!
//! ## Purpose
//! Drives a WebDriver session against the kad.arbitr.ru case-search page for
//! one taxpayer ID query: open page, fill the query field, submit, wait for
//! the asynchronous result panel, then extract and normalize result rows into
//! [`CaseRecord`]s.
//!
//! ## Input/Output Specification
//! - **Input**: taxpayer ID (pre-validated), maximum result count
//! - **Output**: ordered records in page order, at most `max_results`
//! - **Faults**: bounded-wait expiry → source unavailable; session faults →
//!   automation fault; row-level extraction faults are localized (row skipped)
//!
//! ## Pipeline
//! 1. Create a session with anti-detection Chrome options
//! 2. Navigate to the search page
//! 3. Wait for the query textarea, clear it, type the INN
//! 4. Wait for the submit button, click it via script
//! 5. Fixed settle delay, then wait for the results container
//! 6. Enumerate case rows and normalize each one
//! 7. Tear the session down on every exit path

use crate::config::{SourceConfig, WebDriverConfig};
use crate::errors::Result;
use crate::scraper::webdriver::{is_no_such_element, ElementRef, Session, WebDriverClient};
use crate::scraper::CaseSource;
use crate::CaseRecord;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Structural locator for the query textarea; the page carries no stable id
/// on it, so the fixed path from the document root is used.
const INN_INPUT_XPATH: &str = "/html/body/div[1]/div[1]/div[1]/dl/dd/div[1]/div/textarea";

/// The submit control is identified by its visible label.
const SEARCH_BUTTON_XPATH: &str = "//button[contains(text(), 'Найти')]";

/// Results container element id.
const RESULTS_CONTAINER_XPATH: &str = "//*[@id='b-cases']";

/// A data row is a table row containing a case-number anchor.
const RESULT_ROW_XPATH: &str = "//table[@id='b-cases']//tr[.//a[@class='num_case']]";

const ROW_CELL_XPATH: &str = "./td";

/// First descendant of the leading cell whose text carries a dot is the date.
const DATE_IN_CELL_XPATH: &str = ".//*[contains(text(), '.')][1]";

/// Case-number link targets the case-detail card.
const CASE_LINK_XPATH: &str = ".//a[contains(@href, '/Card/')]";

/// Source connector for the arbitration case-search site
pub struct ArbitrScraper {
    client: WebDriverClient,
    webdriver: WebDriverConfig,
    source: SourceConfig,
}

/// Raw per-row extraction output, before normalization. Kept separate from
/// the session-driving code so acceptance rules stay purely testable.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawRow {
    /// Number of `td` cells the row carried
    pub cell_count: usize,
    /// Trimmed text of the date-bearing element, if found
    pub date_text: Option<String>,
    /// Trimmed text of the case-number link, if found
    pub case_number: Option<String>,
}

impl ArbitrScraper {
    pub fn new(webdriver: WebDriverConfig, source: SourceConfig) -> Result<Self> {
        let client = WebDriverClient::new(&webdriver)?;
        Ok(Self {
            client,
            webdriver,
            source,
        })
    }

    async fn scrape(
        &self,
        session: &Session,
        inn: &str,
        max_results: usize,
    ) -> Result<Vec<CaseRecord>> {
        session.goto(&self.source.base_url).await?;
        info!("Navigated to {}", self.source.base_url);

        let input_wait = Duration::from_secs(self.source.input_wait_secs);
        let input = session
            .wait_for_element(INN_INPUT_XPATH, input_wait, "query input")
            .await?;
        session.clear(&input).await?;
        session.send_keys(&input, inn).await?;
        info!("Entered INN: {}", inn);

        let button = session
            .wait_for_enabled(SEARCH_BUTTON_XPATH, input_wait, "search button")
            .await?;
        session.script_click(&button).await?;
        info!("Submitted search");

        // The result panel renders asynchronously; its container can appear
        // before any rows do, so a fixed settle delay precedes the bounded
        // wait on the container itself.
        sleep(Duration::from_secs(self.source.settle_delay_secs)).await;
        session
            .wait_for_element(
                RESULTS_CONTAINER_XPATH,
                Duration::from_secs(self.source.results_wait_secs),
                "results container",
            )
            .await?;
        info!("Results container present");

        let rows = session.find_elements(RESULT_ROW_XPATH).await?;
        let mut cases = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            if cases.len() >= max_results {
                break;
            }
            match self.extract_row(session, row).await {
                Ok(raw) => {
                    if let Some(record) = normalize_row(raw, inn) {
                        info!(
                            "Extracted case {} ({}) for INN {}",
                            record.case_number,
                            record.date_iso(),
                            inn
                        );
                        cases.push(record);
                    }
                }
                Err(err) if is_no_such_element(&err) => {
                    warn!(
                        "Result row {} is missing expected elements, skipping",
                        index + 1
                    );
                }
                Err(err) => {
                    warn!("Failed to process result row {}: {}, skipping", index + 1, err);
                }
            }
        }

        Ok(cases)
    }

    async fn extract_row(&self, session: &Session, row: &ElementRef) -> Result<RawRow> {
        let cells = session.find_elements_from(row, ROW_CELL_XPATH).await?;
        if cells.len() < 4 {
            return Ok(RawRow {
                cell_count: cells.len(),
                ..RawRow::default()
            });
        }

        // The leading cell carries both the registration date and the
        // case-number link.
        let first_cell = &cells[0];
        let date_element = session
            .find_element_from(first_cell, DATE_IN_CELL_XPATH)
            .await?;
        let date_text = session.text(&date_element).await?.trim().to_string();

        let case_link = session
            .find_element_from(first_cell, CASE_LINK_XPATH)
            .await?;
        let case_number = session.text(&case_link).await?.trim().to_string();

        Ok(RawRow {
            cell_count: cells.len(),
            date_text: Some(date_text),
            case_number: Some(case_number),
        })
    }
}

#[async_trait]
impl CaseSource for ArbitrScraper {
    fn name(&self) -> &str {
        "kad.arbitr.ru"
    }

    async fn fetch_cases(&self, inn: &str, max_results: usize) -> Result<Vec<CaseRecord>> {
        let session = self
            .client
            .new_session(chrome_capabilities(&self.webdriver))
            .await?;

        // The session must be torn down on every exit path, so the scrape
        // result is held across the close.
        let result = self.scrape(&session, inn, max_results).await;
        session.close().await;
        result
    }
}

/// Chrome capabilities for a headless-hostile page: automation flags off,
/// fixed viewport, insecure certificates not accepted.
fn chrome_capabilities(webdriver: &WebDriverConfig) -> Value {
    json!({
        "browserName": "chrome",
        "acceptInsecureCerts": false,
        "pageLoadStrategy": "normal",
        "goog:chromeOptions": {
            "args": [
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--disable-setuid-sandbox",
                format!("--window-size={}", webdriver.window_size),
                "--disable-gpu",
                "--ignore-certificate-errors",
                "--start-maximized",
                "--disable-blink-features=AutomationControlled",
            ],
            "excludeSwitches": ["enable-automation"],
            "useAutomationExtension": false,
        },
    })
}

/// Parse a source date in `dd.mm.yyyy` form
pub(crate) fn parse_case_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%d.%m.%Y").ok()
}

/// Apply the acceptance rules to one raw row.
///
/// Rows with fewer than four cells are non-data rows (headers and the like)
/// and yield nothing. A row is accepted when its case number is present and
/// non-empty; an unparsable date is kept as an unknown date with a warning,
/// not grounds for dropping the row.
pub(crate) fn normalize_row(raw: RawRow, inn: &str) -> Option<CaseRecord> {
    if raw.cell_count < 4 {
        return None;
    }

    let case_number = raw.case_number.filter(|n| !n.is_empty())?;
    let case_date = raw.date_text.as_deref().and_then(|text| {
        let parsed = parse_case_date(text);
        if parsed.is_none() {
            warn!(
                "Failed to parse case date '{}' for case {}",
                text, case_number
            );
        }
        parsed
    });

    Some(CaseRecord {
        case_number,
        case_date,
        inn: inn.to_string(),
    })
}

/// Normalize a sequence of raw rows, capping at `max_results` accepted rows
#[cfg(test)]
pub(crate) fn normalize_rows<I>(raws: I, inn: &str, max_results: usize) -> Vec<CaseRecord>
where
    I: IntoIterator<Item = RawRow>,
{
    let mut out = Vec::new();
    for raw in raws {
        if out.len() >= max_results {
            break;
        }
        if let Some(record) = normalize_row(raw, inn) {
            out.push(record);
        }
    }
    out
}
