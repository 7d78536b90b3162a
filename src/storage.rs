//! # Storage Module
//!
//! ## Purpose
//! Persistence gateway for arbitration cases over SQLite: schema creation,
//! deduplicated inserts keyed on the case number, and full/filtered reads.
//!
//! ## Input/Output Specification
//! - **Input**: [`CaseRecord`]s to insert, filter criteria for reads
//! - **Output**: persisted rows, read back as records (never mutated)
//! - **Dedup**: `ON CONFLICT (case_number) DO NOTHING` — a repeat insert is a
//!   no-op success, not an overwrite and not an error
//!
//! Every operation opens a fresh connection and closes it before returning;
//! there is no pooling and no shared connection state.

use crate::errors::Result;
use crate::CaseRecord;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS arbitration_cases (
    case_number TEXT PRIMARY KEY,
    case_date   TEXT,
    inn         TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_arbitration_cases_inn ON arbitration_cases(inn);
";

const SELECT_COLUMNS: &str = "SELECT case_number, case_date, inn FROM arbitration_cases";

/// Optional, AND-combined read filters. Text filters match as
/// case-insensitive substrings; date bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub case_number: Option<String>,
    pub inn: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl CaseFilter {
    pub fn is_empty(&self) -> bool {
        self.case_number.is_none()
            && self.inn.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }
}

/// SQLite-backed case store
pub struct CaseStore {
    db_path: PathBuf,
}

impl CaseStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Open a fresh connection for one operation
    fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Connection::open(&self.db_path)?)
    }

    /// Create the cases table and indexes if they do not exist yet
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA_SQL)?;
        debug!("Schema ensured at {}", self.db_path.display());
        Ok(())
    }

    /// Insert one case. Returns `true` when a new row landed and `false`
    /// when the case number already existed (harmless dedup); hard storage
    /// failures surface as errors.
    pub fn insert(&self, record: &CaseRecord) -> Result<bool> {
        let conn = self.connect()?;
        let changed = conn.execute(
            "INSERT INTO arbitration_cases (case_number, case_date, inn)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (case_number) DO NOTHING",
            params![
                record.case_number,
                record.case_date.map(|d| d.format("%Y-%m-%d").to_string()),
                record.inn,
            ],
        )?;

        if changed == 0 {
            info!("Case {} already exists, insert skipped", record.case_number);
            Ok(false)
        } else {
            info!("Case {} inserted", record.case_number);
            Ok(true)
        }
    }

    /// Whether a case with this number is already persisted
    pub fn case_exists(&self, case_number: &str) -> Result<bool> {
        let conn = self.connect()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM arbitration_cases WHERE case_number = ?1",
                params![case_number],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Read all persisted cases
    pub fn get_all(&self) -> Result<Vec<CaseRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(SELECT_COLUMNS)?;
        let rows = stmt
            .query_map([], row_to_tuple)?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        debug!("Read {} cases", rows.len());
        Ok(rows.into_iter().map(tuple_to_record).collect())
    }

    /// Read cases matching the filter. With no filters set this returns the
    /// same set as [`CaseStore::get_all`].
    pub fn get_filtered(&self, filter: &CaseFilter) -> Result<Vec<CaseRecord>> {
        let mut sql = format!("{SELECT_COLUMNS} WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(case_number) = &filter.case_number {
            sql.push_str(" AND LOWER(case_number) LIKE LOWER(?)");
            bindings.push(format!("%{case_number}%"));
        }
        if let Some(inn) = &filter.inn {
            sql.push_str(" AND inn LIKE ?");
            bindings.push(format!("%{inn}%"));
        }
        if let Some(start) = filter.start_date {
            sql.push_str(" AND case_date >= ?");
            bindings.push(start.format("%Y-%m-%d").to_string());
        }
        if let Some(end) = filter.end_date {
            sql.push_str(" AND case_date <= ?");
            bindings.push(end.format("%Y-%m-%d").to_string());
        }

        let conn = self.connect()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(bindings.iter()), row_to_tuple)?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        debug!("Read {} filtered cases", rows.len());
        Ok(rows.into_iter().map(tuple_to_record).collect())
    }
}

type RowTuple = (String, Option<String>, String);

fn row_to_tuple(row: &rusqlite::Row<'_>) -> std::result::Result<RowTuple, rusqlite::Error> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn tuple_to_record((case_number, case_date, inn): RowTuple) -> CaseRecord {
    CaseRecord {
        case_number,
        case_date: case_date
            .as_deref()
            .and_then(|text| NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()),
        inn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, CaseStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CaseStore::new(dir.path().join("cases.db"));
        store.ensure_schema().expect("schema");
        (dir, store)
    }

    fn record(number: &str, date: Option<&str>, inn: &str) -> CaseRecord {
        CaseRecord {
            case_number: number.to_string(),
            case_date: date.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            inn: inn.to_string(),
        }
    }

    #[test]
    fn test_duplicate_insert_is_noop_success() {
        let (_dir, store) = test_store();
        let case = record("CASE-001", Some("2023-01-15"), "1234567890");

        assert!(store.insert(&case).unwrap());
        assert!(!store.insert(&case).unwrap());
        assert_eq!(store.get_all().unwrap().len(), 1);
        assert!(store.case_exists("CASE-001").unwrap());
        assert!(!store.case_exists("CASE-404").unwrap());
    }

    #[test]
    fn test_null_date_round_trips() {
        let (_dir, store) = test_store();
        store
            .insert(&record("CASE-ND", None, "1234567890"))
            .unwrap();

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].case_date, None);
    }

    #[test]
    fn test_unfiltered_read_matches_get_all() {
        let (_dir, store) = test_store();
        store
            .insert(&record("CASE-001", Some("2023-01-15"), "1234567890"))
            .unwrap();
        store
            .insert(&record("CASE-002", Some("2023-01-16"), "0987654321"))
            .unwrap();

        let all = store.get_all().unwrap();
        let filtered = store.get_filtered(&CaseFilter::default()).unwrap();
        assert_eq!(all.len(), filtered.len());
        for case in &all {
            assert!(filtered.contains(case));
        }
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let (_dir, store) = test_store();
        store
            .insert(&record("CASE-DEC", Some("2022-12-31"), "1234567890"))
            .unwrap();
        store
            .insert(&record("CASE-JAN-01", Some("2023-01-01"), "1234567890"))
            .unwrap();
        store
            .insert(&record("CASE-JAN-31", Some("2023-01-31"), "1234567890"))
            .unwrap();
        store
            .insert(&record("CASE-FEB", Some("2023-02-01"), "1234567890"))
            .unwrap();

        let filter = CaseFilter {
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2023, 1, 31),
            ..CaseFilter::default()
        };
        let hits = store.get_filtered(&filter).unwrap();
        let numbers: Vec<&str> = hits.iter().map(|c| c.case_number.as_str()).collect();
        assert_eq!(numbers, vec!["CASE-JAN-01", "CASE-JAN-31"]);
    }

    #[test]
    fn test_substring_filters_are_case_insensitive() {
        let (_dir, store) = test_store();
        store
            .insert(&record("CASE-Abc-1", Some("2023-01-15"), "1234567890"))
            .unwrap();
        store
            .insert(&record("OTHER-2", Some("2023-01-16"), "555666777888"))
            .unwrap();

        let filter = CaseFilter {
            case_number: Some("abc".to_string()),
            ..CaseFilter::default()
        };
        let hits = store.get_filtered(&filter).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].case_number, "CASE-Abc-1");

        let filter = CaseFilter {
            inn: Some("666777".to_string()),
            ..CaseFilter::default()
        };
        let hits = store.get_filtered(&filter).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].inn, "555666777888");
    }

    #[test]
    fn test_filters_combine_with_and() {
        let (_dir, store) = test_store();
        store
            .insert(&record("CASE-001", Some("2023-01-15"), "1234567890"))
            .unwrap();
        store
            .insert(&record("CASE-002", Some("2023-05-20"), "1234567890"))
            .unwrap();

        let filter = CaseFilter {
            inn: Some("1234567890".to_string()),
            end_date: NaiveDate::from_ymd_opt(2023, 2, 1),
            ..CaseFilter::default()
        };
        let hits = store.get_filtered(&filter).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].case_number, "CASE-001");
    }
}
