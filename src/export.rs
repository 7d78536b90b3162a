//! # Export Module
//!
//! ## Purpose
//! Serializes persisted case records to CSV and JSON files with a fixed
//! column order and ISO-8601 dates.
//!
//! ## Input/Output Specification
//! - **Input**: case records read back from the store
//! - **Output**: UTF-8 CSV with the header `case_number,case_date,inn`, or a
//!   pretty-printed JSON array of objects with the same three keys
//! - **Dates**: ISO-8601 text; unknown dates export as an empty CSV field /
//!   JSON `null`

use crate::errors::Result;
use crate::CaseRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Fixed CSV column order
pub const CSV_HEADER: &str = "case_number,case_date,inn";

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_field<W: Write>(w: &mut W, field: &str) -> std::io::Result<()> {
    if needs_quotes(field) {
        let escaped = field.replace('"', "\"\"");
        write!(w, "\"{escaped}\"")
    } else {
        write!(w, "{field}")
    }
}

/// Write records to a CSV file, header row first, rows in slice order
pub fn export_csv<P: AsRef<Path>>(records: &[CaseRecord], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);

    writeln!(writer, "{CSV_HEADER}")?;
    for record in records {
        write_field(&mut writer, &record.case_number)?;
        write!(writer, ",")?;
        write_field(&mut writer, &record.date_iso())?;
        write!(writer, ",")?;
        write_field(&mut writer, &record.inn)?;
        writeln!(writer)?;
    }
    writer.flush()?;

    info!("Exported {} cases to CSV: {}", records.len(), path.display());
    Ok(())
}

/// Write records to a pretty-printed JSON array
pub fn export_json<P: AsRef<Path>>(records: &[CaseRecord], path: P) -> Result<()> {
    let path = path.as_ref();
    let payload = serde_json::to_string_pretty(records)?;
    std::fs::write(path, payload)?;

    info!("Exported {} cases to JSON: {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_records() -> Vec<CaseRecord> {
        vec![
            CaseRecord {
                case_number: "А12-34/2023".to_string(),
                case_date: NaiveDate::from_ymd_opt(2023, 3, 15),
                inn: "1234567890".to_string(),
            },
            CaseRecord {
                case_number: "А56-78/2023".to_string(),
                case_date: None,
                inn: "1234567890".to_string(),
            },
        ]
    }

    /// Minimal quote-aware CSV reader for round-trip checks
    fn parse_csv(text: &str) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        for line in text.lines() {
            let mut row = Vec::new();
            let mut field = String::new();
            let mut in_quotes = false;
            let mut chars = line.chars().peekable();
            while let Some(ch) = chars.next() {
                match ch {
                    '"' if in_quotes && chars.peek() == Some(&'"') => {
                        chars.next();
                        field.push('"');
                    }
                    '"' => in_quotes = !in_quotes,
                    ',' if !in_quotes => row.push(std::mem::take(&mut field)),
                    _ => field.push(ch),
                }
            }
            row.push(field);
            rows.push(row);
        }
        rows
    }

    #[test]
    fn test_csv_round_trip_preserves_tuples_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.csv");
        let records = sample_records();

        export_csv(&records, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let rows = parse_csv(&text);
        assert_eq!(rows[0], vec!["case_number", "case_date", "inn"]);
        assert_eq!(rows[1], vec!["А12-34/2023", "2023-03-15", "1234567890"]);
        assert_eq!(rows[2], vec!["А56-78/2023", "", "1234567890"]);
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_csv_quotes_awkward_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.csv");
        let records = vec![CaseRecord {
            case_number: "А1,\"спор\"/2023".to_string(),
            case_date: NaiveDate::from_ymd_opt(2023, 1, 2),
            inn: "1234567890".to_string(),
        }];

        export_csv(&records, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let rows = parse_csv(&text);
        assert_eq!(rows[1][0], "А1,\"спор\"/2023");
    }

    #[test]
    fn test_json_export_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.json");
        let records = sample_records();

        export_json(&records, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        let array = parsed.as_array().expect("JSON array");
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["case_number"], "А12-34/2023");
        assert_eq!(array[0]["case_date"], "2023-03-15");
        assert_eq!(array[0]["inn"], "1234567890");
        assert_eq!(array[1]["case_date"], serde_json::Value::Null);
        // Human-readable indentation, not a single line.
        assert!(text.contains('\n'));
    }
}
