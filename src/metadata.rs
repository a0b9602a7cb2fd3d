//! Metadata store
//!
//! A CSV file with one row per dataset:
//! `TableName,FullName,Description,NewestAvailableDate,OldestAvailableDate`.
//! Written once by the fetch stage, read by the display and merge stages.

use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use crate::data::create_output;
use crate::error::{EtlError, EtlResult};
use crate::types::{DatasetMetadata, WriteMode};

pub const METADATA_HEADER: [&str; 5] = [
    "TableName",
    "FullName",
    "Description",
    "NewestAvailableDate",
    "OldestAvailableDate",
];

/// Write the full metadata list, header first, rows in the given order
pub fn write_metadata(
    path: impl AsRef<Path>,
    rows: &[DatasetMetadata],
    mode: WriteMode,
) -> EtlResult<()> {
    let path = path.as_ref();
    let file = create_output(path, mode)?;
    // Header is written explicitly so an empty list still produces one
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    writer
        .write_record(METADATA_HEADER)
        .map_err(|e| EtlError::from_csv(path, e))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| EtlError::from_csv(path, e))?;
    }
    writer.flush().map_err(|e| EtlError::from_io(path, e))?;

    info!("Wrote {} metadata rows to {}", rows.len(), path.display());
    Ok(())
}

/// Read every metadata row in file order
pub fn read_metadata(path: impl AsRef<Path>) -> EtlResult<Vec<DatasetMetadata>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).map_err(|e| EtlError::from_csv(path, e))?;

    let headers = reader
        .headers()
        .map_err(|e| EtlError::from_csv(path, e))?
        .clone();
    if headers.iter().ne(METADATA_HEADER.iter().copied()) {
        return Err(EtlError::Parse {
            path: path.to_path_buf(),
            line: 1,
            message: format!(
                "unexpected header '{}', expected '{}'",
                headers.iter().collect::<Vec<_>>().join(","),
                METADATA_HEADER.join(",")
            ),
        });
    }

    let mut rows: Vec<DatasetMetadata> = Vec::new();
    let mut seen = HashSet::new();
    for result in reader.records() {
        let record = result.map_err(|e| EtlError::from_csv(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let row: DatasetMetadata = record
            .deserialize(Some(&headers))
            .map_err(|e| EtlError::from_csv(path, e))?;

        // TableName is the store's key
        if !seen.insert(row.code.clone()) {
            return Err(EtlError::Parse {
                path: path.to_path_buf(),
                line,
                message: format!("duplicate TableName {}", row.code),
            });
        }
        rows.push(row);
    }

    debug!("Read {} metadata rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DatasetCode;
    use chrono::NaiveDate;
    use std::fs;

    fn row(code: &str, name: &str, description: &str) -> DatasetMetadata {
        DatasetMetadata {
            code: DatasetCode::new(code).unwrap(),
            name: name.to_string(),
            description: description.to_string(),
            newest_date: NaiveDate::from_ymd_opt(2022, 12, 6).unwrap(),
            oldest_date: NaiveDate::from_ymd_opt(2009, 1, 3).unwrap(),
        }
    }

    #[test]
    fn test_write_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.csv");
        write_metadata(&path, &[row("HRATE", "Hash Rate", "TH/s")], WriteMode::Overwrite).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "TableName,FullName,Description,NewestAvailableDate,OldestAvailableDate\n\
             HRATE,Hash Rate,TH/s,2022-12-06,2009-01-03\n"
        );
    }

    #[test]
    fn test_round_trip_preserves_order_and_quoting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.csv");
        let rows = vec![
            row("MKPRU", "Bitcoin Market Price USD", "Average USD market price, across exchanges."),
            row("ATRCT", "Median Transaction Confirmation Time", "The \"median\" time\nfor a block."),
            row("DIFF", "Difficulty", ""),
        ];

        write_metadata(&path, &rows, WriteMode::Overwrite).unwrap();
        let read = read_metadata(&path).unwrap();
        assert_eq!(read, rows);
    }

    #[test]
    fn test_empty_list_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.csv");
        write_metadata(&path, &[], WriteMode::Overwrite).unwrap();

        assert!(read_metadata(&path).unwrap().is_empty());
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_metadata(dir.path().join("metadata.csv")).unwrap_err();
        assert!(matches!(err, EtlError::NotFound { .. }));
    }

    #[test]
    fn test_read_rejects_wrong_column_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.csv");
        fs::write(
            &path,
            "TableName,FullName,Description,NewestAvailableDate,OldestAvailableDate\n\
             HRATE,Hash Rate,2022-12-06,2009-01-03\n",
        )
        .unwrap();

        let err = read_metadata(&path).unwrap_err();
        assert!(matches!(err, EtlError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_read_rejects_duplicate_table_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.csv");
        write_metadata(
            &path,
            &[row("A", "Metric A", "desc"), row("B", "Metric B", "desc"), row("A", "Again", "desc")],
            WriteMode::Overwrite,
        )
        .unwrap();

        let err = read_metadata(&path).unwrap_err();
        match err {
            EtlError::Parse { line, message, .. } => {
                assert_eq!(line, 4);
                assert!(message.contains("duplicate TableName A"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_read_rejects_unexpected_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.csv");
        fs::write(&path, "Code,Name\nHRATE,Hash Rate\n").unwrap();

        assert!(matches!(
            read_metadata(&path),
            Err(EtlError::Parse { line: 1, .. })
        ));
    }
}
