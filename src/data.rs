//! Per-dataset file loading and saving
//!
//! Each dataset is stored as `<CODE>.csv` with a `Date,Value` header. Readers
//! locate the two columns by name so files with extra columns still load.

use chrono::NaiveDate;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{EtlError, EtlResult};
use crate::types::{DatasetCode, Observation, TimeSeries, WriteMode, DATE_FORMAT};

pub const DATE_COLUMN: &str = "Date";
pub const VALUE_COLUMN: &str = "Value";

/// Path of the per-dataset file for `code` inside `data_dir`
pub fn series_path(data_dir: impl AsRef<Path>, code: &DatasetCode) -> PathBuf {
    data_dir.as_ref().join(format!("{}.csv", code))
}

/// Open `path` for writing according to `mode`
pub fn create_output(path: impl AsRef<Path>, mode: WriteMode) -> EtlResult<File> {
    let path = path.as_ref();
    let mut options = OpenOptions::new();
    options.write(true);
    match mode {
        WriteMode::Overwrite => options.create(true).truncate(true),
        WriteMode::CreateNew => options.create_new(true),
    };
    options.open(path).map_err(|e| EtlError::from_io(path, e))
}

/// Save a series to `<data_dir>/<CODE>.csv`
pub fn save_series(
    data_dir: impl AsRef<Path>,
    series: &TimeSeries,
    mode: WriteMode,
) -> EtlResult<PathBuf> {
    let path = series_path(data_dir, &series.code);
    let file = create_output(&path, mode)?;
    let mut writer = csv::Writer::from_writer(file);

    writer
        .write_record([DATE_COLUMN, VALUE_COLUMN])
        .map_err(|e| EtlError::from_csv(&path, e))?;
    for obs in &series.observations {
        let date = obs.date.format(DATE_FORMAT).to_string();
        writer
            .write_record([date.as_str(), obs.value.as_str()])
            .map_err(|e| EtlError::from_csv(&path, e))?;
    }
    writer.flush().map_err(|e| EtlError::from_io(&path, e))?;

    info!("Saved {} rows to {}", series.len(), path.display());
    Ok(path)
}

/// Load a series from a file with `Date` and `Value` columns
pub fn load_series(path: impl AsRef<Path>, code: DatasetCode) -> EtlResult<TimeSeries> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).map_err(|e| EtlError::from_csv(path, e))?;

    let headers = reader
        .headers()
        .map_err(|e| EtlError::from_csv(path, e))?
        .clone();
    let date_idx = column_index(&headers, DATE_COLUMN, path)?;
    let value_idx = column_index(&headers, VALUE_COLUMN, path)?;

    let mut observations = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| EtlError::from_csv(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let raw_date = record.get(date_idx).unwrap_or_default();
        let date = parse_date(raw_date).ok_or_else(|| EtlError::Parse {
            path: path.to_path_buf(),
            line,
            message: format!("invalid date '{}'", raw_date),
        })?;
        let value = record.get(value_idx).unwrap_or_default();

        observations.push(Observation::new(date, value));
    }

    debug!("Loaded {} rows for {} from {}", observations.len(), code, path.display());
    Ok(TimeSeries::new(code, observations))
}

/// Parse a `YYYY-MM-DD` date, tolerating surrounding whitespace
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> EtlResult<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| EtlError::Parse {
            path: path.to_path_buf(),
            line: 1,
            message: format!("missing '{}' column", name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn code(s: &str) -> DatasetCode {
        DatasetCode::new(s).unwrap()
    }

    #[test]
    fn test_series_path() {
        assert_eq!(
            series_path("data", &code("HRATE")),
            PathBuf::from("data/HRATE.csv")
        );
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let series = TimeSeries::new(
            code("DIFF"),
            vec![
                Observation::new(date("2009-01-03"), "1.0"),
                Observation::new(date("2009-01-04"), ""),
            ],
        );

        let path = save_series(dir.path(), &series, WriteMode::Overwrite).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Date,Value\n2009-01-03,1.0\n2009-01-04,\n"
        );

        let loaded = load_series(&path, code("DIFF")).unwrap();
        assert_eq!(loaded, series);
    }

    #[test]
    fn test_overwrite_replaces_and_create_new_refuses() {
        let dir = tempfile::tempdir().unwrap();
        let path = series_path(dir.path(), &code("A"));
        fs::write(&path, "stale content that is longer than the new file\n").unwrap();

        let series = TimeSeries::new(code("A"), vec![Observation::new(date("2020-01-01"), "1")]);
        save_series(dir.path(), &series, WriteMode::Overwrite).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Date,Value\n2020-01-01,1\n");

        let err = save_series(dir.path(), &series, WriteMode::CreateNew).unwrap_err();
        assert!(matches!(err, EtlError::AlreadyExists { .. }));
    }

    #[test]
    fn test_load_locates_columns_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("X.csv");
        fs::write(&path, "Extra,Value,Date\nq,5,2020-01-02\nr,6,2020-01-03\n").unwrap();

        let series = load_series(&path, code("X")).unwrap();
        assert_eq!(series.dates(), vec![date("2020-01-02"), date("2020-01-03")]);
        assert_eq!(series.observations[1].value, "6");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_series(dir.path().join("NOPE.csv"), code("NOPE")).unwrap_err();
        assert!(matches!(err, EtlError::NotFound { .. }));
    }

    #[test]
    fn test_load_rejects_missing_value_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("X.csv");
        fs::write(&path, "Date,Close\n2020-01-01,1\n").unwrap();

        let err = load_series(&path, code("X")).unwrap_err();
        assert!(matches!(err, EtlError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_load_rejects_ragged_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("X.csv");
        fs::write(&path, "Date,Value\n2020-01-01,1\n2020-01-02,2,3\n").unwrap();

        let err = load_series(&path, code("X")).unwrap_err();
        assert!(matches!(err, EtlError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_load_rejects_bad_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("X.csv");
        fs::write(&path, "Date,Value\n01/02/2020,1\n").unwrap();

        let err = load_series(&path, code("X")).unwrap_err();
        assert!(matches!(err, EtlError::Parse { line: 2, .. }));
    }
}
