//! Merge stage
//!
//! Joins every dataset listed in the metadata store into one wide table
//! indexed by date.
//!
//! The row index is the date sequence of a single reference dataset. Other
//! datasets are reindexed onto it, not unioned: dates missing from the
//! reference are dropped, and reference dates a dataset lacks stay empty.
//! The reference series is the only thing deciding the table's shape.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::data::{create_output, load_series, series_path, DATE_COLUMN};
use crate::error::{EtlError, EtlResult};
use crate::metadata::read_metadata;
use crate::types::{DatasetCode, MergedColumn, MergedTable, TimeSeries, WriteMode, DATE_FORMAT};

/// Inputs and output of a merge run
#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub data_dir: PathBuf,
    pub metadata_path: PathBuf,
    pub reference: DatasetCode,
    pub output_path: PathBuf,
    pub write_mode: WriteMode,
}

/// How a series lined up against the reference dates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexStats {
    /// Observations whose date is not in the reference index
    pub dropped: usize,
    /// Reference dates with no observation
    pub missing: usize,
    /// Observations ignored because an earlier one had the same date
    pub duplicates: usize,
}

/// Place `series` values onto `dates`
///
/// The first observation wins when a date repeats within `series`.
pub fn reindex(series: &TimeSeries, dates: &[NaiveDate]) -> (Vec<Option<String>>, ReindexStats) {
    let mut stats = ReindexStats::default();

    let mut by_date: HashMap<NaiveDate, &str> = HashMap::with_capacity(series.len());
    for obs in &series.observations {
        if by_date.contains_key(&obs.date) {
            stats.duplicates += 1;
        } else {
            by_date.insert(obs.date, obs.value.as_str());
        }
    }

    let index: HashSet<&NaiveDate> = dates.iter().collect();
    stats.dropped = by_date.keys().filter(|d| !index.contains(d)).count();

    let values: Vec<Option<String>> = dates
        .iter()
        .map(|d| by_date.get(d).map(|v| v.to_string()))
        .collect();
    stats.missing = values.iter().filter(|v| v.is_none()).count();

    (values, stats)
}

/// Build the merged table from the metadata store and per-dataset files
///
/// Fails with `NotFound` if the metadata file or the reference file is
/// missing, and with `MissingFile` if any listed dataset has no file.
pub fn merge_datasets(
    data_dir: impl AsRef<Path>,
    metadata_path: impl AsRef<Path>,
    reference: &DatasetCode,
) -> EtlResult<MergedTable> {
    let data_dir = data_dir.as_ref();
    let metadata = read_metadata(metadata_path)?;

    let reference_series = load_series(series_path(data_dir, reference), reference.clone())?;
    let mut table = MergedTable::with_index(reference_series.dates());
    info!(
        "Reference {} provides {} dates",
        reference,
        table.row_count()
    );

    for row in &metadata {
        let path = series_path(data_dir, &row.code);
        let series = load_series(&path, row.code.clone()).map_err(|e| match e {
            EtlError::NotFound { path } => EtlError::MissingFile {
                code: row.code.to_string(),
                path,
            },
            other => other,
        })?;

        let (values, stats) = reindex(&series, &table.dates);
        if stats.dropped > 0 || stats.missing > 0 || stats.duplicates > 0 {
            warn!(
                "{}: {} dates outside the {} index dropped, {} empty cells, {} duplicate dates ignored",
                row.code, stats.dropped, reference, stats.missing, stats.duplicates
            );
        }
        debug!("{}: {} observations", row.code, series.len());

        table.columns.push(MergedColumn {
            code: row.code.clone(),
            values,
        });
    }

    Ok(table)
}

/// Write a merged table: `Date` first, then one column per dataset
pub fn write_merged(table: &MergedTable, path: impl AsRef<Path>, mode: WriteMode) -> EtlResult<()> {
    let path = path.as_ref();
    let file = create_output(path, mode)?;
    let mut writer = csv::Writer::from_writer(file);

    let mut header = Vec::with_capacity(table.column_count() + 1);
    header.push(DATE_COLUMN);
    header.extend(table.columns.iter().map(|c| c.code.as_str()));
    writer
        .write_record(&header)
        .map_err(|e| EtlError::from_csv(path, e))?;

    for (i, date) in table.dates.iter().enumerate() {
        let date = date.format(DATE_FORMAT).to_string();
        let mut record = Vec::with_capacity(table.column_count() + 1);
        record.push(date.as_str());
        record.extend(
            table
                .columns
                .iter()
                .map(|c| c.values.get(i).and_then(|v| v.as_deref()).unwrap_or("")),
        );
        writer
            .write_record(&record)
            .map_err(|e| EtlError::from_csv(path, e))?;
    }
    writer.flush().map_err(|e| EtlError::from_io(path, e))?;

    Ok(())
}

/// Merge every dataset and write the result
///
/// The output file is only opened once all inputs have been read, so an
/// input failure never creates it.
pub fn transform(options: &MergeOptions) -> EtlResult<MergedTable> {
    let table = merge_datasets(&options.data_dir, &options.metadata_path, &options.reference)?;
    write_merged(&table, &options.output_path, options.write_mode)?;

    info!(
        "Wrote {} rows x {} datasets to {}",
        table.row_count(),
        table.column_count(),
        options.output_path.display()
    );
    Ok(table)
}
