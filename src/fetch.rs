//! Fetch stage
//!
//! For each dataset: download the series, save it to `<CODE>.csv`, and collect
//! its metadata. Once every dataset is done the metadata list is written in
//! processing order. The first failure aborts the batch.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::data::save_series;
use crate::error::{EtlError, EtlResult};
use crate::metadata::write_metadata;
use crate::provider::DataProvider;
use crate::types::{DatasetCode, DatasetMetadata, WriteMode};

/// Where the fetch stage writes its files
#[derive(Debug, Clone)]
pub struct FetchTarget {
    pub data_dir: PathBuf,
    pub metadata_path: PathBuf,
    pub write_mode: WriteMode,
}

/// Per-dataset result of a fetch
#[derive(Debug, Clone)]
pub struct FetchedDataset {
    pub metadata: DatasetMetadata,
    pub path: PathBuf,
    pub rows: usize,
}

/// Summary of a completed fetch run
#[derive(Debug, Clone)]
pub struct FetchSummary {
    pub datasets: Vec<FetchedDataset>,
    pub metadata_path: PathBuf,
}

impl FetchSummary {
    pub fn total_rows(&self) -> usize {
        self.datasets.iter().map(|d| d.rows).sum()
    }
}

/// Fetch every dataset in `codes` and write the metadata store
///
/// `on_progress` is called after each dataset with its index and code.
pub fn fetch_all<P, F>(
    provider: &P,
    codes: &[DatasetCode],
    target: &FetchTarget,
    mut on_progress: F,
) -> EtlResult<FetchSummary>
where
    P: DataProvider + ?Sized,
    F: FnMut(usize, &DatasetCode),
{
    ensure_dir(&target.data_dir)?;

    info!(
        "Fetching {} datasets from {} into {}",
        codes.len(),
        provider.name(),
        target.data_dir.display()
    );

    let mut datasets = Vec::with_capacity(codes.len());
    for (i, code) in codes.iter().enumerate() {
        let series = provider.fetch_series(code)?;
        let path = save_series(&target.data_dir, &series, target.write_mode)?;

        let metadata = provider.fetch_metadata(code)?;
        info!(
            "[{}/{}] {} ({}): {} rows, {} to {}",
            i + 1,
            codes.len(),
            code,
            metadata.name,
            series.len(),
            metadata.oldest_date,
            metadata.newest_date
        );

        datasets.push(FetchedDataset {
            metadata,
            path,
            rows: series.len(),
        });
        on_progress(i, code);
    }

    let metadata: Vec<DatasetMetadata> = datasets.iter().map(|d| d.metadata.clone()).collect();
    write_metadata(&target.metadata_path, &metadata, target.write_mode)?;

    Ok(FetchSummary {
        datasets,
        metadata_path: target.metadata_path.clone(),
    })
}

fn ensure_dir(dir: &Path) -> EtlResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| EtlError::from_io(dir, e))
}
