//! Transform command - merge all datasets into one table indexed by date

use anyhow::{Context, Result};
use bitcoin_data::merge::{transform, MergeOptions};
use bitcoin_data::{Config, DatasetCode, WriteMode};
use std::path::PathBuf;
use tracing::info;

pub fn run(
    config: Config,
    reference: Option<DatasetCode>,
    output: Option<PathBuf>,
    write_mode: WriteMode,
) -> Result<()> {
    let reference = match reference {
        Some(code) => code,
        None => config.reference_code()?,
    };
    let output_path = output.unwrap_or_else(|| config.output_path());

    info!("Merging datasets onto the {} date index", reference);

    let options = MergeOptions {
        data_dir: config.data_dir.clone(),
        metadata_path: config.metadata_path(),
        reference,
        output_path,
        write_mode,
    };
    let table = transform(&options).context("Merge failed")?;

    println!(
        "Merged {} datasets over {} dates into {}",
        table.column_count(),
        table.row_count(),
        options.output_path.display()
    );
    Ok(())
}
