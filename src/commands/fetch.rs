//! Fetch command - download every configured dataset and its metadata

use anyhow::{Context, Result};
use bitcoin_data::fetch::{fetch_all, FetchTarget};
use bitcoin_data::provider::NasdaqDataLinkClient;
use bitcoin_data::{Config, WriteMode};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

pub fn run(config: Config, write_mode: WriteMode) -> Result<()> {
    info!("Starting dataset fetch");

    // Key may live in a .env file rather than the key file
    dotenv::dotenv().ok();
    let api_key = config
        .api_key()
        .context("Failed to resolve Nasdaq Data Link API key")?;

    let codes = config.dataset_codes()?;
    let client = NasdaqDataLinkClient::new(&config, api_key)?;
    let target = FetchTarget {
        data_dir: config.data_dir.clone(),
        metadata_path: config.metadata_path(),
        write_mode,
    };

    println!("\n{}", "=".repeat(60));
    println!("FETCHING {} DATASETS FROM {}", codes.len(), config.database);
    println!("{}", "=".repeat(60));
    println!("  Output:     {}", target.data_dir.display());
    println!("  Metadata:   {}", target.metadata_path.display());
    println!("{}\n", "=".repeat(60));

    let pb = ProgressBar::new(codes.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let summary = fetch_all(&client, &codes, &target, |_, code| {
        pb.set_message(code.to_string());
        pb.inc(1);
    });
    pb.finish_and_clear();
    let summary = summary.context("Fetch aborted")?;

    println!("\n{}", "=".repeat(60));
    println!("FETCH COMPLETE");
    println!("{}", "=".repeat(60));
    for dataset in &summary.datasets {
        println!(
            "  {:<8} {:>6} rows  {}",
            dataset.metadata.code.as_str(),
            dataset.rows,
            dataset.path.display()
        );
    }
    println!("{}", "-".repeat(60));
    println!("  Datasets:   {}", summary.datasets.len());
    println!("  Total rows: {}", summary.total_rows());
    println!("  Metadata:   {}", summary.metadata_path.display());
    println!("{}", "=".repeat(60));

    Ok(())
}
