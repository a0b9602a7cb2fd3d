//! Display command - print the metadata store

use anyhow::{Context, Result};
use bitcoin_data::display::display_metadata;
use bitcoin_data::Config;
use std::io::Write;
use tracing::debug;

pub fn run(config: Config) -> Result<()> {
    let path = config.metadata_path();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let count = display_metadata(&path, &mut out)
        .with_context(|| format!("Failed to display {}", path.display()))?;
    out.flush()?;

    debug!("Displayed {} metadata entries", count);
    Ok(())
}
