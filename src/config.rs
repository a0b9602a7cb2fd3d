//! Configuration management
//!
//! Everything has a default matching the fixed BCHAIN workflow, so a config
//! file is optional. The API key comes from an untracked key file or the
//! `NASDAQ_DATA_LINK_API_KEY` environment variable.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{EtlError, EtlResult};
use crate::types::{DatasetCode, WriteMode};

/// Environment variable that overrides the key file
pub const API_KEY_ENV: &str = "NASDAQ_DATA_LINK_API_KEY";

/// Bitcoin network metrics published under the BCHAIN database
pub const BCHAIN_DATASETS: &[&str] = &[
    "ATRCT", "AVBLS", "BLCHS", "CPTRA", "CPTRV", "DIFF", "ETRAV", "ETRVU", "HRATE", "MIREV",
    "MKPRU", "MKTCP", "NADDU", "NTRAN", "NTRAT", "NTRBL", "NTREP", "TOTBC", "TOUTV", "TRFEE",
    "TRFUS", "TRVOU",
];

/// AVBLS starts on 2009-01-02, a day before most of the other series
pub const DEFAULT_REFERENCE_DATASET: &str = "AVBLS";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding per-dataset files, metadata and merged output
    pub data_dir: PathBuf,
    /// Provider database the datasets live in
    pub database: String,
    /// Dataset identifiers, in processing order
    pub datasets: Vec<String>,
    /// Dataset whose dates become the merged table's row index
    pub reference_dataset: String,
    pub metadata_file: String,
    pub output_file: String,
    /// Untracked file holding the API key, relative to the working directory
    pub api_key_file: PathBuf,
    pub api_base_url: String,
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
    pub write_mode: WriteMode,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("data"),
            database: "BCHAIN".to_string(),
            datasets: BCHAIN_DATASETS.iter().map(|s| s.to_string()).collect(),
            reference_dataset: DEFAULT_REFERENCE_DATASET.to_string(),
            metadata_file: "metadata.csv".to_string(),
            output_file: "bitcoin.csv".to_string(),
            api_key_file: PathBuf::from(".bitcoinnasdaqapikey"),
            api_base_url: "https://data.nasdaq.com/api/v3".to_string(),
            request_delay_ms: 500,
            timeout_secs: 30,
            write_mode: WriteMode::Overwrite,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> EtlResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| EtlError::from_io(path, e))?;
        let config: Config = serde_json::from_str(&contents).map_err(|e| EtlError::Parse {
            path: path.to_path_buf(),
            line: e.line() as u64,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check identifiers are well formed and unique
    pub fn validate(&self) -> EtlResult<()> {
        if self.datasets.is_empty() {
            return Err(EtlError::Config("no datasets configured".to_string()));
        }
        if self.database.trim().is_empty() {
            return Err(EtlError::Config("database must not be empty".to_string()));
        }

        let mut seen = HashSet::new();
        for code in self.dataset_codes()? {
            if !seen.insert(code.clone()) {
                return Err(EtlError::Config(format!("duplicate dataset {}", code)));
            }
        }
        self.reference_code()?;
        Ok(())
    }

    /// Dataset identifiers in processing order
    pub fn dataset_codes(&self) -> EtlResult<Vec<DatasetCode>> {
        self.datasets
            .iter()
            .map(|s| s.parse::<DatasetCode>().map_err(EtlError::from))
            .collect()
    }

    pub fn reference_code(&self) -> EtlResult<DatasetCode> {
        Ok(self.reference_dataset.parse::<DatasetCode>()?)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join(&self.metadata_file)
    }

    pub fn output_path(&self) -> PathBuf {
        self.data_dir.join(&self.output_file)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve the API key
    ///
    /// `NASDAQ_DATA_LINK_API_KEY` wins over the key file. The key file is
    /// trimmed of surrounding whitespace.
    pub fn api_key(&self) -> EtlResult<String> {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            let key = key.trim();
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }
        read_api_key(&self.api_key_file)
    }
}

/// Read an API key from a key file
pub fn read_api_key(path: impl AsRef<Path>) -> EtlResult<String> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| EtlError::from_io(path, e))?;
    let key = contents.trim();
    if key.is_empty() {
        return Err(EtlError::Config(format!(
            "API key file {} is empty",
            path.display()
        )));
    }
    Ok(key.to_string())
}
