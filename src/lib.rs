//! Bitcoin network metric datasets
//!
//! Downloads the BCHAIN time series from Nasdaq Data Link into one CSV per
//! dataset, records their metadata, and merges them into a single table
//! indexed by date.

pub mod config;
pub mod data;
pub mod display;
pub mod error;
pub mod fetch;
pub mod merge;
pub mod metadata;
pub mod provider;
pub mod types;

pub use config::Config;
pub use error::{EtlError, EtlResult};
pub use types::*;
