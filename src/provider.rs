//! Dataset provider trait and the Nasdaq Data Link client
//!
//! The fetch stage only sees [`DataProvider`], so tests can run it against an
//! in-memory provider. Provider failures surface as [`EtlError::Retrieval`];
//! there is no retry policy.

use chrono::NaiveDate;
use serde::Deserialize;
use std::cell::Cell;
use std::thread::sleep;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::Config;
use crate::error::{EtlError, EtlResult};
use crate::types::{DatasetCode, DatasetMetadata, Observation, TimeSeries, DATE_FORMAT};

/// Source of dataset series and descriptive metadata
pub trait DataProvider {
    /// Human-readable name of this provider
    fn name(&self) -> &str;

    /// Fetch the full time series for a dataset, oldest date first
    fn fetch_series(&self, code: &DatasetCode) -> EtlResult<TimeSeries>;

    /// Fetch display name, description and available date range for a dataset
    fn fetch_metadata(&self, code: &DatasetCode) -> EtlResult<DatasetMetadata>;
}

// =============================================================================
// Nasdaq Data Link response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct DataResponse {
    dataset_data: DatasetData,
}

#[derive(Debug, Deserialize)]
struct DatasetData {
    #[serde(default)]
    column_names: Vec<String>,
    data: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    dataset: DatasetInfo,
}

#[derive(Debug, Deserialize)]
struct DatasetInfo {
    name: Option<String>,
    description: Option<String>,
    newest_available_date: NaiveDate,
    oldest_available_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    quandl_error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

// =============================================================================
// Client
// =============================================================================

/// Blocking client for the Nasdaq Data Link time-series API
pub struct NasdaqDataLinkClient {
    client: reqwest::blocking::Client,
    base_url: String,
    database: String,
    api_key: String,
    request_delay: Duration,
    last_request: Cell<Option<Instant>>,
}

impl NasdaqDataLinkClient {
    /// Build a client from configuration and an already-resolved API key
    pub fn new(config: &Config, api_key: impl Into<String>) -> EtlResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EtlError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            database: config.database.clone(),
            api_key: api_key.into(),
            request_delay: config.request_delay(),
            last_request: Cell::new(None),
        })
    }

    fn dataset_url(&self, code: &DatasetCode, endpoint: &str) -> String {
        format!(
            "{}/datasets/{}/{}/{}.json",
            self.base_url, self.database, code, endpoint
        )
    }

    /// Keep at least `request_delay` between consecutive requests
    fn throttle(&self) {
        if let Some(last) = self.last_request.get() {
            let elapsed = last.elapsed();
            if elapsed < self.request_delay {
                sleep(self.request_delay - elapsed);
            }
        }
        self.last_request.set(Some(Instant::now()));
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        code: &DatasetCode,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> EtlResult<T> {
        self.throttle();

        let url = self.dataset_url(code, endpoint);
        debug!("GET {} params={:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .map_err(|e| EtlError::retrieval(code, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EtlError::retrieval(code, describe_error(status, &body)));
        }

        response
            .json()
            .map_err(|e| EtlError::retrieval(code, format!("unexpected response format: {}", e)))
    }
}

impl DataProvider for NasdaqDataLinkClient {
    fn name(&self) -> &str {
        "Nasdaq Data Link"
    }

    fn fetch_series(&self, code: &DatasetCode) -> EtlResult<TimeSeries> {
        let response: DataResponse = self.get_json(code, "data", &[("order", "asc")])?;
        series_from_response(code, response.dataset_data)
    }

    fn fetch_metadata(&self, code: &DatasetCode) -> EtlResult<DatasetMetadata> {
        let response: MetadataResponse = self.get_json(code, "metadata", &[])?;
        Ok(metadata_from_response(code, response.dataset))
    }
}

fn describe_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => format!(
            "status {}: {} ({})",
            status, err.quandl_error.message, err.quandl_error.code
        ),
        Err(_) => format!("status {}", status),
    }
}

fn series_from_response(code: &DatasetCode, data: DatasetData) -> EtlResult<TimeSeries> {
    let value_idx = data
        .column_names
        .iter()
        .position(|c| c == "Value")
        .unwrap_or(1);

    let mut observations = Vec::with_capacity(data.data.len());
    for (i, row) in data.data.iter().enumerate() {
        let date = row
            .first()
            .and_then(|v| v.as_str())
            .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
            .ok_or_else(|| EtlError::retrieval(code, format!("row {} has no valid date", i)))?;
        let value = row.get(value_idx).map(json_to_cell).unwrap_or_default();
        observations.push(Observation::new(date, value));
    }

    Ok(TimeSeries::new(code.clone(), observations))
}

fn metadata_from_response(code: &DatasetCode, info: DatasetInfo) -> DatasetMetadata {
    DatasetMetadata {
        code: code.clone(),
        name: info.name.unwrap_or_default(),
        description: info.description.unwrap_or_default(),
        newest_date: info.newest_available_date,
        oldest_date: info.oldest_available_date,
    }
}

/// Render a JSON cell as file text; `null` becomes an empty cell
fn json_to_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
