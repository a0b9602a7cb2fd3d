//! Core data types shared by the fetch, display and merge stages

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Date format used by every file this crate reads or writes
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Rejected dataset identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetCodeError {
    #[error("dataset identifier is empty")]
    Empty,

    #[error("dataset identifier '{0}' may only contain ASCII letters, digits and '_'")]
    InvalidCharacter(String),
}

/// Short code naming one dataset at the provider (e.g. `HRATE` for hash rate)
///
/// Codes double as file stems and column names, so they are restricted to
/// ASCII alphanumerics and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatasetCode(String);

impl DatasetCode {
    pub fn new(code: impl Into<String>) -> Result<Self, DatasetCodeError> {
        let code = code.into();
        if code.is_empty() {
            return Err(DatasetCodeError::Empty);
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(DatasetCodeError::InvalidCharacter(code));
        }
        Ok(DatasetCode(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DatasetCode {
    type Err = DatasetCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatasetCode::new(s.trim())
    }
}

impl TryFrom<String> for DatasetCode {
    type Error = DatasetCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DatasetCode::new(value)
    }
}

impl From<DatasetCode> for String {
    fn from(code: DatasetCode) -> Self {
        code.0
    }
}

/// One row of the metadata store
///
/// Serde names match the metadata file header exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    #[serde(rename = "TableName")]
    pub code: DatasetCode,
    #[serde(rename = "FullName")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "NewestAvailableDate")]
    pub newest_date: NaiveDate,
    #[serde(rename = "OldestAvailableDate")]
    pub oldest_date: NaiveDate,
}

/// Single dated observation
///
/// The value is kept as the exact text read from the provider or file so
/// that merged output reproduces it byte for byte. An empty string is a
/// missing value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: String,
}

impl Observation {
    pub fn new(date: NaiveDate, value: impl Into<String>) -> Self {
        Observation {
            date,
            value: value.into(),
        }
    }
}

/// Time series for one dataset, in the order it was retrieved or read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeries {
    pub code: DatasetCode,
    pub observations: Vec<Observation>,
}

impl TimeSeries {
    pub fn new(code: DatasetCode, observations: Vec<Observation>) -> Self {
        TimeSeries { code, observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Dates in file order, duplicates included
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }
}

/// Wide table: one row per reference date, one column per dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<MergedColumn>,
}

/// A dataset's values reindexed onto the table's dates
///
/// `values[i]` belongs to `dates[i]` of the owning table; `None` means the
/// dataset has no observation on that date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedColumn {
    pub code: DatasetCode,
    pub values: Vec<Option<String>>,
}

impl MergedTable {
    /// Empty table whose row index is exactly `dates`
    pub fn with_index(dates: Vec<NaiveDate>) -> Self {
        MergedTable {
            dates,
            columns: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.dates.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, code: &DatasetCode) -> Option<&MergedColumn> {
        self.columns.iter().find(|c| &c.code == code)
    }
}

/// How a writer treats an existing file at the target path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Replace any existing file
    #[default]
    Overwrite,
    /// Fail if the file already exists
    CreateNew,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_code_validation() {
        assert!(DatasetCode::new("HRATE").is_ok());
        assert!(DatasetCode::new("MY_CODE2").is_ok());
        assert_eq!(DatasetCode::new(""), Err(DatasetCodeError::Empty));
        assert!(matches!(
            DatasetCode::new("../etc"),
            Err(DatasetCodeError::InvalidCharacter(_))
        ));
        assert!(DatasetCode::new("A,B").is_err());
    }

    #[test]
    fn test_dataset_code_from_str_trims() {
        let code: DatasetCode = " AVBLS ".parse().unwrap();
        assert_eq!(code.as_str(), "AVBLS");
        assert_eq!(code.to_string(), "AVBLS");
    }

    #[test]
    fn test_merged_table_lookup() {
        let d = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let code = DatasetCode::new("A").unwrap();
        let mut table = MergedTable::with_index(vec![d]);
        table.columns.push(MergedColumn {
            code: code.clone(),
            values: vec![Some("10".to_string())],
        });

        assert_eq!(table.row_count(), 1);
        assert_eq!(table.column_count(), 1);
        assert!(table.column(&code).is_some());
        assert!(table.column(&DatasetCode::new("B").unwrap()).is_none());
    }

    #[test]
    fn test_write_mode_default_is_overwrite() {
        assert_eq!(WriteMode::default(), WriteMode::Overwrite);
    }
}
