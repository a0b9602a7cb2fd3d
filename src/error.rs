//! Error types for the fetch, display and merge stages

use std::path::PathBuf;
use thiserror::Error;

use crate::types::DatasetCodeError;

/// Errors raised by the library
///
/// None of these are retried; callers abort the batch on the first one.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("failed to retrieve {code}: {reason}")]
    Retrieval { code: String, reason: String },

    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("metadata lists {code} but its data file {} does not exist", path.display())]
    MissingFile { code: String, path: PathBuf },

    #[error("parse error in {} (line {line}): {message}", path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("refusing to overwrite existing file {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid dataset identifier: {0}")]
    InvalidCode(#[from] DatasetCodeError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EtlError {
    pub fn retrieval(code: impl ToString, reason: impl ToString) -> Self {
        EtlError::Retrieval {
            code: code.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Map an I/O error, turning `NotFound` into [`EtlError::NotFound`]
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => EtlError::NotFound { path },
            std::io::ErrorKind::AlreadyExists => EtlError::AlreadyExists { path },
            _ => EtlError::Io { path, source },
        }
    }

    /// Map a csv error for `path`, keeping the line number when csv reports one
    pub fn from_csv(path: impl Into<PathBuf>, err: csv::Error) -> Self {
        let path = path.into();
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        match err.into_kind() {
            csv::ErrorKind::Io(source) => EtlError::from_io(path, source),
            kind => EtlError::Parse {
                path,
                line,
                message: describe_csv_error(kind),
            },
        }
    }
}

fn describe_csv_error(kind: csv::ErrorKind) -> String {
    match kind {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => format!("expected {} fields, found {}", expected_len, len),
        csv::ErrorKind::Utf8 { err, .. } => format!("invalid UTF-8: {}", err),
        csv::ErrorKind::Deserialize { err, .. } => err.to_string(),
        csv::ErrorKind::Serialize(msg) => msg,
        other => format!("{:?}", other),
    }
}

pub type EtlResult<T> = Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_from_io_maps_not_found() {
        let err = EtlError::from_io("x.csv", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, EtlError::NotFound { .. }));

        let err = EtlError::from_io("x.csv", io::Error::from(io::ErrorKind::AlreadyExists));
        assert!(matches!(err, EtlError::AlreadyExists { .. }));

        let err = EtlError::from_io("x.csv", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, EtlError::Io { .. }));
    }

    #[test]
    fn test_error_messages() {
        let err = EtlError::MissingFile {
            code: "HRATE".into(),
            path: PathBuf::from("data/HRATE.csv"),
        };
        assert_eq!(
            err.to_string(),
            "metadata lists HRATE but its data file data/HRATE.csv does not exist"
        );

        let err = EtlError::retrieval("DIFF", "status 404");
        assert_eq!(err.to_string(), "failed to retrieve DIFF: status 404");
    }
}
