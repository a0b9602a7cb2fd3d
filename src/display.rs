//! Metadata viewer

use std::io::Write;
use std::path::Path;

use crate::error::{EtlError, EtlResult};
use crate::metadata::read_metadata;
use crate::types::DatasetMetadata;

/// Write code, full name and description for each row, each entry followed
/// by a blank line
pub fn render_metadata<W: Write>(rows: &[DatasetMetadata], out: &mut W) -> std::io::Result<()> {
    for row in rows {
        writeln!(out, "{}", row.code)?;
        writeln!(out, "{}", row.name)?;
        writeln!(out, "{}", row.description)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Read the metadata store at `path` and render it to `out` in file order
pub fn display_metadata<W: Write>(path: impl AsRef<Path>, out: &mut W) -> EtlResult<usize> {
    let path = path.as_ref();
    let rows = read_metadata(path)?;
    render_metadata(&rows, out).map_err(|e| EtlError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DatasetCode;
    use chrono::NaiveDate;

    #[test]
    fn test_render_format() {
        let d = NaiveDate::from_ymd_opt(2022, 12, 6).unwrap();
        let rows = vec![
            DatasetMetadata {
                code: DatasetCode::new("HRATE").unwrap(),
                name: "Hash Rate".into(),
                description: "Tera hashes per second".into(),
                newest_date: d,
                oldest_date: d,
            },
            DatasetMetadata {
                code: DatasetCode::new("DIFF").unwrap(),
                name: "Difficulty".into(),
                description: String::new(),
                newest_date: d,
                oldest_date: d,
            },
        ];

        let mut out = Vec::new();
        render_metadata(&rows, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "HRATE\nHash Rate\nTera hashes per second\n\nDIFF\nDifficulty\n\n\n"
        );
    }

    #[test]
    fn test_display_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        let err = display_metadata(dir.path().join("metadata.csv"), &mut out).unwrap_err();
        assert!(matches!(err, EtlError::NotFound { .. }));
        assert!(out.is_empty());
    }
}
