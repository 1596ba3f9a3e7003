// ============================================================
// Layer 4 — CSV Loader
// ============================================================
// Loads the labelled abalone dataset from a headered CSV file
// using the `csv` crate's serde integration.
//
// Expected header row:
//   Sex,Length,Diameter,Height,Whole weight,Shucked weight,
//   Viscera weight,Shell weight,Rings
//
// Cells that parse to NaN or ±inf ("NaN", "inf", "-inf") are
// rejected with the same line-numbered error as malformed rows.
//
// Reference: csv crate documentation (Deserializing records)

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::domain::abalone::AbaloneRecord;
use crate::domain::traits::RecordSource;

/// Loads every row of an abalone CSV file.
/// Implements the RecordSource trait from Layer 3.
pub struct CsvLoader {
    path: PathBuf,
}

impl CsvLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for CsvLoader {
    fn load_all(&self) -> Result<Vec<AbaloneRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("Cannot open training data '{}'", self.path.display()))?;

        let mut records = Vec::new();
        for (row, result) in reader.deserialize::<AbaloneRecord>().enumerate() {
            // +2: one for the header, one for 1-based line numbers
            let record = result.with_context(|| {
                format!("Malformed row at line {} of '{}'", row + 2, self.path.display())
            })?;
            if let Some((column, value)) =
                record.measurements().into_iter().find(|(_, v)| !v.is_finite())
            {
                bail!(
                    "Non-finite value {value} in column '{column}' at line {} of '{}'",
                    row + 2,
                    self.path.display()
                );
            }
            records.push(record);
        }

        tracing::info!("Loaded {} records from '{}'", records.len(), self.path.display());
        Ok(records)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::abalone::Sex;
    use std::fs;

    const HEADER: &str =
        "Sex,Length,Diameter,Height,Whole weight,Shucked weight,Viscera weight,Shell weight,Rings";

    #[test]
    fn test_loads_rows() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("abalone.csv");
        fs::write(
            &path,
            format!(
                "{HEADER}\nM,0.455,0.365,0.095,0.514,0.2245,0.101,0.15,15\n\
                 I,0.33,0.255,0.08,0.205,0.0895,0.0395,0.055,7\n"
            ),
        )
        .unwrap();

        let records = CsvLoader::new(&path).load_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sex, Sex::M);
        assert_eq!(records[0].rings, 15.0);
        assert_eq!(records[1].whole_weight, 0.205);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvLoader::new(dir.path().join("nope.csv")).load_all().unwrap_err();
        assert!(format!("{err:#}").contains("Cannot open training data"));
    }

    #[test]
    fn test_malformed_row_reports_line() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("abalone.csv");
        fs::write(
            &path,
            format!("{HEADER}\nM,0.455,0.365,0.095,0.514,0.2245,0.101,0.15,15\nX,oops,,,,,,,\n"),
        )
        .unwrap();

        let err = CsvLoader::new(&path).load_all().unwrap_err();
        assert!(format!("{err:#}").contains("line 3"));
    }

    #[test]
    fn test_non_finite_cells_are_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("abalone.csv");
        let good = "M,0.455,0.365,0.095,0.514,0.2245,0.101,0.15,15";

        for (bad, column) in [
            ("M,0.4,-inf,0.1,0.5,0.2,0.1,0.15,15", "Diameter"),
            ("F,0.4,0.3,inf,0.5,0.2,0.1,0.15,15",  "Height"),
            ("I,0.4,0.3,0.1,0.5,0.2,0.1,NaN,15",   "Shell weight"),
            ("M,0.4,0.3,0.1,0.5,0.2,0.1,0.15,NaN", "Rings"),
        ] {
            fs::write(&path, format!("{HEADER}
{good}
{bad}
")).unwrap();
            let err = CsvLoader::new(&path).load_all().unwrap_err().to_string();
            assert!(err.contains("line 3"), "{err}");
            assert!(err.contains(column), "{err}");
        }
    }
}
