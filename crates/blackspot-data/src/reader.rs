//! CSV record reader with full input validation and a fallback path.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::domain::RecordDataset;
use crate::DataError;

/// Reads raw accident records from a CSV file.
///
/// Expected CSV format:
/// - Header row required; every column is a named categorical attribute,
///   one of which is the target (severity) column.
/// - One row per record; all rows must have the same number of cells.
/// - Cells are kept as strings; no numeric parsing happens here.
///
/// An optional fallback path covers the case where the primary location is
/// not mounted; it is tried only when the primary cannot be opened.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DataError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`DataError::FileNotFoundWithFallback`] | Primary and fallback both unreadable |
/// | [`DataError::CsvParse`] | Malformed CSV record |
/// | [`DataError::EmptyDataset`] | Zero data rows after header |
/// | [`DataError::TooFewColumns`] | Fewer than two header columns |
/// | [`DataError::DuplicateColumn`] | Same column name appears twice |
/// | [`DataError::InconsistentRowLength`] | Row width differs from header |
pub struct RecordReader {
    path: PathBuf,
    fallback: Option<PathBuf>,
}

impl RecordReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            fallback: None,
        }
    }

    /// Set a fallback path, tried when the primary path cannot be opened.
    #[must_use]
    pub fn with_fallback(mut self, fallback: &Path) -> Self {
        self.fallback = Some(fallback.to_path_buf());
        self
    }

    /// Open the primary path, falling back if configured.
    ///
    /// Returns the opened file and the path it came from.
    fn open(&self) -> Result<(File, PathBuf), DataError> {
        match File::open(&self.path) {
            Ok(file) => Ok((file, self.path.clone())),
            Err(primary_err) => match &self.fallback {
                None => Err(DataError::FileNotFound {
                    path: self.path.clone(),
                    source: primary_err,
                }),
                Some(fallback) => {
                    warn!(
                        primary = %self.path.display(),
                        fallback = %fallback.display(),
                        "primary path unreadable, trying fallback"
                    );
                    match File::open(fallback) {
                        Ok(file) => Ok((file, fallback.clone())),
                        Err(fallback_err) => Err(DataError::FileNotFoundWithFallback {
                            path: self.path.clone(),
                            fallback: fallback.clone(),
                            source: fallback_err,
                        }),
                    }
                }
            },
        }
    }

    /// Read and validate the CSV file, returning a [`RecordDataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<RecordDataset, DataError> {
        let (file, path) = self.open()?;

        // flexible(true) lets rows with varying cell counts through the
        // parser so our own InconsistentRowLength check fires instead of a
        // low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| DataError::CsvParse {
            path: path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        })?;
        let expected_cols = header.len();
        debug!(expected_cols, "read CSV header");

        if expected_cols < 2 {
            return Err(DataError::TooFewColumns { path });
        }

        let columns: Vec<String> = header.iter().map(String::from).collect();
        let mut seen: HashSet<String> = HashSet::new();
        for column in &columns {
            if !seen.insert(column.clone()) {
                return Err(DataError::DuplicateColumn {
                    path,
                    column: column.clone(),
                });
            }
        }

        let mut rows = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| DataError::CsvParse {
                path: path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;

            if record.len() != expected_cols {
                return Err(DataError::InconsistentRowLength {
                    path,
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            rows.push(record.iter().map(String::from).collect());
        }

        if rows.is_empty() {
            return Err(DataError::EmptyDataset { path });
        }

        info!(
            n_rows = rows.len(),
            n_columns = columns.len(),
            path = %path.display(),
            "record dataset loaded"
        );

        Ok(RecordDataset::new(columns, rows))
    }
}
