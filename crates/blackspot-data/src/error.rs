//! Error types for dataset loading, encoding, and prediction.

use std::path::PathBuf;

use blackspot_rf::RfError;

/// Errors from file I/O, CSV parsing, categorical encoding, and the
/// prediction service.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("input file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when neither the primary path nor the fallback is readable.
    #[error("input file not found: {path} (fallback {fallback} also tried)")]
    FileNotFoundWithFallback {
        /// Primary path that was attempted.
        path: PathBuf,
        /// Fallback path that was attempted next.
        fallback: PathBuf,
        /// I/O error from the fallback attempt.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when the header has fewer than two columns (features + target).
    #[error("need at least one feature column and a target column in {path}")]
    TooFewColumns {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when the same column name appears twice in the header.
    #[error("duplicate column \"{column}\" in {path}")]
    DuplicateColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// The duplicated column name.
        column: String,
    },

    /// Returned when a data row has a different number of cells than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} cells, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of cells (from header).
        expected: usize,
        /// Actual number of cells in this row.
        got: usize,
    },

    /// Returned when a configured column is absent from the dataset.
    #[error("column \"{column}\" not found in dataset")]
    MissingColumn {
        /// The absent column name.
        column: String,
    },

    /// Returned when a prediction input omits a required feature column.
    #[error("prediction input is missing feature \"{column}\"")]
    MissingFeature {
        /// The absent feature column name.
        column: String,
    },

    /// Returned when a prediction input names a column outside the schema.
    #[error("prediction input has unexpected feature \"{column}\"")]
    UnexpectedFeature {
        /// The unknown column name.
        column: String,
    },

    /// Returned when a value was not part of a column's fit-time vocabulary.
    #[error("value \"{value}\" was not seen in column \"{column}\" during fitting")]
    UnseenCategory {
        /// The column whose encoder rejected the value.
        column: String,
        /// The unseen raw value.
        value: String,
    },

    /// Returned when an integer code is outside a column's vocabulary range.
    #[error("code {code} is out of range for column \"{column}\" ({n_classes} classes)")]
    UnknownCode {
        /// The column whose encoder rejected the code.
        column: String,
        /// The out-of-range code.
        code: usize,
        /// Size of the column's vocabulary.
        n_classes: usize,
    },

    /// Returned when the model and encoders disagree on the feature count.
    #[error("model was trained on {model_features} features but encoders describe {encoder_features}")]
    SchemaMismatch {
        /// Feature count recorded in the model.
        model_features: usize,
        /// Feature count described by the encoder set.
        encoder_features: usize,
    },

    /// Returned when encoder serialization fails.
    #[error("failed to serialize encoders")]
    SerializeEncoders {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when encoder deserialization fails.
    #[error("failed to deserialize encoders from {path}")]
    DeserializeEncoders {
        /// Path to the encoders file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the encoders file fails.
    #[error("failed to write encoders to {path}")]
    WriteEncoders {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the encoders file fails.
    #[error("failed to read encoders from {path}")]
    ReadEncoders {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading encoders with an incompatible format version.
    #[error("incompatible encoders version in {path}: expected {expected}, found {found}")]
    IncompatibleEncodersVersion {
        /// The encoders format version this build expects.
        expected: u32,
        /// The encoders format version found in the file.
        found: u32,
        /// Path to the encoders file with the incompatible version.
        path: PathBuf,
    },

    /// An error from the underlying Random Forest.
    #[error(transparent)]
    Forest(#[from] RfError),
}
