//! Per-column label encoding between category strings and integer codes.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::domain::{RecordDataset, Schema};
use crate::DataError;

/// Current binary format version for the encoders artifact.
const ENCODERS_FORMAT_VERSION: u32 = 1;

/// A bijection between one column's category strings and codes `[0, k)`.
///
/// The vocabulary is the set of distinct values observed at fit time,
/// sorted lexicographically so the mapping is deterministic. A value
/// outside the vocabulary cannot be encoded and fails loudly; there is no
/// unknown-category bucket.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ColumnEncoder {
    column: String,
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

impl ColumnEncoder {
    /// Fit an encoder over the distinct values of one column.
    pub fn fit<'a>(column: &str, values: impl Iterator<Item = &'a str>) -> Self {
        let distinct: BTreeSet<&str> = values.collect();
        let classes: Vec<String> = distinct.into_iter().map(String::from).collect();
        let index = classes
            .iter()
            .enumerate()
            .map(|(i, v)| (v.clone(), i))
            .collect();
        Self {
            column: column.to_string(),
            classes,
            index,
        }
    }

    /// Return the column name this encoder was fitted on.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Return the fit-time vocabulary, in code order.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Return the vocabulary size.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Encode a raw value to its integer code.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnseenCategory`] for any value outside the
    /// fit-time vocabulary.
    pub fn encode(&self, value: &str) -> Result<usize, DataError> {
        self.index
            .get(value)
            .copied()
            .ok_or_else(|| DataError::UnseenCategory {
                column: self.column.clone(),
                value: value.to_string(),
            })
    }

    /// Decode an integer code back to its category string.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnknownCode`] when `code >= n_classes`.
    pub fn decode(&self, code: usize) -> Result<&str, DataError> {
        self.classes
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| DataError::UnknownCode {
                column: self.column.clone(),
                code,
                n_classes: self.classes.len(),
            })
    }
}

/// Versioned envelope for the serialized encoder set.
#[derive(serde::Serialize, serde::Deserialize)]
struct EncodersEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Number of feature encoders.
    n_features: usize,
    /// The serialized encoder set.
    encoders: EncoderSet,
}

/// One encoder per feature column plus the target column.
///
/// Fitted once over the full dataset and retained for the life of the run:
/// forward lookups encode training data and prediction inputs, inverse
/// lookups turn predicted codes back into severity class names.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EncoderSet {
    schema: Schema,
    features: Vec<ColumnEncoder>,
    target: ColumnEncoder,
}

impl EncoderSet {
    /// Fit an encoder for every schema column over the full dataset.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingColumn`] when a schema column is absent
    /// from the dataset.
    #[instrument(skip_all, fields(n_features = schema.n_features()))]
    pub fn fit(dataset: &RecordDataset, schema: &Schema) -> Result<Self, DataError> {
        let mut features = Vec::with_capacity(schema.n_features());
        for column in schema.feature_columns() {
            let encoder = ColumnEncoder::fit(column, dataset.column_values(column)?);
            debug!(column = %column, n_classes = encoder.n_classes(), "fitted column encoder");
            features.push(encoder);
        }
        let target = ColumnEncoder::fit(
            schema.target_column(),
            dataset.column_values(schema.target_column())?,
        );

        info!(
            n_features = features.len(),
            n_target_classes = target.n_classes(),
            "encoder set fitted"
        );

        Ok(Self {
            schema: schema.clone(),
            features,
            target,
        })
    }

    /// Return the schema the encoders were fitted against.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Return the per-feature encoders, in schema order.
    #[must_use]
    pub fn features(&self) -> &[ColumnEncoder] {
        &self.features
    }

    /// Return the target (severity) encoder.
    #[must_use]
    pub fn target(&self) -> &ColumnEncoder {
        &self.target
    }

    /// Return the feature column names, in schema order.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|e| e.column().to_string()).collect()
    }

    /// Encode the full dataset into an integer-coded feature matrix and
    /// label vector, both in dataset row order.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingColumn`] when a schema column is absent,
    /// or [`DataError::UnseenCategory`] when a cell holds a value outside
    /// its column's vocabulary (only possible when encoding a dataset other
    /// than the one fitted on).
    #[instrument(skip_all, fields(n_rows = dataset.n_rows()))]
    pub fn encode_dataset(
        &self,
        dataset: &RecordDataset,
    ) -> Result<(Vec<Vec<f64>>, Vec<usize>), DataError> {
        let mut feature_indices = Vec::with_capacity(self.features.len());
        for encoder in &self.features {
            feature_indices.push(dataset.column_index(encoder.column())?);
        }
        let target_index = dataset.column_index(self.target.column())?;

        let mut matrix = Vec::with_capacity(dataset.n_rows());
        let mut labels = Vec::with_capacity(dataset.n_rows());
        for row in dataset.rows() {
            let mut coded = Vec::with_capacity(self.features.len());
            for (encoder, &col_idx) in self.features.iter().zip(&feature_indices) {
                coded.push(encoder.encode(&row[col_idx])? as f64);
            }
            matrix.push(coded);
            labels.push(self.target.encode(&row[target_index])?);
        }

        debug!(
            n_rows = matrix.len(),
            n_features = self.features.len(),
            "dataset encoded"
        );

        Ok((matrix, labels))
    }

    /// Encode a single prediction input into a feature vector, in schema
    /// order.
    ///
    /// Validation happens before any encoding: every schema feature must be
    /// present and no extra keys are accepted.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::MissingFeature`] | A schema feature is absent from the input |
    /// | [`DataError::UnexpectedFeature`] | The input names a column outside the schema |
    /// | [`DataError::UnseenCategory`] | A value is outside its column's vocabulary |
    pub fn encode_input(
        &self,
        input: &HashMap<String, String>,
    ) -> Result<Vec<f64>, DataError> {
        for encoder in &self.features {
            if !input.contains_key(encoder.column()) {
                return Err(DataError::MissingFeature {
                    column: encoder.column().to_string(),
                });
            }
        }
        for key in input.keys() {
            if !self.features.iter().any(|e| e.column() == key) {
                return Err(DataError::UnexpectedFeature {
                    column: key.clone(),
                });
            }
        }

        self.features
            .iter()
            .map(|encoder| Ok(encoder.encode(&input[encoder.column()])? as f64))
            .collect()
    }

    /// Save the encoder set to a binary file.
    ///
    /// Uses the same versioned bincode envelope scheme as the model
    /// artifact.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::SerializeEncoders`] | bincode encoding failed |
    /// | [`DataError::WriteEncoders`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DataError> {
        let path = path.as_ref();

        let envelope = EncodersEnvelope {
            format_version: ENCODERS_FORMAT_VERSION,
            n_features: self.features.len(),
            encoders: self.clone(),
        };

        let bytes = bincode::serialize(&envelope)
            .map_err(|e| DataError::SerializeEncoders { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| DataError::WriteEncoders {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_features = self.features.len(),
            "encoders saved"
        );

        Ok(())
    }

    /// Load an encoder set from a binary file.
    ///
    /// Checks the format version and returns an error on mismatch.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::ReadEncoders`] | file read failed |
    /// | [`DataError::DeserializeEncoders`] | bincode decoding failed |
    /// | [`DataError::IncompatibleEncodersVersion`] | format version mismatch |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| DataError::ReadEncoders {
            path: path.to_path_buf(),
            source: e,
        })?;

        let envelope: EncodersEnvelope =
            bincode::deserialize(&bytes).map_err(|e| DataError::DeserializeEncoders {
                path: path.to_path_buf(),
                source: e,
            })?;

        if envelope.format_version != ENCODERS_FORMAT_VERSION {
            return Err(DataError::IncompatibleEncodersVersion {
                expected: ENCODERS_FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        debug!(n_features = envelope.n_features, "encoders loaded");

        Ok(envelope.encoders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecordDataset;
    use tempfile::TempDir;

    fn make_dataset() -> RecordDataset {
        RecordDataset::new(
            vec![
                "Weather_conditions".to_string(),
                "Type_of_collision".to_string(),
                "Accident_severity".to_string(),
            ],
            vec![
                vec!["Normal".into(), "Rear-end".into(), "Slight Injury".into()],
                vec!["Raining".into(), "Rollover".into(), "Serious Injury".into()],
                vec!["Normal".into(), "Rear-end".into(), "Slight Injury".into()],
                vec!["Windy".into(), "Side swipe".into(), "Fatal injury".into()],
            ],
        )
    }

    fn fit_set() -> EncoderSet {
        let ds = make_dataset();
        let schema = Schema::from_dataset(&ds, "Accident_severity").unwrap();
        EncoderSet::fit(&ds, &schema).unwrap()
    }

    #[test]
    fn round_trip_all_vocabulary() {
        let encoders = fit_set();
        for encoder in encoders.features().iter().chain([encoders.target()]) {
            for value in encoder.classes() {
                let code = encoder.encode(value).unwrap();
                assert_eq!(encoder.decode(code).unwrap(), value);
            }
        }
    }

    #[test]
    fn vocabulary_sorted_and_dense() {
        let encoders = fit_set();
        let target = encoders.target();
        assert_eq!(
            target.classes(),
            &["Fatal injury", "Serious Injury", "Slight Injury"]
        );
        for (code, value) in target.classes().iter().enumerate() {
            assert_eq!(target.encode(value).unwrap(), code);
        }
    }

    #[test]
    fn unseen_value_error_names_column_and_value() {
        let encoders = fit_set();
        let err = encoders.features()[0].encode("Foggy").unwrap_err();
        match err {
            DataError::UnseenCategory { column, value } => {
                assert_eq!(column, "Weather_conditions");
                assert_eq!(value, "Foggy");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn out_of_range_code_error() {
        let encoders = fit_set();
        let err = encoders.target().decode(99).unwrap_err();
        assert!(matches!(err, DataError::UnknownCode { code: 99, .. }));
    }

    #[test]
    fn encode_dataset_shape_and_codes() {
        let ds = make_dataset();
        let schema = Schema::from_dataset(&ds, "Accident_severity").unwrap();
        let encoders = EncoderSet::fit(&ds, &schema).unwrap();
        let (matrix, labels) = encoders.encode_dataset(&ds).unwrap();

        assert_eq!(matrix.len(), 4);
        assert_eq!(matrix[0].len(), 2);
        assert_eq!(labels.len(), 4);
        // "Slight Injury" sorts after "Fatal injury" and "Serious Injury".
        assert_eq!(labels[0], 2);
        assert_eq!(labels[3], 0);
    }

    #[test]
    fn encode_input_missing_feature_error() {
        let encoders = fit_set();
        let input: HashMap<String, String> =
            [("Weather_conditions".to_string(), "Normal".to_string())].into();
        let err = encoders.encode_input(&input).unwrap_err();
        assert!(
            matches!(err, DataError::MissingFeature { column } if column == "Type_of_collision")
        );
    }

    #[test]
    fn encode_input_unexpected_feature_error() {
        let encoders = fit_set();
        let input: HashMap<String, String> = [
            ("Weather_conditions".to_string(), "Normal".to_string()),
            ("Type_of_collision".to_string(), "Rear-end".to_string()),
            ("Number_of_vehicles".to_string(), "2".to_string()),
        ]
        .into();
        let err = encoders.encode_input(&input).unwrap_err();
        assert!(
            matches!(err, DataError::UnexpectedFeature { column } if column == "Number_of_vehicles")
        );
    }

    #[test]
    fn encode_input_in_schema_order() {
        let encoders = fit_set();
        let input: HashMap<String, String> = [
            ("Type_of_collision".to_string(), "Rollover".to_string()),
            ("Weather_conditions".to_string(), "Raining".to_string()),
        ]
        .into();
        let coded = encoders.encode_input(&input).unwrap();
        assert_eq!(coded.len(), 2);
        // Schema order is dataset order: weather first, collision second.
        assert_eq!(coded[0], encoders.features()[0].encode("Raining").unwrap() as f64);
        assert_eq!(coded[1], encoders.features()[1].encode("Rollover").unwrap() as f64);
    }

    #[test]
    fn save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("encoders.bin");

        let encoders = fit_set();
        encoders.save(&path).unwrap();
        let loaded = EncoderSet::load(&path).unwrap();

        assert_eq!(loaded.schema(), encoders.schema());
        assert_eq!(loaded.target().classes(), encoders.target().classes());
        for (a, b) in loaded.features().iter().zip(encoders.features()) {
            assert_eq!(a.column(), b.column());
            assert_eq!(a.classes(), b.classes());
        }
    }

    #[test]
    fn load_corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, b"definitely not bincode").unwrap();
        let err = EncoderSet::load(&path).unwrap_err();
        assert!(matches!(err, DataError::DeserializeEncoders { .. }));
    }
}
