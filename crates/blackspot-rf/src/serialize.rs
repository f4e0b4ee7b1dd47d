//! Model serialization and deserialization via bincode.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::RfError;
use crate::forest::RandomForest;

/// Current binary format version for the model artifact.
const MODEL_FORMAT_VERSION: u32 = 1;

/// Versioned envelope for the serialized model.
///
/// Persisting explicit parameters under a version tag keeps the artifact
/// decoupled from any one library's in-memory object layout.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Number of trees in the forest.
    n_trees: usize,
    /// Number of features the model was trained on.
    n_features: usize,
    /// Number of classes.
    n_classes: usize,
    /// Feature column names.
    feature_names: Vec<String>,
    /// The serialized forest.
    forest: RandomForest,
}

impl RandomForest {
    /// Save the model to a binary file.
    ///
    /// Uses bincode encoding wrapped in a versioned envelope for
    /// forward-compatibility checking.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::SerializeModel`] | bincode encoding failed |
    /// | [`RfError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RfError> {
        let path = path.as_ref();

        let envelope = ModelEnvelope {
            format_version: MODEL_FORMAT_VERSION,
            n_trees: self.trees.len(),
            n_features: self.n_features,
            n_classes: self.n_classes,
            feature_names: self.feature_names.clone(),
            forest: self.clone(),
        };

        let bytes =
            bincode::serialize(&envelope).map_err(|e| RfError::SerializeModel { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| RfError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_trees = self.trees.len(),
            "model saved"
        );

        Ok(())
    }

    /// Load a model from a binary file.
    ///
    /// Checks the format version and returns an error on mismatch.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::ReadModel`] | file read failed |
    /// | [`RfError::DeserializeModel`] | bincode decoding failed |
    /// | [`RfError::IncompatibleModelVersion`] | format version mismatch |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RfError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| RfError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        let envelope: ModelEnvelope =
            bincode::deserialize(&bytes).map_err(|e| RfError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            })?;

        if envelope.format_version != MODEL_FORMAT_VERSION {
            return Err(RfError::IncompatibleModelVersion {
                expected: MODEL_FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        debug!(
            n_trees = envelope.n_trees,
            n_features = envelope.n_features,
            n_classes = envelope.n_classes,
            "model loaded"
        );

        Ok(envelope.forest)
    }
}
