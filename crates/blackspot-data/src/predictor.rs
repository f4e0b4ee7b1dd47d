//! Prediction service over a trained forest and its fitted encoders.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, instrument};

use blackspot_rf::RandomForest;

use crate::encoder::EncoderSet;
use crate::DataError;

/// Predicts accident severity from raw categorical inputs.
///
/// Bundles a trained [`RandomForest`] with the [`EncoderSet`] fitted
/// alongside it, so callers pass raw column values and get back a severity
/// class name. The two artifacts are cross-checked at construction; mixing
/// a model with encoders from a different run fails immediately rather
/// than producing nonsense predictions.
#[derive(Debug)]
pub struct SeverityPredictor {
    forest: RandomForest,
    encoders: EncoderSet,
}

impl SeverityPredictor {
    /// Build a predictor from a trained forest and its encoders.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::SchemaMismatch`] when the model's feature count
    /// disagrees with the encoder set.
    pub fn new(forest: RandomForest, encoders: EncoderSet) -> Result<Self, DataError> {
        if forest.n_features() != encoders.features().len() {
            return Err(DataError::SchemaMismatch {
                model_features: forest.n_features(),
                encoder_features: encoders.features().len(),
            });
        }
        Ok(Self { forest, encoders })
    }

    /// Load both artifacts from disk and build a predictor.
    ///
    /// # Errors
    ///
    /// Propagates model and encoder load errors, plus
    /// [`DataError::SchemaMismatch`] when the artifacts disagree.
    #[instrument(skip(model_path, encoders_path), fields(
        model = %model_path.as_ref().display(),
        encoders = %encoders_path.as_ref().display()
    ))]
    pub fn from_files(
        model_path: impl AsRef<Path>,
        encoders_path: impl AsRef<Path>,
    ) -> Result<Self, DataError> {
        let forest = RandomForest::load(model_path)?;
        let encoders = EncoderSet::load(encoders_path)?;
        let predictor = Self::new(forest, encoders)?;
        info!(
            n_trees = predictor.forest.n_trees(),
            n_features = predictor.forest.n_features(),
            "predictor ready"
        );
        Ok(predictor)
    }

    /// Predict the severity class name for one raw input.
    ///
    /// The input maps feature column names to raw category values. It is
    /// validated against the schema and encoded, the forest votes, and the
    /// winning code is decoded back to a class name.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::MissingFeature`] | A schema feature is absent from the input |
    /// | [`DataError::UnexpectedFeature`] | The input names a column outside the schema |
    /// | [`DataError::UnseenCategory`] | A value is outside its column's vocabulary |
    pub fn predict(&self, input: &HashMap<String, String>) -> Result<String, DataError> {
        let coded = self.encoders.encode_input(input)?;
        let class_code = self.forest.predict(&coded)?;
        let class_name = self.encoders.target().decode(class_code)?;
        debug!(class_code, class_name, "severity predicted");
        Ok(class_name.to_string())
    }

    /// Predict and also return the class probability distribution, paired
    /// with class names in target vocabulary order.
    ///
    /// # Errors
    ///
    /// Same as [`predict`](Self::predict).
    pub fn predict_with_proba(
        &self,
        input: &HashMap<String, String>,
    ) -> Result<(String, Vec<(String, f64)>), DataError> {
        let coded = self.encoders.encode_input(input)?;
        let dist = self.forest.predict_proba(&coded)?;
        let class_name = self.encoders.target().decode(dist.predicted_class())?;
        let proba = self
            .encoders
            .target()
            .classes()
            .iter()
            .zip(dist.as_slice())
            .map(|(name, p)| (name.clone(), *p))
            .collect();
        Ok((class_name.to_string(), proba))
    }

    /// Return the trained forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Return the fitted encoders.
    #[must_use]
    pub fn encoders(&self) -> &EncoderSet {
        &self.encoders
    }
}
