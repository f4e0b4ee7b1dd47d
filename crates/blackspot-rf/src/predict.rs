//! Prediction methods for the Random Forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::RfError;
use crate::forest::RandomForest;

/// Class probability distribution from a prediction.
#[derive(Debug, Clone)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    pub(crate) fn new(probs: Vec<f64>) -> Self {
        Self { probs }
    }

    /// Return the predicted class (argmax of probabilities).
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        self.probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    }

    /// Return the probability distribution as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }
}

impl RandomForest {
    /// Predict the class code for a single sample.
    ///
    /// Returns the argmax of the averaged probability distribution.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when
    /// `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        Ok(self.predict_proba(sample)?.predicted_class())
    }

    /// Return the averaged class probability distribution for a single
    /// sample, averaging leaf distributions from all trees.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when
    /// `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<ClassDistribution, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }

        let mut avg = vec![0.0f64; self.n_classes];
        for tree in &self.trees {
            let proba = tree.predict_proba(sample)?;
            for (i, p) in proba.iter().enumerate() {
                avg[i] += p;
            }
        }
        let n = self.trees.len() as f64;
        avg.iter_mut().for_each(|v| *v /= n);

        Ok(ClassDistribution::new(avg))
    }

    /// Predict class codes for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the
    /// wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{MaxFeatures, RandomForestConfig};

    fn fit_small_forest() -> crate::RandomForest {
        let features = vec![
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            vec![2.0, 0.0],
            vec![6.0, 1.0],
            vec![7.0, 0.0],
            vec![8.0, 1.0],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let names = vec!["a".to_string(), "b".to_string()];
        RandomForestConfig::new(10)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_seed(42)
            .fit(&features, &labels, &names)
            .unwrap()
            .into_forest()
    }

    #[test]
    fn proba_sums_to_one() {
        let forest = fit_small_forest();
        let dist = forest.predict_proba(&[1.0, 0.0]).unwrap();
        let sum: f64 = dist.as_slice().iter().sum();
        assert!((sum - 1.0).abs() < 1e-10);
    }

    #[test]
    fn predict_matches_proba_argmax() {
        let forest = fit_small_forest();
        for sample in [[0.5, 1.0], [7.5, 0.0]] {
            let pred = forest.predict(&sample).unwrap();
            let dist = forest.predict_proba(&sample).unwrap();
            assert_eq!(pred, dist.predicted_class());
        }
    }

    #[test]
    fn batch_matches_individual() {
        let forest = fit_small_forest();
        let samples = vec![vec![0.0, 1.0], vec![7.0, 1.0], vec![3.0, 0.0]];
        let batch = forest.predict_batch(&samples).unwrap();
        for (i, sample) in samples.iter().enumerate() {
            assert_eq!(batch[i], forest.predict(sample).unwrap());
        }
    }

    #[test]
    fn wrong_width_sample_error() {
        let forest = fit_small_forest();
        let err = forest.predict(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            crate::RfError::PredictionFeatureMismatch { expected: 2, got: 1 }
        ));
    }
}
