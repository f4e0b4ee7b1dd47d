//! Stratified train/test holdout split.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, instrument};

use crate::error::RfError;

/// Configuration for a class-stratified train/test split.
///
/// Construct via [`HoldoutSplit::new`], then chain `with_seed` if desired.
#[derive(Debug, Clone)]
pub struct HoldoutSplit {
    test_fraction: f64,
    seed: u64,
}

/// The two partitions produced by a holdout split.
#[derive(Debug)]
pub struct TrainTestSplit {
    /// Training feature rows.
    pub train_features: Vec<Vec<f64>>,
    /// Training labels.
    pub train_labels: Vec<usize>,
    /// Held-out feature rows.
    pub test_features: Vec<Vec<f64>>,
    /// Held-out labels.
    pub test_labels: Vec<usize>,
}

impl TrainTestSplit {
    /// Return the number of training samples.
    #[must_use]
    pub fn n_train(&self) -> usize {
        self.train_labels.len()
    }

    /// Return the number of held-out samples.
    #[must_use]
    pub fn n_test(&self) -> usize {
        self.test_labels.len()
    }
}

impl HoldoutSplit {
    /// Create a new holdout config with the given test fraction.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTestFraction`] if `test_fraction` is not
    /// in (0.0, 1.0).
    pub fn new(test_fraction: f64) -> Result<Self, RfError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(RfError::InvalidTestFraction {
                fraction: test_fraction,
            });
        }
        Ok(Self {
            test_fraction,
            seed: 42,
        })
    }

    /// Set the random seed for shuffling within each class.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Partition the dataset into stratified train/test subsets.
    ///
    /// Indices are grouped by class, shuffled, and a proportional slice of
    /// each class (at least one sample) is held out, so both partitions
    /// preserve the full dataset's class proportions.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | Zero samples |
    /// | [`RfError::LabelCountMismatch`] | Labels and rows disagree in length |
    /// | [`RfError::TooFewClassSamples`] | A class has fewer than 2 samples |
    #[instrument(skip_all, fields(n_samples = features.len(), test_fraction = self.test_fraction))]
    pub fn split(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<TrainTestSplit, RfError> {
        if features.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        if labels.len() != features.len() {
            return Err(RfError::LabelCountMismatch {
                n_samples: features.len(),
                n_labels: labels.len(),
            });
        }

        let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;
        let mut class_indices: Vec<Vec<usize>> = vec![vec![]; n_classes];
        for (i, &label) in labels.iter().enumerate() {
            class_indices[label].push(i);
        }

        // Every present class must land in both partitions.
        for (class, indices) in class_indices.iter().enumerate() {
            if !indices.is_empty() && indices.len() < 2 {
                return Err(RfError::TooFewClassSamples {
                    class,
                    count: indices.len(),
                });
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut is_test = vec![false; labels.len()];

        for indices in &mut class_indices {
            if indices.is_empty() {
                continue;
            }
            indices.shuffle(&mut rng);
            // At least one test sample, and at least one left for training.
            let n_test = ((indices.len() as f64 * self.test_fraction).round() as usize)
                .max(1)
                .min(indices.len() - 1);
            for &idx in &indices[..n_test] {
                is_test[idx] = true;
            }
        }

        let mut split = TrainTestSplit {
            train_features: Vec::new(),
            train_labels: Vec::new(),
            test_features: Vec::new(),
            test_labels: Vec::new(),
        };
        for (i, row) in features.iter().enumerate() {
            if is_test[i] {
                split.test_features.push(row.clone());
                split.test_labels.push(labels[i]);
            } else {
                split.train_features.push(row.clone());
                split.train_labels.push(labels[i]);
            }
        }

        info!(
            n_train = split.n_train(),
            n_test = split.n_test(),
            "stratified holdout split complete"
        );

        Ok(split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 100 samples: 60 of class 0, 30 of class 1, 10 of class 2.
    fn make_imbalanced_data() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for (class, count) in [(0usize, 60usize), (1, 30), (2, 10)] {
            for i in 0..count {
                features.push(vec![class as f64, (i % 4) as f64]);
                labels.push(class);
            }
        }
        (features, labels)
    }

    fn class_fraction(labels: &[usize], class: usize) -> f64 {
        labels.iter().filter(|&&l| l == class).count() as f64 / labels.len() as f64
    }

    #[test]
    fn eighty_twenty_partition_sizes() {
        let (features, labels) = make_imbalanced_data();
        let split = HoldoutSplit::new(0.2)
            .unwrap()
            .with_seed(42)
            .split(&features, &labels)
            .unwrap();
        assert_eq!(split.n_train() + split.n_test(), 100);
        assert_eq!(split.n_test(), 20);
    }

    #[test]
    fn class_proportions_preserved() {
        let (features, labels) = make_imbalanced_data();
        let split = HoldoutSplit::new(0.2)
            .unwrap()
            .with_seed(42)
            .split(&features, &labels)
            .unwrap();

        for class in 0..3 {
            let full = class_fraction(&labels, class);
            let train = class_fraction(&split.train_labels, class);
            let test = class_fraction(&split.test_labels, class);
            assert!(
                (train - full).abs() < 0.05,
                "class {class}: train fraction {train} vs full {full}"
            );
            assert!(
                (test - full).abs() < 0.05,
                "class {class}: test fraction {test} vs full {full}"
            );
        }
    }

    #[test]
    fn minority_class_in_both_partitions() {
        let (features, labels) = make_imbalanced_data();
        let split = HoldoutSplit::new(0.2)
            .unwrap()
            .split(&features, &labels)
            .unwrap();
        assert!(split.train_labels.contains(&2));
        assert!(split.test_labels.contains(&2));
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (features, labels) = make_imbalanced_data();
        let split1 = HoldoutSplit::new(0.2)
            .unwrap()
            .with_seed(7)
            .split(&features, &labels)
            .unwrap();
        let split2 = HoldoutSplit::new(0.2)
            .unwrap()
            .with_seed(7)
            .split(&features, &labels)
            .unwrap();
        assert_eq!(split1.test_labels, split2.test_labels);
        assert_eq!(split1.test_features, split2.test_features);
    }

    #[test]
    fn invalid_fraction_error() {
        assert!(HoldoutSplit::new(0.0).is_err());
        assert!(HoldoutSplit::new(1.0).is_err());
        assert!(HoldoutSplit::new(-0.2).is_err());
    }

    #[test]
    fn singleton_class_error() {
        let features = vec![vec![0.0], vec![1.0], vec![2.0]];
        let labels = vec![0, 0, 1];
        let err = HoldoutSplit::new(0.2)
            .unwrap()
            .split(&features, &labels)
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::TooFewClassSamples { class: 1, count: 1 }
        ));
    }

    #[test]
    fn empty_dataset_error() {
        let err = HoldoutSplit::new(0.2).unwrap().split(&[], &[]).unwrap_err();
        assert!(matches!(err, RfError::EmptyDataset));
    }
}
