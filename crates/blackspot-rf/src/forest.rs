//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{MaxFeatures, RandomForestConfig};
use crate::error::RfError;
use crate::importance::aggregate_importances;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// A fitted Random Forest ensemble.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) feature_names: Vec<String>,
}

/// Resolve `MaxFeatures` to a concrete count.
pub(crate) fn resolve_max_features(
    max_features: MaxFeatures,
    n_features: usize,
) -> Result<usize, RfError> {
    let resolved = match max_features {
        MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
        MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
        MaxFeatures::Fixed(n) => n,
        MaxFeatures::All => n_features,
    };
    if resolved == 0 || resolved > n_features {
        return Err(RfError::InvalidMaxFeatures {
            max_features: resolved,
            n_features,
        });
    }
    Ok(resolved)
}

/// Draw a bootstrap sample of `n_samples` indices with replacement.
fn bootstrap_sample(n_samples: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
) -> Result<RandomForestResult, RfError> {
    if features.is_empty() {
        return Err(RfError::EmptyDataset);
    }
    let n_samples = features.len();
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    if labels.len() != n_samples {
        return Err(RfError::LabelCountMismatch {
            n_samples,
            n_labels: labels.len(),
        });
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        for (feature_index, &val) in row.iter().enumerate() {
            if !val.is_finite() {
                return Err(RfError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
        }
    }

    let max_features_resolved = resolve_max_features(config.max_features, n_features)?;
    let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        n_classes,
        max_features = max_features_resolved,
        "training random forest"
    );

    // Per-tree seeds derived from the master RNG so trees are independent
    // but the whole ensemble is reproducible from one seed.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let criterion = config.criterion;
    let max_depth = config.max_depth;
    let min_samples_split = config.min_samples_split;
    let min_samples_leaf = config.min_samples_leaf;

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let bootstrap_indices = bootstrap_sample(n_samples, &mut rng);

            let boot_features: Vec<Vec<f64>> = bootstrap_indices
                .iter()
                .map(|&i| features[i].clone())
                .collect();
            let boot_labels: Vec<usize> =
                bootstrap_indices.iter().map(|&i| labels[i]).collect();

            let tree_config = DecisionTreeConfig::new()
                .with_criterion(criterion)
                .with_max_depth(max_depth)
                .with_min_samples_split(min_samples_split)
                .with_min_samples_leaf(min_samples_leaf)
                .with_max_features(Some(max_features_resolved))
                .with_seed(rng.r#gen());

            // All inputs are pre-validated — fit cannot fail on data errors.
            tree_config
                .fit(&boot_features, &boot_labels)
                .expect("tree fit should not fail on pre-validated data")
        })
        .collect();

    let per_tree_importances: Vec<Vec<f64>> =
        trees.iter().map(|t| t.feature_importances()).collect();
    let importances = aggregate_importances(&per_tree_importances, feature_names);

    debug!(n_trees_trained = trees.len(), "tree training complete");

    let forest = RandomForest {
        trees,
        n_features,
        n_classes,
        feature_names: feature_names.to_vec(),
    };

    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_features,
        n_classes,
        n_samples,
        max_features_resolved,
    };

    info!("random forest training complete");

    Ok(RandomForestResult::new(forest, importances, metadata))
}

#[cfg(test)]
mod tests {
    use crate::config::{MaxFeatures, RandomForestConfig};

    /// Integer-coded 3-class dataset: feature 0 carries the class signal,
    /// feature 1 cycles through unrelated codes.
    fn make_coded_data() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for class in 0..3usize {
            for i in 0..20usize {
                features.push(vec![(class * 4 + i % 3) as f64, (i % 5) as f64]);
                labels.push(class);
            }
        }
        let names = vec!["signal".to_string(), "noise".to_string()];
        (features, labels, names)
    }

    #[test]
    fn three_class_coded_accuracy() {
        let (features, labels, names) = make_coded_data();
        let config = RandomForestConfig::new(50)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_seed(42);
        let result = config.fit(&features, &labels, &names).unwrap();

        let predictions = result.forest().predict_batch(&features).unwrap();
        let correct = predictions
            .iter()
            .zip(&labels)
            .filter(|&(&p, &l)| p == l)
            .count();
        let accuracy = correct as f64 / labels.len() as f64;
        assert!(accuracy > 0.9, "accuracy = {accuracy}");
    }

    #[test]
    fn feature_importances_sum_to_one() {
        let (features, labels, names) = make_coded_data();
        let config = RandomForestConfig::new(20).unwrap().with_seed(42);
        let result = config.fit(&features, &labels, &names).unwrap();

        let total: f64 = result.importances().iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-10, "total = {total}");
    }

    #[test]
    fn signal_feature_ranked_first() {
        let (features, labels, names) = make_coded_data();
        let config = RandomForestConfig::new(30)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_seed(42);
        let result = config.fit(&features, &labels, &names).unwrap();

        let top = &result.importances()[0];
        assert_eq!(top.name, "signal");
        assert_eq!(top.rank, 1);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (features, labels, names) = make_coded_data();
        let result1 = RandomForestConfig::new(10)
            .unwrap()
            .with_seed(99)
            .fit(&features, &labels, &names)
            .unwrap();
        let result2 = RandomForestConfig::new(10)
            .unwrap()
            .with_seed(99)
            .fit(&features, &labels, &names)
            .unwrap();

        let preds1 = result1.forest().predict_batch(&features).unwrap();
        let preds2 = result2.forest().predict_batch(&features).unwrap();
        assert_eq!(preds1, preds2);
    }

    #[test]
    fn invalid_tree_count_error() {
        assert!(RandomForestConfig::new(0).is_err());
    }

    #[test]
    fn empty_dataset_error() {
        let config = RandomForestConfig::new(10).unwrap();
        let err = config.fit(&[], &[], &[]).unwrap_err();
        assert!(matches!(err, crate::RfError::EmptyDataset));
    }

    #[test]
    fn label_count_mismatch_error() {
        let config = RandomForestConfig::new(5).unwrap();
        let features = vec![vec![1.0], vec![2.0], vec![3.0]];
        let labels = vec![0, 1];
        let names = vec!["x".to_string()];
        let err = config.fit(&features, &labels, &names).unwrap_err();
        assert!(matches!(err, crate::RfError::LabelCountMismatch { .. }));
    }
}
