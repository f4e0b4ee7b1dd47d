//! Split criteria and exhaustive split search over sorted feature columns.

use rand::Rng;

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its class counts.
    ///
    /// Returns 0.0 when `n_samples` is zero (pure node by convention).
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> f64 {
        if n_samples == 0 {
            return 0.0;
        }
        let n = n_samples as f64;
        match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => {
                -class_counts
                    .iter()
                    .filter(|&&c| c > 0)
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p.ln()
                    })
                    .sum::<f64>()
            }
        }
    }
}

/// The best split found for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Zero-based feature column used for the split.
    pub(crate) feature: usize,
    /// Threshold value.
    pub(crate) threshold: f64,
    /// Weighted impurity decrease from this split (MDI formula).
    pub(crate) impurity_decrease: f64,
    /// Sample indices going to the left child.
    pub(crate) left_indices: Vec<usize>,
    /// Sample indices going to the right child.
    pub(crate) right_indices: Vec<usize>,
}

/// Find the best split among a random subset of features.
///
/// For each of `max_features` randomly chosen columns, sorts the
/// `(value, label)` pairs and scans left-to-right with incremental class
/// count updates, keeping the globally best split by weighted impurity
/// decrease. Integer-coded categorical features sort into runs of equal
/// values, so candidate thresholds fall only on category boundaries.
///
/// Returns `None` when no valid split exists (all values identical, or any
/// split would violate `min_samples_leaf`).
///
/// `features` is column-major: `features[feature_idx][sample_idx]`, with
/// `sample_indices` indexing into the inner Vecs.
#[allow(clippy::too_many_arguments)]
pub(crate) fn find_best_split(
    features: &[Vec<f64>],
    labels: &[usize],
    sample_indices: &[usize],
    n_classes: usize,
    criterion: SplitCriterion,
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = features.len();
    let n_samples = sample_indices.len();

    if n_samples == 0 || n_features == 0 {
        return None;
    }

    let mut parent_counts = vec![0usize; n_classes];
    for &si in sample_indices {
        parent_counts[labels[si]] += 1;
    }
    let parent_impurity = criterion.impurity(&parent_counts, n_samples);

    // Partial Fisher-Yates: shuffle only the first `take` positions.
    let take = max_features.min(n_features);
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(usize, f64)> = None;

    for &feat_idx in &feature_order[..take] {
        let feat_col = &features[feat_idx];

        let mut sorted: Vec<(f64, usize)> = sample_indices
            .iter()
            .map(|&si| (feat_col[si], si))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        // Left grows from empty, right shrinks from the full parent counts.
        let mut left_counts = vec![0usize; n_classes];
        let mut right_counts = parent_counts.clone();

        for i in 0..(n_samples - 1) {
            let (val_i, si) = sorted[i];
            let class_i = labels[si];

            left_counts[class_i] += 1;
            right_counts[class_i] -= 1;

            let n_left = i + 1;
            let n_right = n_samples - n_left;

            // No boundary between identical values.
            let val_next = sorted[i + 1].0;
            if val_i == val_next {
                continue;
            }

            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let left_impurity = criterion.impurity(&left_counts, n_left);
            let right_impurity = criterion.impurity(&right_counts, n_right);

            // MDI formula (matches scikit-learn).
            let decrease = (n_samples as f64) * parent_impurity
                - (n_left as f64) * left_impurity
                - (n_right as f64) * right_impurity;

            if decrease > best_decrease {
                best_decrease = decrease;
                best = Some((feat_idx, (val_i + val_next) / 2.0));
            }
        }
    }

    let (best_feature, threshold) = best?;

    let feat_col = &features[best_feature];
    let mut left_indices = Vec::with_capacity(n_samples / 2);
    let mut right_indices = Vec::with_capacity(n_samples / 2);
    for &si in sample_indices {
        if feat_col[si] <= threshold {
            left_indices.push(si);
        } else {
            right_indices.push(si);
        }
    }

    Some(SplitResult {
        feature: best_feature,
        threshold,
        impurity_decrease: best_decrease,
        left_indices,
        right_indices,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{find_best_split, SplitCriterion};

    #[test]
    fn gini_pure() {
        let imp = SplitCriterion::Gini.impurity(&[10, 0, 0], 10);
        assert!((imp - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn gini_binary_balanced() {
        let imp = SplitCriterion::Gini.impurity(&[5, 5], 10);
        assert!((imp - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn entropy_binary_balanced() {
        let imp = SplitCriterion::Entropy.impurity(&[5, 5], 10);
        assert!((imp - 2.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn entropy_pure() {
        let imp = SplitCriterion::Entropy.impurity(&[10, 0, 0], 10);
        assert!((imp - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn separable_data_finds_correct_split() {
        // Codes 0/1/2 labeled 0, codes 5/6/7 labeled 1.
        let features = vec![vec![0.0, 1.0, 2.0, 5.0, 6.0, 7.0]];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let sample_indices: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let split = find_best_split(
            &features,
            &labels,
            &sample_indices,
            2,
            SplitCriterion::Gini,
            1,
            1,
            &mut rng,
        )
        .expect("should find a split");

        assert_eq!(split.feature, 0);
        assert!(split.threshold > 2.0 && split.threshold < 5.0);
        assert_eq!(split.left_indices.len(), 3);
        assert_eq!(split.right_indices.len(), 3);
    }

    #[test]
    fn constant_feature_returns_none() {
        let features = vec![vec![3.0, 3.0, 3.0, 3.0]];
        let labels = vec![0, 0, 1, 1];
        let sample_indices: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let result = find_best_split(
            &features,
            &labels,
            &sample_indices,
            2,
            SplitCriterion::Gini,
            1,
            1,
            &mut rng,
        );
        assert!(result.is_none());
    }

    #[test]
    fn min_samples_leaf_enforced() {
        // Each child would hold a single sample, below the minimum of 2.
        let features = vec![vec![0.0, 4.0]];
        let labels = vec![0, 1];
        let sample_indices: Vec<usize> = (0..2).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let result = find_best_split(
            &features,
            &labels,
            &sample_indices,
            2,
            SplitCriterion::Gini,
            1,
            2,
            &mut rng,
        );
        assert!(result.is_none());
    }
}
