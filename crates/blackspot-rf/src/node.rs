//! Arena node type for CART decision trees.

/// A node in a decision tree arena.
///
/// Trees are stored as `Vec<Node>` where children are referenced by arena
/// index rather than pointers, which keeps traversal cache-friendly and the
/// whole tree trivially serializable.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// An interior split node.
    Split {
        /// Zero-based feature column used for the split.
        feature: usize,
        /// Threshold value: samples with feature <= threshold go left.
        threshold: f64,
        /// Arena index of the left child.
        left: usize,
        /// Arena index of the right child.
        right: usize,
        /// Number of training samples that reached this node.
        n_samples: usize,
        /// Weighted decrease in impurity from this split.
        impurity_decrease: f64,
    },
    /// A terminal leaf node.
    Leaf {
        /// Predicted class (argmax of distribution).
        prediction: usize,
        /// Normalized class probability distribution.
        distribution: Vec<f64>,
        /// Number of training samples in this leaf.
        n_samples: usize,
    },
}

impl Node {
    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}
