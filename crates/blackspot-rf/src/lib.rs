//! Random Forest classification: train, evaluate, predict.
//!
//! Provides a hand-rolled Random Forest classifier with CART decision trees,
//! Gini/Entropy split criteria, parallel training via rayon, a stratified
//! train/test holdout, per-class evaluation reporting, feature importance,
//! and versioned model serialization.

mod config;
mod confusion;
mod error;
mod forest;
mod holdout;
mod importance;
mod node;
mod predict;
mod report;
mod result;
mod serialize;
mod split;
mod tree;

pub use config::{MaxFeatures, RandomForestConfig};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use error::RfError;
pub use forest::RandomForest;
pub use holdout::{HoldoutSplit, TrainTestSplit};
pub use importance::RankedFeature;
pub use node::Node;
pub use predict::ClassDistribution;
pub use report::ClassificationReport;
pub use result::{RandomForestResult, TrainingMetadata};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
