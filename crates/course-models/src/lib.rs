//! Course Models
//!
//! Population-level GPA estimation: feature vectorization of historical
//! grade data, frozen model scoring, and MAE-based confidence intervals.

pub mod features;
pub mod forest;
pub mod interval;
pub mod registry;

pub use features::{FeatureSet, FeatureVector, StructuralFeatures};
pub use forest::{RegressionTree, TreeNode, MAX_TREE_DEPTH};
pub use interval::{clamp_gpa, ConfidenceInterval, Z_95};
pub use registry::{
    Estimator, ModelInfo, ModelMetrics, ModelRegistry, ModelSpec, RegistryError,
    Standardization, POPULATION_BASIC, POPULATION_STRUCTURAL,
};
