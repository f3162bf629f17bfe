//! Model Registry
//!
//! Holds the frozen population models loaded from the model artifact at
//! startup. The registry is immutable once built and is shared across
//! requests behind an `Arc`.

use grade_core::{CoreResult, PredictionError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::features::FeatureVector;
use crate::forest::{forest_predict, RegressionTree};

pub const POPULATION_BASIC: &str = "population_basic";
pub const POPULATION_STRUCTURAL: &str = "population_structural";

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid model {model_id}: {reason}")]
    InvalidModel { model_id: String, reason: String },

    #[error("Duplicate model id: {0}")]
    DuplicateModel(String),
}

/// Frozen decision structure of a model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    /// intercept + sum(coefficient_i * x_i)
    Linear { intercept: f64, coefficients: Vec<f64> },
    /// Mean of bounded-depth regression trees
    Forest { trees: Vec<RegressionTree> },
}

impl Estimator {
    pub fn kind(&self) -> &'static str {
        match self {
            Estimator::Linear { .. } => "linear",
            Estimator::Forest { .. } => "forest",
        }
    }

    fn predict(&self, row: &[f64]) -> f64 {
        match self {
            Estimator::Linear {
                intercept,
                coefficients,
            } => coefficients
                .iter()
                .zip(row)
                .fold(*intercept, |acc, (c, x)| acc + c * x),
            Estimator::Forest { trees } => forest_predict(trees, row),
        }
    }
}

/// Per-feature standardization fitted alongside the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standardization {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Standardization {
    fn apply(&self, row: &mut [f64]) {
        for ((x, m), s) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
            *x = (*x - m) / s;
        }
    }
}

/// Held-out error statistics from training
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub mae: f64,
    #[serde(default)]
    pub rmse: Option<f64>,
    pub r2: f64,
}

/// A frozen population model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub model_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Feature names in the order the estimator expects them
    pub features: Vec<String>,
    pub estimator: Estimator,
    #[serde(default)]
    pub standardization: Option<Standardization>,
    pub metrics: ModelMetrics,
}

/// Model metadata returned to API callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub model_name: String,
    pub description: String,
    pub estimator: String,
    pub mae: f64,
    pub rmse: Option<f64>,
    pub r2: f64,
    pub features_used: Vec<String>,
    pub num_features: usize,
}

impl ModelSpec {
    fn invalid(&self, reason: impl Into<String>) -> RegistryError {
        RegistryError::InvalidModel {
            model_id: self.model_id.clone(),
            reason: reason.into(),
        }
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        let n = self.features.len();
        if n == 0 {
            return Err(self.invalid("no features declared"));
        }
        if !self.metrics.mae.is_finite() || self.metrics.mae < 0.0 {
            return Err(self.invalid("mae must be a non-negative number"));
        }

        match &self.estimator {
            Estimator::Linear {
                intercept,
                coefficients,
            } => {
                if coefficients.len() != n {
                    return Err(self.invalid(format!(
                        "{} coefficients for {} features",
                        coefficients.len(),
                        n
                    )));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err(self.invalid("non-finite coefficient"));
                }
            }
            Estimator::Forest { trees } => {
                if trees.is_empty() {
                    return Err(self.invalid("forest has no trees"));
                }
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate(n)
                        .map_err(|e| self.invalid(format!("tree {i}: {e}")))?;
                }
            }
        }

        if let Some(std) = &self.standardization {
            if std.mean.len() != n || std.scale.len() != n {
                return Err(self.invalid("standardization length does not match features"));
            }
            if std.scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
                return Err(self.invalid("standardization scale must be finite and non-zero"));
            }
        }
        Ok(())
    }

    /// Pull the declared features out of a vector, in declared order
    fn feature_row(&self, features: &FeatureVector) -> CoreResult<Vec<f64>> {
        self.features
            .iter()
            .map(|name| {
                features.get(name).ok_or_else(|| {
                    PredictionError::IncompatibleFeatures(format!(
                        "model {} requires feature '{}', not available in the {:?} feature set",
                        self.model_id,
                        name,
                        features.feature_set()
                    ))
                })
            })
            .collect()
    }

    pub fn predict(&self, features: &FeatureVector) -> CoreResult<f64> {
        let mut row = self.feature_row(features)?;
        if let Some(std) = &self.standardization {
            std.apply(&mut row);
        }
        Ok(self.estimator.predict(&row))
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            model_type: self.model_id.clone(),
            model_name: self.name.clone(),
            description: self.description.clone(),
            estimator: self.estimator.kind().to_string(),
            mae: self.metrics.mae,
            rmse: self.metrics.rmse,
            r2: self.metrics.r2,
            features_used: self.features.clone(),
            num_features: self.features.len(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    models: Vec<ModelSpec>,
}

/// Read-only collection of frozen models
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<ModelSpec>,
}

impl ModelRegistry {
    pub fn from_models(models: Vec<ModelSpec>) -> Result<Self, RegistryError> {
        for (i, model) in models.iter().enumerate() {
            model.validate()?;
            if models[..i].iter().any(|m| m.model_id == model.model_id) {
                return Err(RegistryError::DuplicateModel(model.model_id.clone()));
            }
        }
        Ok(Self { models })
    }

    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_json::from_str(json)?;
        Self::from_models(file.models)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let registry = Self::from_json_str(&raw)?;
        for model in &registry.models {
            tracing::info!(
                "Loaded model {} ({}, {} features, MAE={:.3})",
                model.model_id,
                model.estimator.kind(),
                model.features.len(),
                model.metrics.mae
            );
        }
        Ok(registry)
    }

    pub fn get(&self, model_id: &str) -> CoreResult<&ModelSpec> {
        self.models
            .iter()
            .find(|m| m.model_id == model_id)
            .ok_or_else(|| PredictionError::UnknownModel(model_id.to_string()))
    }

    /// Score a feature vector with a registered model.
    ///
    /// Returns the raw estimate; callers clamp it to the GPA range.
    pub fn score(&self, model_id: &str, features: &FeatureVector) -> CoreResult<f64> {
        self.get(model_id)?.predict(features)
    }

    pub fn models(&self) -> Vec<ModelInfo> {
        self.models.iter().map(ModelSpec::info).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{names, StructuralFeatures};
    use crate::forest::TreeNode;

    fn basic_features() -> Vec<String> {
        [
            names::GRADE_ENTROPY,
            names::GRADE_SKEWNESS,
            names::PCT_A_RANGE,
            names::PCT_PASSING,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn linear_model(intercept: f64, coefficient: f64) -> ModelSpec {
        ModelSpec {
            model_id: POPULATION_BASIC.to_string(),
            name: "Ridge Regression".to_string(),
            description: String::new(),
            features: basic_features(),
            estimator: Estimator::Linear {
                intercept,
                coefficients: vec![coefficient; 4],
            },
            standardization: None,
            metrics: ModelMetrics {
                mae: 0.12,
                rmse: Some(0.15),
                r2: 0.61,
            },
        }
    }

    fn structural_model() -> ModelSpec {
        ModelSpec {
            model_id: POPULATION_STRUCTURAL.to_string(),
            name: "Random Forest".to_string(),
            description: String::new(),
            features: vec![names::PCT_A_RANGE.to_string(), names::PCT_EXAMS.to_string()],
            estimator: Estimator::Forest {
                trees: vec![RegressionTree::new(vec![
                    TreeNode::Split {
                        feature: 1,
                        threshold: 60.0,
                        left: 1,
                        right: 2,
                    },
                    TreeNode::Leaf { value: 3.4 },
                    TreeNode::Leaf { value: 3.0 },
                ])],
            },
            standardization: None,
            metrics: ModelMetrics {
                mae: 0.2,
                rmse: None,
                r2: 0.4,
            },
        }
    }

    fn vector(structural: Option<StructuralFeatures>) -> FeatureVector {
        FeatureVector {
            grade_entropy: 1.9,
            grade_skewness: -0.3,
            pct_a_range: 45.0,
            pct_passing: 92.0,
            is_upper_div: false,
            structural,
        }
    }

    #[test]
    fn test_linear_score_matches_frozen_arithmetic() {
        let registry = ModelRegistry::from_models(vec![linear_model(3.0, 0.1)]).unwrap();
        let score = registry.score(POPULATION_BASIC, &vector(None)).unwrap();
        let expected = 3.0 + 0.1 * 1.9 + 0.1 * -0.3 + 0.1 * 45.0 + 0.1 * 92.0;
        assert_eq!(score, expected);
    }

    #[test]
    fn test_standardization_is_applied_before_scoring() {
        let mut model = linear_model(3.0, 0.5);
        model.standardization = Some(Standardization {
            mean: vec![1.9, -0.3, 45.0, 92.0],
            scale: vec![1.0, 1.0, 1.0, 1.0],
        });
        let registry = ModelRegistry::from_models(vec![model]).unwrap();
        // Every standardized feature is zero, leaving only the intercept
        assert_eq!(registry.score(POPULATION_BASIC, &vector(None)).unwrap(), 3.0);
    }

    #[test]
    fn test_unknown_model() {
        let registry = ModelRegistry::from_models(vec![linear_model(3.0, 0.1)]).unwrap();
        let err = registry.score("gradient_boosting", &vector(None)).unwrap_err();
        assert!(matches!(err, PredictionError::UnknownModel(_)));
    }

    #[test]
    fn test_structural_model_requires_structure() {
        let registry = ModelRegistry::from_models(vec![structural_model()]).unwrap();
        let err = registry.score(POPULATION_STRUCTURAL, &vector(None)).unwrap_err();
        assert!(matches!(err, PredictionError::IncompatibleFeatures(_)));

        let structural = StructuralFeatures {
            exam_heavy: true,
            project_heavy: false,
            has_projects: false,
            is_theory_course: true,
            total_assessments: 3,
            pct_exams: 70.0,
            pct_projects: 0.0,
            pct_homework: 30.0,
        };
        let score = registry
            .score(POPULATION_STRUCTURAL, &vector(Some(structural)))
            .unwrap();
        assert_eq!(score, 3.0);
    }

    #[test]
    fn test_validation_rejects_mismatched_coefficients() {
        let mut model = linear_model(3.0, 0.1);
        model.estimator = Estimator::Linear {
            intercept: 3.0,
            coefficients: vec![0.1; 3],
        };
        assert!(matches!(
            ModelRegistry::from_models(vec![model]),
            Err(RegistryError::InvalidModel { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_zero_scale_and_duplicates() {
        let mut model = linear_model(3.0, 0.1);
        model.standardization = Some(Standardization {
            mean: vec![0.0; 4],
            scale: vec![1.0, 0.0, 1.0, 1.0],
        });
        assert!(ModelRegistry::from_models(vec![model]).is_err());

        let dup = ModelRegistry::from_models(vec![linear_model(3.0, 0.1), linear_model(2.0, 0.1)]);
        assert!(matches!(dup, Err(RegistryError::DuplicateModel(_))));
    }

    #[test]
    fn test_registry_loads_from_json() {
        let json = r#"{
            "models": [{
                "model_id": "population_basic",
                "name": "Ridge Regression",
                "description": "grade distribution features",
                "features": ["grade_entropy", "pct_a_range"],
                "estimator": {"kind": "linear", "intercept": 3.2, "coefficients": [-0.05, 0.01]},
                "metrics": {"mae": 0.11, "r2": 0.58}
            }]
        }"#;
        let registry = ModelRegistry::from_json_str(json).unwrap();
        assert_eq!(registry.len(), 1);

        let info = &registry.models()[0];
        assert_eq!(info.model_type, "population_basic");
        assert_eq!(info.estimator, "linear");
        assert_eq!(info.num_features, 2);
        assert_eq!(info.rmse, None);
    }
}
