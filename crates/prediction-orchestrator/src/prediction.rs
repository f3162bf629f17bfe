use std::collections::BTreeMap;

use ability_estimator::{FilterStep, GradeProbabilityDistribution};
use course_models::{ConfidenceInterval, ModelInfo};
use grade_core::{CourseInfo, ModelType, UserContext};
use serde::{Deserialize, Serialize};

pub const CONFIDENCE_NOTE: &str =
    "This is a statistical estimate based on historical patterns, not an individual outcome.";

pub const PRIVACY_NOTE: &str =
    "Personal inputs are processed in-memory only and are not retained.";

/// A single prediction request.
///
/// `context_adjustment` is filled in by the caller after analyzing the
/// student's notes; it is never read from the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictRequest {
    pub course_id: i64,
    #[serde(default)]
    pub model_type: ModelType,
    #[serde(default)]
    pub user_context: Option<UserContext>,
    #[serde(skip)]
    pub context_adjustment: Option<f64>,
}

impl PredictRequest {
    pub fn standard(course_id: i64, model_type: ModelType) -> Self {
        Self {
            course_id,
            model_type,
            ..Default::default()
        }
    }

    pub fn personalized(course_id: i64, user_context: UserContext) -> Self {
        Self {
            course_id,
            model_type: ModelType::Personalized,
            user_context: Some(user_context),
            context_adjustment: None,
        }
    }

    pub fn with_context_adjustment(mut self, adjustment: f64) -> Self {
        self.context_adjustment = Some(adjustment);
        self
    }
}

/// Population-level point estimate for a course
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardPrediction {
    pub course_id: i64,
    pub model_type: ModelType,
    /// Clamped to [0, 4]
    pub predicted_gpa: f64,
    /// Historical average, when the catalog has one
    pub actual_gpa: Option<f64>,
    /// predicted - actual
    pub error: Option<f64>,
    pub confidence_interval: ConfidenceInterval,
    pub model_info: ModelInfo,
    /// The feature values the model consumed
    pub input_features: BTreeMap<String, f64>,
    pub course: CourseInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyNotice {
    pub stored: bool,
    pub logged: bool,
    pub note: String,
}

impl Default for PrivacyNotice {
    fn default() -> Self {
        Self {
            stored: false,
            logged: false,
            note: PRIVACY_NOTE.to_string(),
        }
    }
}

/// How the prior courses moved the estimate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilitySummary {
    /// Offset from the course baseline, in GPA points
    pub offset: f64,
    pub std: f64,
    pub courses_used: usize,
    pub courses_skipped: usize,
    pub steps: Vec<FilterStep>,
}

/// Shifts applied on top of base + ability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppliedAdjustments {
    pub lifestyle: f64,
    pub context: f64,
}

/// Student-specific distribution over letter grades
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalizedPrediction {
    pub course_id: i64,
    pub model_type: ModelType,
    pub predicted_gpa_mean: f64,
    pub predicted_gpa_std: f64,
    /// Population model estimate the personalization started from
    pub base_gpa: f64,
    pub grade_distribution: GradeProbabilityDistribution,
    pub ability: AbilitySummary,
    pub adjustments: AppliedAdjustments,
    pub confidence_note: String,
    pub privacy: PrivacyNotice,
    pub course: CourseInfo,
}

/// Either prediction shape. The `mode` tag tells callers which one they got.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PredictionResult {
    Standard(StandardPrediction),
    Personalized(PersonalizedPrediction),
}

impl PredictionResult {
    pub fn course_id(&self) -> i64 {
        match self {
            PredictionResult::Standard(p) => p.course_id,
            PredictionResult::Personalized(p) => p.course_id,
        }
    }

    pub fn model_type(&self) -> ModelType {
        match self {
            PredictionResult::Standard(p) => p.model_type,
            PredictionResult::Personalized(p) => p.model_type,
        }
    }

    pub fn as_standard(&self) -> Option<&StandardPrediction> {
        match self {
            PredictionResult::Standard(p) => Some(p),
            PredictionResult::Personalized(_) => None,
        }
    }

    pub fn as_personalized(&self) -> Option<&PersonalizedPrediction> {
        match self {
            PredictionResult::Personalized(p) => Some(p),
            PredictionResult::Standard(_) => None,
        }
    }
}
