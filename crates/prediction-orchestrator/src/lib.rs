//! Prediction Orchestrator
//!
//! Wires the catalog, the model registry, the ability estimator and the
//! grade projector into the two prediction modes. Everything here is
//! synchronous; notes analysis happens upstream and arrives as a number.

use std::sync::Arc;

use ability_estimator::{
    clamp_context_adjustment, combine_uncertainty, lifestyle_adjustment, project,
    AbilityConfig, AbilityEstimator,
};
use course_models::{clamp_gpa, ConfidenceInterval, FeatureVector, ModelRegistry};
use grade_core::{
    Course, CourseCatalog, CourseInfo, CoreResult, ModelType, PredictionError, UserContext,
};

pub mod batch;
pub mod prediction;

pub use batch::{BatchPrediction, BatchSummary, MAX_BATCH_SIZE};
pub use prediction::*;

/// Multiplier on the population model's MAE used as the base spread
/// of a personalized estimate
pub const PERSONALIZED_STD_MULTIPLIER: f64 = 1.5;

pub struct Predictor<C> {
    registry: Arc<ModelRegistry>,
    catalog: Arc<C>,
    ability_config: AbilityConfig,
}

impl<C> Clone for Predictor<C> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            catalog: Arc::clone(&self.catalog),
            ability_config: self.ability_config,
        }
    }
}

impl<C: CourseCatalog> Predictor<C> {
    pub fn new(registry: Arc<ModelRegistry>, catalog: Arc<C>) -> Self {
        Self {
            registry,
            catalog,
            ability_config: AbilityConfig::default(),
        }
    }

    pub fn with_ability_config(mut self, config: AbilityConfig) -> Self {
        self.ability_config = config;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Run a prediction in the mode the request asks for
    pub fn predict(&self, request: &PredictRequest) -> CoreResult<PredictionResult> {
        match request.model_type {
            ModelType::Personalized => {
                let empty = UserContext::default();
                let context = request.user_context.as_ref().unwrap_or(&empty);
                self.predict_personalized(request.course_id, context, request.context_adjustment)
                    .map(PredictionResult::Personalized)
            }
            model_type => self
                .predict_standard(request.course_id, model_type)
                .map(PredictionResult::Standard),
        }
    }

    fn load_course(&self, course_id: i64) -> CoreResult<(Course, FeatureVector)> {
        let course = self.catalog.course(course_id).ok_or_else(|| {
            PredictionError::CourseNotFound(format!("Course ID {} not found", course_id))
        })?;
        let distribution = self.catalog.grade_distribution(course_id);
        let structure = self.catalog.grading_structure(course_id);
        let features = FeatureVector::build(&course, distribution.as_ref(), structure.as_ref())?;
        Ok((course, features))
    }

    /// Population estimate with a 95% interval
    pub fn predict_standard(
        &self,
        course_id: i64,
        model_type: ModelType,
    ) -> CoreResult<StandardPrediction> {
        if model_type == ModelType::Personalized {
            return Err(PredictionError::InvalidInput(
                "personalized predictions need a user context".to_string(),
            ));
        }

        let (course, features) = self.load_course(course_id)?;
        let model = self.registry.get(model_type.registry_id())?;
        let predicted_gpa = clamp_gpa(model.predict(&features)?);

        tracing::debug!(
            "Course {} scored {:.3} with {}",
            course_id,
            predicted_gpa,
            model.model_id
        );

        let actual_gpa = course.avg_gpa;
        Ok(StandardPrediction {
            course_id,
            model_type,
            predicted_gpa,
            actual_gpa,
            error: actual_gpa.map(|actual| predicted_gpa - actual),
            confidence_interval: ConfidenceInterval::from_mae(predicted_gpa, model.metrics.mae),
            model_info: model.info(),
            input_features: features.select(&model.features),
            course: CourseInfo::from(&course),
        })
    }

    /// Grade distribution for one student.
    ///
    /// `context_adjustment` is the notes-derived shift; it is clamped to
    /// ±0.2 before use. The context itself is never logged.
    pub fn predict_personalized(
        &self,
        course_id: i64,
        context: &UserContext,
        context_adjustment: Option<f64>,
    ) -> CoreResult<PersonalizedPrediction> {
        context.validate()?;

        let (course, features) = self.load_course(course_id)?;
        let model = self.registry.get(ModelType::Personalized.registry_id())?;
        let base_gpa = clamp_gpa(model.predict(&features)?);
        let base_std = model.metrics.mae * PERSONALIZED_STD_MULTIPLIER;

        let mut estimator = AbilityEstimator::new(self.ability_config, context.avg_gpa);
        let used = estimator.fold(&context.prior_courses, |name| {
            self.catalog.course_average_by_name(name)
        });

        if context.avg_gpa.is_none() && used == 0 && !context.has_notes() {
            return Err(PredictionError::InsufficientContext(
                "provide an overall GPA, a prior course found in the catalog, or notes"
                    .to_string(),
            ));
        }

        let ability = estimator.estimate();
        let lifestyle = lifestyle_adjustment(context);
        let notes_shift = context_adjustment.map(clamp_context_adjustment).unwrap_or(0.0);

        let mean = clamp_gpa(base_gpa + ability.mean + lifestyle + notes_shift);
        let std = combine_uncertainty(base_std, ability.variance);
        let grade_distribution = project(mean, std)?;

        tracing::info!(
            "Personalized prediction for course {} ({} prior courses used)",
            course_id,
            used
        );

        Ok(PersonalizedPrediction {
            course_id,
            model_type: ModelType::Personalized,
            predicted_gpa_mean: mean,
            predicted_gpa_std: std,
            base_gpa,
            grade_distribution,
            ability: AbilitySummary {
                offset: ability.mean,
                std: ability.std_dev(),
                courses_used: used,
                courses_skipped: context.prior_courses.len() - used,
                steps: estimator.history().to_vec(),
            },
            adjustments: AppliedAdjustments {
                lifestyle,
                context: notes_shift,
            },
            confidence_note: CONFIDENCE_NOTE.to_string(),
            privacy: PrivacyNotice::default(),
            course: CourseInfo::from(&course),
        })
    }
}
