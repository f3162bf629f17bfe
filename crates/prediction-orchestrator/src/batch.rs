use grade_core::{CourseCatalog, CoreResult, ModelType, PredictionError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{Predictor, StandardPrediction};

/// Most course ids accepted in one batch
pub const MAX_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_courses: usize,
    pub skipped_courses: usize,
    pub mean_predicted_gpa: f64,
    pub min_predicted_gpa: f64,
    pub max_predicted_gpa: f64,
    /// Over the courses that have a historical average
    pub mean_actual_gpa: Option<f64>,
}

impl BatchSummary {
    fn from_predictions(predictions: &[StandardPrediction], skipped: usize) -> Self {
        let predicted: Vec<f64> = predictions.iter().map(|p| p.predicted_gpa).collect();
        let actual: Vec<f64> = predictions.iter().filter_map(|p| p.actual_gpa).collect();

        Self {
            total_courses: predicted.len(),
            skipped_courses: skipped,
            mean_predicted_gpa: mean(&predicted).unwrap_or(0.0),
            min_predicted_gpa: predicted.iter().copied().fold(f64::INFINITY, f64::min),
            max_predicted_gpa: predicted.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean_actual_gpa: mean(&actual),
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPrediction {
    /// In request order
    pub predictions: Vec<StandardPrediction>,
    /// Course ids that could not be predicted
    pub skipped: Vec<i64>,
    pub summary: BatchSummary,
}

impl<C: CourseCatalog> Predictor<C> {
    /// Standard predictions for several courses, evaluated in parallel.
    ///
    /// Courses that fail are skipped; the call only fails when the batch
    /// itself is malformed or nothing could be predicted.
    pub fn predict_batch(
        &self,
        course_ids: &[i64],
        model_type: ModelType,
    ) -> CoreResult<BatchPrediction> {
        if course_ids.is_empty() || course_ids.len() > MAX_BATCH_SIZE {
            return Err(PredictionError::InvalidInput(format!(
                "batch must contain between 1 and {} course ids, got {}",
                MAX_BATCH_SIZE,
                course_ids.len()
            )));
        }
        if model_type == ModelType::Personalized {
            return Err(PredictionError::InvalidInput(
                "batch predictions support population models only".to_string(),
            ));
        }

        tracing::info!(
            "📊 Batch prediction for {} courses with {}",
            course_ids.len(),
            model_type
        );

        let results: Vec<(i64, CoreResult<StandardPrediction>)> = course_ids
            .par_iter()
            .map(|&id| (id, self.predict_standard(id, model_type)))
            .collect();

        let mut predictions = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();
        for (id, result) in results {
            match result {
                Ok(prediction) => predictions.push(prediction),
                Err(e) => {
                    tracing::warn!("Skipping course {} in batch: {}", id, e.kind());
                    skipped.push(id);
                }
            }
        }

        if predictions.is_empty() {
            return Err(PredictionError::NoPredictions(
                "No valid predictions could be made for the given courses".to_string(),
            ));
        }

        let summary = BatchSummary::from_predictions(&predictions, skipped.len());
        tracing::info!(
            "✅ Batch complete: {}/{} courses predicted",
            summary.total_courses,
            course_ids.len()
        );

        Ok(BatchPrediction {
            predictions,
            skipped,
            summary,
        })
    }
}
