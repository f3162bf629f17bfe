//! Prediction Routes
//!
//! Single and batch GPA predictions. Notes analysis runs here, before the
//! synchronous predictor is called.

use axum::{extract::State, routing::post, Json, Router};
use context_client::ContextAdjustment;
use grade_core::{CourseCatalog, ModelType};
use prediction_orchestrator::{BatchPrediction, PredictRequest, PredictionResult};
use serde::Deserialize;

use crate::{ApiResponse, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct BatchPredictRequest {
    pub course_ids: Vec<i64>,
    #[serde(default)]
    pub model_type: ModelType,
}

pub fn predict_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/predict", post(predict))
        .route("/api/v1/predict/batch", post(predict_batch))
}

async fn predict(
    State(state): State<AppState>,
    Json(mut request): Json<PredictRequest>,
) -> Result<Json<ApiResponse<PredictionResult>>, AppError> {
    tracing::info!(
        "Prediction request: course {} ({})",
        request.course_id,
        request.model_type
    );

    if request.model_type == ModelType::Personalized {
        if let Some(context) = &request.user_context {
            // Reject bad input before any notes leave the process
            context.validate()?;

            let course = state.predictor.catalog().course(request.course_id);
            if let (Some(course), true) = (course, context.has_notes()) {
                let adjustment = ContextAdjustment::resolve(
                    state.analyzer.as_ref(),
                    context.notes.as_deref(),
                    &course.full_name(),
                )
                .await;
                request.context_adjustment = Some(adjustment.value);
            }
        }
    }

    let result = state.predictor.predict(&request)?;
    Ok(Json(ApiResponse::success(result)))
}

async fn predict_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchPredictRequest>,
) -> Result<Json<ApiResponse<BatchPrediction>>, AppError> {
    let predictor = state.predictor.clone();
    let batch = tokio::task::spawn_blocking(move || {
        predictor.predict_batch(&request.course_ids, request.model_type)
    })
    .await
    .map_err(anyhow::Error::from)??;

    Ok(Json(ApiResponse::success(batch)))
}
