use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use course_models::ModelInfo;
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub models_loaded: usize,
    pub courses_loaded: usize,
    pub notes_analysis: String,
    pub timestamp: DateTime<Utc>,
}

pub fn model_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/models", get(list_models))
        .route("/api/v1/health", get(health))
}

async fn list_models(State(state): State<AppState>) -> Json<ApiResponse<ModelsResponse>> {
    Json(ApiResponse::success(ModelsResponse {
        models: state.predictor.registry().models(),
    }))
}

async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        models_loaded: state.predictor.registry().len(),
        courses_loaded: state.predictor.catalog().len(),
        notes_analysis: state.analyzer.backend_name().to_string(),
        timestamp: Utc::now(),
    }))
}
