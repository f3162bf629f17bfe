//! HTTP surface for the GPA prediction engine

use std::sync::Arc;

use ability_estimator::AbilityConfig;
use anyhow::Context;
use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use context_client::{ContextAnalyzer, DisabledAnalyzer, GroqContextClient};
use course_models::ModelRegistry;
use grade_core::{InMemoryCatalog, PredictionError};
use prediction_orchestrator::Predictor;
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
mod model_routes;
mod predict_routes;

pub use config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor<InMemoryCatalog>>,
    pub analyzer: Arc<dyn ContextAnalyzer>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
        }
    }
}

/// Handler error: an HTTP status plus the underlying cause
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    kind: &'static str,
    error: anyhow::Error,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<PredictionError> for AppError {
    fn from(e: PredictionError) -> Self {
        let status = match &e {
            PredictionError::CourseNotFound(_) => StatusCode::NOT_FOUND,
            PredictionError::InsufficientContext(_) | PredictionError::InvalidInput(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            kind: e.kind(),
            error: e.into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal",
            error,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.error);
            "Internal server error".to_string()
        } else {
            self.error.to_string()
        };

        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
            error_kind: Some(self.kind.to_string()),
        };
        (self.status, Json(body)).into_response()
    }
}

pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let allow_origin = if cors_origins.is_empty() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        AllowOrigin::list(origins)
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(predict_routes::predict_routes())
        .merge(model_routes::model_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Load the artifacts, build the state and serve until Ctrl-C
pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;
    init_tracing(config.json_logs);

    tracing::info!("Starting GPA prediction API");

    let registry = ModelRegistry::from_path(&config.models_path)
        .with_context(|| format!("loading models from {}", config.models_path.display()))?;
    let catalog = InMemoryCatalog::from_path(&config.catalog_path)
        .with_context(|| format!("loading catalog from {}", config.catalog_path.display()))?;

    let predictor = Predictor::new(Arc::new(registry), Arc::new(catalog)).with_ability_config(
        AbilityConfig {
            weighting: config.ability_weighting,
            ..AbilityConfig::default()
        },
    );

    let client = GroqContextClient::new(config.context.clone())?;
    let analyzer: Arc<dyn ContextAnalyzer> = if client.is_configured() {
        tracing::info!("Notes analysis enabled ({})", config.context.model);
        Arc::new(client)
    } else {
        tracing::warn!("GROQ_API_KEY not set, notes analysis disabled");
        Arc::new(DisabledAnalyzer)
    };

    let state = AppState {
        predictor: Arc::new(predictor),
        analyzer,
    };
    let app = build_router(state, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!("🚀 Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
