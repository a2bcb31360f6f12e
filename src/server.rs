use crate::config::Config;
use crate::dataset::Label;
use crate::explain::Explainer;
use crate::model::{ModelError, Prediction, UrlClassifier};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Immutable per-process state: the classifier loaded once at startup and
/// the configured explanation provider. Handlers share it read-only, so
/// requests need no coordination.
pub struct AppState {
    model: Option<UrlClassifier>,
    explainer: Explainer,
}

impl AppState {
    pub fn new(model: Option<UrlClassifier>, explainer: Explainer) -> Self {
        Self { model, explainer }
    }

    /// Load the model from the configured path. A missing or incompatible
    /// model leaves the service in an explicit unready state instead of
    /// training something ad hoc.
    pub fn from_config(config: &Config) -> Self {
        let model = match UrlClassifier::load(Path::new(&config.model.path)) {
            Ok(model) => {
                log::info!("loaded model from {}", config.model.path);
                Some(model)
            }
            Err(ModelError::NotFound(path)) => {
                log::warn!("no trained model at {path}; serving in unready state");
                None
            }
            Err(e) => {
                log::error!("failed to load model: {e}; serving in unready state");
                None
            }
        };

        Self::new(model, Explainer::from_config(&config.explain))
    }

    fn predict(&self, text: &str) -> Result<Prediction, ApiError> {
        let model = self.model.as_ref().ok_or(ApiError::ModelUnavailable)?;
        model
            .predict(text)
            .map_err(|e| ApiError::Inference(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub label: Label,
    pub confidence: f64,
}

#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub explanation: String,
}

#[derive(Debug)]
pub enum ApiError {
    ModelUnavailable,
    Inference(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::ModelUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "model unavailable".to_string(),
            ),
            ApiError::Inference(message) => {
                log::error!("inference error: {message}");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/explain", post(explain))
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(config));
    let app = router(state);

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to install shutdown handler: {e}");
        return;
    }
    log::info!("shutdown signal received");
}

async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "phishguard",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/health", "/predict", "/explain"],
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "model_loaded": state.model.is_some(),
    }))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    let prediction = state.predict(&request.text)?;
    Ok(Json(PredictResponse {
        label: prediction.label,
        confidence: prediction.confidence,
    }))
}

async fn explain(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<ExplainResponse>, ApiError> {
    let prediction = state.predict(&request.text)?;
    let explanation = state
        .explainer
        .explain(&request.text, prediction.label, prediction.confidence)
        .await;
    Ok(Json(ExplainResponse { explanation }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Sample;

    fn trained_model() -> UrlClassifier {
        let samples = vec![
            Sample::new("https://www.google.com/", Label::Benign),
            Sample::new("https://github.com/login", Label::Benign),
            Sample::new("http://example.com/", Label::Benign),
            Sample::new("http://paypal.com.secure-update.info/verify", Label::Malicious),
            Sample::new("http://192.168.1.10/confirm", Label::Malicious),
            Sample::new("https://amazon-secure-check.com/update", Label::Malicious),
        ];
        UrlClassifier::train(&samples).unwrap()
    }

    #[test]
    fn test_predict_without_model_is_unavailable() {
        let state = AppState::new(None, Explainer::Heuristic);
        assert!(matches!(
            state.predict("http://example.com/"),
            Err(ApiError::ModelUnavailable)
        ));
    }

    #[test]
    fn test_predict_with_loaded_model() {
        let state = AppState::new(Some(trained_model()), Explainer::Heuristic);
        let prediction = state.predict("http://192.168.1.10/confirm").unwrap();
        assert_eq!(prediction.label, Label::Malicious);
    }

    #[tokio::test]
    async fn test_explain_falls_back_to_heuristic_text() {
        let state = AppState::new(Some(trained_model()), Explainer::Heuristic);
        let prediction = state.predict("http://192.168.1.10/confirm").unwrap();
        let explanation = state
            .explainer
            .explain(
                "http://192.168.1.10/confirm",
                prediction.label,
                prediction.confidence,
            )
            .await;
        assert!(explanation.contains("uses raw IP in domain"));
    }
}
