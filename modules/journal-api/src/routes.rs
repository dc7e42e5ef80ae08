use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use journal_analysis::AnalysisExecutor;
use journal_common::{AnalysisError, AnalysisRequest, AnalysisResult, ErrorKind};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn};
use uuid::Uuid;

pub const WELCOME_MESSAGE: &str = "Welcome to the Emotion Aware Journal API!";

#[derive(Clone)]
pub struct AppState {
    executor: Arc<AnalysisExecutor>,
    timeout: Option<Duration>,
}

impl AppState {
    pub fn new(executor: Arc<AnalysisExecutor>, timeout: Option<Duration>) -> Self {
        Self { executor, timeout }
    }
}

pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/", get(root))
        .route("/healthz", get(health))
        .route("/analyze", post(analyze).options(preflight))
        .route("/analyze/", post(analyze).options(preflight))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Method and path only; request bodies are journal entries.
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": WELCOME_MESSAGE }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct AnalyzeBody {
    #[serde(default)]
    text: String,
}

async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeBody>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        warn!(status = %rejection.status(), "Rejected analyze body");
        ApiError::MalformedBody
    })?;
    let request = AnalysisRequest::new(body.text)?;

    let request_id = Uuid::new_v4();
    info!(%request_id, chars = request.text().chars().count(), "Analysis requested");

    let ticket = state.executor.submit(request);
    let outcome = match state.timeout {
        Some(limit) => tokio::time::timeout(limit, ticket).await.map_err(|_| {
            warn!(%request_id, timeout_secs = limit.as_secs(), "Analysis timed out");
            ApiError::Timeout
        })?,
        None => ticket.await,
    };

    let result = outcome.inspect_err(|e| {
        warn!(%request_id, error = %e, "Analysis failed");
    })?;
    Ok(Json(result))
}

/// HTTP-facing failure. Bodies carry the error kind only.
#[derive(Debug)]
pub enum ApiError {
    Analysis(AnalysisError),
    MalformedBody,
    Timeout,
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        ApiError::Analysis(e)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::MalformedBody => (StatusCode::UNPROCESSABLE_ENTITY, ErrorKind::InvalidRequest.as_str()),
            ApiError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            ApiError::Analysis(e) => {
                let kind = e.kind();
                let status = match kind {
                    ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
                    ErrorKind::ModelUnavailable | ErrorKind::ExecutorUnavailable => {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                    ErrorKind::ModelInferenceFailed | ErrorKind::Internal => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, kind.as_str())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        (status, Json(json!({ "error": code }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journal_common::{ModelKind, Stage};

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (AnalysisError::InvalidRequest("empty".into()), StatusCode::BAD_REQUEST),
            (
                AnalysisError::ModelUnavailable {
                    kind: ModelKind::Emotion,
                    reason: "offline".into(),
                }
                .in_stage(Stage::Emotion),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AnalysisError::ModelInferenceFailed {
                    kind: ModelKind::Extraction,
                    reason: "bad tensor".into(),
                }
                .in_stage(Stage::Features),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (AnalysisError::ExecutorClosed, StatusCode::SERVICE_UNAVAILABLE),
            (AnalysisError::WorkerFailed("panic".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_and_code().0, expected);
        }
        assert_eq!(ApiError::Timeout.status_and_code().0, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            ApiError::MalformedBody.status_and_code(),
            (StatusCode::UNPROCESSABLE_ENTITY, "invalid_request")
        );
    }
}
