//! HTTP boundary for the inspection and diagnosis workflows
//!
//! Axum router with optional bearer authentication. Health, info and metrics
//! are plain JSON; the two workflow routes accept and return the pipeline
//! records directly.

use axum::{
    Json, Router,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::{cmp::Ordering, sync::Arc};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::PipelineError;
use crate::schemas::{DiagnosisInput, DiagnosisResult, InspectionInput, InspectionResult};
use crate::workflows::{DiagnosisWorkflow, InspectionWorkflow};

pub const INSPECTION_ROUTE: &str = "/api/v1/workflows/inspection";
pub const DIAGNOSIS_ROUTE: &str = "/api/v1/workflows/diagnosis";

const LATENCY_WINDOW: usize = 256;

/// Shared state for HTTP server
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub inspection: Arc<InspectionWorkflow>,
    pub diagnosis: Arc<DiagnosisWorkflow>,
    pub metrics: Arc<Mutex<HttpMetrics>>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        inspection: Arc<InspectionWorkflow>,
        diagnosis: Arc<DiagnosisWorkflow>,
    ) -> Self {
        Self {
            config,
            inspection,
            diagnosis,
            metrics: Arc::new(Mutex::new(HttpMetrics::new())),
        }
    }
}

/// Metrics for HTTP server
#[derive(Debug, Clone)]
pub struct HttpMetrics {
    pub total_requests: u64,
    pub last_request_unix: u64,
    pub errors_total: u64,
    pub runs_completed: u64,
    pub runs_rejected: u64,
    pub runs_degraded: u64,
    pub latencies: Vec<f64>, // ring buffer for p95
}

impl HttpMetrics {
    fn new() -> Self {
        Self {
            total_requests: 0,
            last_request_unix: unix_now(),
            errors_total: 0,
            runs_completed: 0,
            runs_rejected: 0,
            runs_degraded: 0,
            latencies: Vec::with_capacity(LATENCY_WINDOW),
        }
    }

    fn record_run(&mut self, completed: bool, degraded: bool) {
        if completed {
            self.runs_completed = self.runs_completed.saturating_add(1);
        } else {
            self.runs_rejected = self.runs_rejected.saturating_add(1);
        }
        if degraded {
            self.runs_degraded = self.runs_degraded.saturating_add(1);
        }
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Status code for a pipeline error surfaced at the boundary.
pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Validation { .. } => StatusCode::BAD_REQUEST,
        PipelineError::Completion { .. } => StatusCode::BAD_GATEWAY,
        PipelineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: PipelineError) -> Response {
    let status = status_for(&err);
    tracing::warn!(kind = err.label(), status = status.as_u16(), "request failed: {}", err);
    (
        status,
        Json(json!({
            "error": {
                "code": status.as_u16(),
                "kind": err.label(),
                "message": err.to_string()
            }
        })),
    )
        .into_response()
}

fn json_rejection(rejection: JsonRejection) -> Response {
    error_response(PipelineError::Validation {
        message: rejection.body_text(),
    })
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({"status": "healthy", "service": "inspect-pipeline"}))
}

/// Info endpoint
pub async fn info_handler(State(state): State<AppState>) -> impl IntoResponse {
    let config = &state.config;
    Json(json!({
        "service": "inspect-pipeline",
        "version": env!("CARGO_PKG_VERSION"),
        "completion": {
            "base_url": config.completion.base_url,
            "vision_model": config.completion.vision_model,
            "text_model": config.completion.text_model,
            "timeout_ms": config.completion.timeout_ms
        },
        "webhooks": {
            "enabled": config.webhooks.enabled,
            "inspection_url": config.webhooks.inspection_url(),
            "diagnosis_url": config.webhooks.diagnosis_url(),
            "timeout_ms": config.webhooks.timeout_ms
        },
        "server": {
            "bind": config.runtime.http_bind.to_string(),
            "auth": config.runtime.bearer_token.is_some()
        }
    }))
}

/// Metrics endpoint
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let metrics = state.metrics.lock().await.clone();

    let (avg_latency_ms, p95_latency_ms) = if metrics.latencies.is_empty() {
        (None, None)
    } else {
        let sum: f64 = metrics.latencies.iter().sum();
        let avg = sum / metrics.latencies.len() as f64;
        let mut sorted = metrics.latencies.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let p95_idx = ((sorted.len() as f64 * 0.95) as usize).min(sorted.len() - 1);
        (Some(avg), sorted.get(p95_idx).copied())
    };

    Json(json!({
        "metrics_version": "1",
        "total_requests": metrics.total_requests,
        "last_request_unix": metrics.last_request_unix,
        "errors_total": metrics.errors_total,
        "runs_completed": metrics.runs_completed,
        "runs_rejected": metrics.runs_rejected,
        "runs_degraded": metrics.runs_degraded,
        "avg_latency_ms": avg_latency_ms,
        "p95_latency_ms": p95_latency_ms
    }))
}

pub async fn inspection_handler(
    State(state): State<AppState>,
    body: Result<Json<InspectionInput>, JsonRejection>,
) -> Response {
    let Json(input) = match body {
        Ok(body) => body,
        Err(rejection) => return json_rejection(rejection),
    };
    match state.inspection.run(input).await {
        Ok(result) => {
            let degraded = result.payload().is_some_and(|p| !p.warnings.is_empty());
            let status = match result {
                InspectionResult::Completed(_) => StatusCode::OK,
                InspectionResult::NoValidPhotos(_) => StatusCode::BAD_REQUEST,
            };
            state
                .metrics
                .lock()
                .await
                .record_run(status == StatusCode::OK, degraded);
            (status, Json(result)).into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn diagnosis_handler(
    State(state): State<AppState>,
    body: Result<Json<DiagnosisInput>, JsonRejection>,
) -> Response {
    let Json(input) = match body {
        Ok(body) => body,
        Err(rejection) => return json_rejection(rejection),
    };
    match state.diagnosis.run(input).await {
        Ok(result) => {
            let degraded = result.payload().is_some_and(|p| !p.warnings.is_empty());
            let status = match result {
                DiagnosisResult::Completed(_) => StatusCode::OK,
                DiagnosisResult::NoValidPhotos(_) => StatusCode::BAD_REQUEST,
            };
            state
                .metrics
                .lock()
                .await
                .record_run(status == StatusCode::OK, degraded);
            (status, Json(result)).into_response()
        }
        Err(e) => error_response(e),
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"code": 401, "kind": "unauthorized", "message": "Unauthorized"}})),
    )
        .into_response()
}

/// True when the `Authorization` header carries exactly `Bearer <expected>`.
fn bearer_matches(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected)
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let token = state.config.runtime.bearer_token.clone();
    Router::new()
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .route("/metrics", get(metrics_handler))
        .route(INSPECTION_ROUTE, post(inspection_handler))
        .route(DIAGNOSIS_ROUTE, post(diagnosis_handler))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            |State(metrics): State<Arc<Mutex<HttpMetrics>>>,
             req: axum::http::Request<Body>,
             next: axum::middleware::Next| async move {
                let is_workflow = req.uri().path().starts_with("/api/");
                let start = is_workflow.then(std::time::Instant::now);
                let resp = next.run(req).await;
                if let Some(start_time) = start {
                    let latency_ms = start_time.elapsed().as_secs_f64() * 1000.0;
                    let mut m = metrics.lock().await;
                    m.latencies.push(latency_ms);
                    if m.latencies.len() > LATENCY_WINDOW {
                        m.latencies.remove(0);
                    }
                    if !resp.status().is_success() {
                        m.errors_total = m.errors_total.saturating_add(1);
                    }
                    m.total_requests = m.total_requests.saturating_add(1);
                    m.last_request_unix = unix_now();
                }
                resp
            },
        ))
        // Bearer auth only when a token is configured
        .layer(middleware::from_fn_with_state(
            token,
            |State(token): State<Option<String>>,
             req: axum::http::Request<Body>,
             next: axum::middleware::Next| async move {
                // Allow /health without auth
                if req.uri().path() == "/health" {
                    return next.run(req).await;
                }
                let Some(expected) = token else {
                    return next.run(req).await;
                };
                if !bearer_matches(req.headers(), &expected) {
                    return unauthorized();
                }
                next.run(req).await
            },
        ))
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(state: AppState) -> anyhow::Result<()> {
    let bind = state.config.runtime.http_bind;
    if state.config.runtime.bearer_token.is_none() {
        tracing::warn!("INSPECT_BEARER_TOKEN not set; workflow routes are unauthenticated");
    }
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    tracing::info!(
        "Starting HTTP server on {} (workflows at {} and {})",
        bind,
        INSPECTION_ROUTE,
        DIAGNOSIS_ROUTE
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses() {
        let v = PipelineError::Validation { message: "x".into() };
        let c = PipelineError::Completion { message: "x".into() };
        let t = PipelineError::Timeout {
            operation: "x".into(),
            timeout_ms: 1,
        };
        let i = PipelineError::Internal { message: "x".into() };
        assert_eq!(status_for(&v), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&c), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(&t), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_for(&i), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn bearer_header_must_match_exactly() {
        let mut headers = HeaderMap::new();
        assert!(!bearer_matches(&headers, "s3cret"));

        headers.insert(header::AUTHORIZATION, "Bearer s3cret".parse().unwrap());
        assert!(bearer_matches(&headers, "s3cret"));
        assert!(!bearer_matches(&headers, "s3cre"));

        headers.insert(header::AUTHORIZATION, "bearer s3cret".parse().unwrap());
        assert!(!bearer_matches(&headers, "s3cret"));
    }
}
