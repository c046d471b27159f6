mod common;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use common::*;
use inspect_pipeline::config::Config;
use inspect_pipeline::error::PipelineError;
use inspect_pipeline::http::{AppState, DIAGNOSIS_ROUTE, INSPECTION_ROUTE, router};
use inspect_pipeline::notify::DisabledNotifier;
use inspect_pipeline::workflows::{DiagnosisWorkflow, InspectionWorkflow};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn app_with(config: Config, client: Arc<ScriptedClient>) -> axum::Router {
    let notifier = Arc::new(DisabledNotifier);
    let inspection =
        InspectionWorkflow::new(&config, client.clone(), notifier.clone()).unwrap();
    let diagnosis = DiagnosisWorkflow::new(&config, client, notifier).unwrap();
    router(AppState::new(
        Arc::new(config),
        Arc::new(inspection),
        Arc::new(diagnosis),
    ))
}

fn app(client: Arc<ScriptedClient>) -> axum::Router {
    app_with(test_config(), client)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_open() {
    let response = app(ScriptedClient::new()).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn inspection_without_valid_photos_is_bad_request() {
    let client = ScriptedClient::new();
    let request = post_json(
        INSPECTION_ROUTE,
        &json!({"inspection_id": "insp-7", "photos": [{"image_url": "nope"}]}),
    );
    let response = app(client.clone()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["inspection_id"], "insp-7");
    assert_eq!(body["error"], "No valid photos provided");
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn inspection_happy_path_returns_payload() {
    let client = ScriptedClient::with_replies([NO_ISSUES_DETECTED, NO_ISSUES_REPORT]);
    let request = post_json(
        INSPECTION_ROUTE,
        &json!({"inspection_id": "insp-8", "photos": [{"image_url": KITCHEN, "room_name": "Kitchen"}]}),
    );
    let response = app(client).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["inspection_id"], "insp-8");
    assert_eq!(body["summary"]["issue_count"], 0);
    assert_eq!(body["processed_photos"][0]["room_name"], "Kitchen");
    assert!(body["completed_at"].is_string());
}

#[tokio::test]
async fn diagnosis_route_runs_the_diagnosis_pipeline() {
    let client = ScriptedClient::with_replies([
        r#"{"diagnosis_summary": "Nothing wrong.", "issues": []}"#,
        r###"{"report_markdown": "## Maintenance Diagnosis\nAll clear.", "report_summary_json": {"headline": "All clear"}}"###,
    ]);
    let request = post_json(
        DIAGNOSIS_ROUTE,
        &json!({"diagnosis_id": "diag-1", "photos": [{"image_url": KITCHEN}], "user_description": "Squeaky door"}),
    );
    let response = app(client.clone()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["diagnosis_id"], "diag-1");
    assert_eq!(body["summary"]["overall_urgency"], "low");
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn completion_failure_maps_to_bad_gateway() {
    let client = ScriptedClient::new();
    client.push_error(PipelineError::Completion {
        message: "completion service returned 500".into(),
    });
    let request = post_json(INSPECTION_ROUTE, &json!({"photos": [{"image_url": KITCHEN}]}));
    let response = app(client).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], 502);
    assert_eq!(body["error"]["kind"], "completion");
}

#[tokio::test]
async fn malformed_body_is_a_validation_error() {
    let request = Request::builder()
        .method("POST")
        .uri(INSPECTION_ROUTE)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"photos\": ["))
        .unwrap();
    let response = app(ScriptedClient::new()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "validation");
}

#[tokio::test]
async fn bearer_token_guards_everything_but_health() {
    let mut config = test_config();
    config.runtime.bearer_token = Some("s3cret".into());
    let app = app_with(config, ScriptedClient::new());

    let health = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let denied = app.clone().oneshot(get("/info")).await.unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/info")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    assert_eq!(
        app.clone().oneshot(wrong).await.unwrap().status(),
        StatusCode::UNAUTHORIZED
    );

    let allowed = Request::builder()
        .uri("/info")
        .header(header::AUTHORIZATION, "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(allowed).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["server"]["auth"], true);
    assert_eq!(body["completion"]["vision_model"], "gpt-4o");
}

#[tokio::test]
async fn metrics_count_workflow_runs() {
    let client = ScriptedClient::with_replies([NO_ISSUES_DETECTED, NO_ISSUES_REPORT]);
    let app = app(client);

    let ok = post_json(INSPECTION_ROUTE, &json!({"photos": [{"image_url": KITCHEN}]}));
    assert_eq!(app.clone().oneshot(ok).await.unwrap().status(), StatusCode::OK);
    let rejected = post_json(INSPECTION_ROUTE, &json!({"photos": []}));
    assert_eq!(
        app.clone().oneshot(rejected).await.unwrap().status(),
        StatusCode::BAD_REQUEST
    );

    let body = json_body(app.oneshot(get("/metrics")).await.unwrap()).await;
    assert_eq!(body["runs_completed"], 1);
    assert_eq!(body["runs_rejected"], 1);
    assert_eq!(body["total_requests"], 2);
    assert_eq!(body["errors_total"], 1);
}
