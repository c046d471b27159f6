//! Webhook delivery against a local listener standing in for the backend.

mod common;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use common::*;
use inspect_pipeline::config::WebhookConfig;
use inspect_pipeline::error::PipelineError;
use inspect_pipeline::notify::{Notifier, NotifyTarget, WebhookNotifier};
use inspect_pipeline::schemas::{InspectionInput, InspectionResult};
use inspect_pipeline::workflows::InspectionWorkflow;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

type Received = mpsc::UnboundedSender<(String, Value)>;

/// Start a backend that records each POST and answers with `status`.
async fn backend(status: StatusCode) -> (SocketAddr, mpsc::UnboundedReceiver<(String, Value)>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let record = move |path: &'static str| {
        move |State(tx): State<Received>, Json(body): Json<Value>| async move {
            let _ = tx.send((path.to_string(), body));
            status
        }
    };
    let app = Router::new()
        .route(
            "/api/v1/webhooks/inspection-complete",
            post(record("inspection")),
        )
        .route(
            "/api/v1/webhooks/diagnosis-complete",
            post(record("diagnosis")),
        )
        .with_state(tx);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, rx)
}

fn webhook_config(addr: SocketAddr) -> WebhookConfig {
    WebhookConfig {
        backend_base_url: format!("http://{}/", addr),
        timeout_ms: 2_000,
        ..WebhookConfig::default()
    }
}

#[tokio::test]
async fn posts_payload_to_the_matching_callback() {
    let (addr, mut rx) = backend(StatusCode::OK).await;
    let notifier = WebhookNotifier::new(&webhook_config(addr)).unwrap();

    notifier
        .deliver(NotifyTarget::Diagnosis, &json!({"diagnosis_id": "diag-3"}))
        .await
        .unwrap();

    let (path, body) = rx.recv().await.unwrap();
    assert_eq!(path, "diagnosis");
    assert_eq!(body["diagnosis_id"], "diag-3");
    assert_eq!(
        notifier.url_for(NotifyTarget::Inspection),
        format!("http://{}/api/v1/webhooks/inspection-complete", addr)
    );
}

#[tokio::test]
async fn server_error_is_a_notification_error() {
    let (addr, _rx) = backend(StatusCode::INTERNAL_SERVER_ERROR).await;
    let notifier = WebhookNotifier::new(&webhook_config(addr)).unwrap();

    let err = notifier
        .deliver(NotifyTarget::Inspection, &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Notification { .. }));
}

#[tokio::test]
async fn unreachable_backend_is_an_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let notifier = WebhookNotifier::new(&webhook_config(addr)).unwrap();

    assert!(
        notifier
            .deliver(NotifyTarget::Inspection, &json!({}))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn failing_backend_does_not_fail_the_run() {
    let (addr, mut rx) = backend(StatusCode::INTERNAL_SERVER_ERROR).await;
    let notifier = Arc::new(WebhookNotifier::new(&webhook_config(addr)).unwrap());
    let client = ScriptedClient::with_replies([NO_ISSUES_DETECTED, NO_ISSUES_REPORT]);
    let workflow = InspectionWorkflow::new(&test_config(), client, notifier).unwrap();

    let result = workflow
        .run(InspectionInput {
            inspection_id: Some("insp-500".into()),
            photos: vec![photo(KITCHEN, None)],
            property_context: None,
            property: None,
        })
        .await;
    assert!(matches!(result, Ok(InspectionResult::Completed(_))));

    // the delivery still happens in the background
    let delivered = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delivered.0, "inspection");
    assert_eq!(delivered.1["inspection_id"], "insp-500");
}
