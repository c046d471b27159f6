mod common;

use common::*;
use inspect_pipeline::clients::MessageContent;
use inspect_pipeline::error::PipelineError;
use inspect_pipeline::notify::NotifyTarget;
use inspect_pipeline::schemas::{
    InspectionInput, InspectionResult, IssueType, NO_VALID_PHOTOS, PropertyContext, Severity,
    Stage,
};
use inspect_pipeline::workflows::InspectionWorkflow;
use std::sync::Arc;

fn workflow(
    client: Arc<ScriptedClient>,
) -> (
    InspectionWorkflow,
    tokio::sync::mpsc::UnboundedReceiver<(NotifyTarget, serde_json::Value)>,
) {
    let (notifier, rx) = RecordingNotifier::new();
    let wf = InspectionWorkflow::new(&test_config(), client, notifier).unwrap();
    (wf, rx)
}

fn input(photos: Vec<inspect_pipeline::schemas::PhotoSubmission>) -> InspectionInput {
    InspectionInput {
        inspection_id: Some("insp-42".into()),
        photos,
        property_context: None,
        property: None,
    }
}

#[tokio::test]
async fn no_valid_photos_short_circuits_without_calls() {
    let client = ScriptedClient::new();
    let (wf, mut rx) = workflow(client.clone());

    let result = wf
        .run(input(vec![photo("kitchen.jpg", None), photo("", None)]))
        .await
        .unwrap();

    match result {
        InspectionResult::NoValidPhotos(rejected) => {
            assert_eq!(rejected.inspection_id, "insp-42");
            assert_eq!(rejected.error, NO_VALID_PHOTOS);
        }
        other => panic!("expected no-photos result, got {:?}", other),
    }
    assert_eq!(client.calls(), 0);
    tokio::task::yield_now().await;
    assert!(rx.try_recv().is_err(), "no webhook for rejected runs");
}

#[tokio::test]
async fn scenario_no_issues_found() {
    let client = ScriptedClient::with_replies([NO_ISSUES_DETECTED, NO_ISSUES_REPORT]);
    let (wf, mut rx) = workflow(client.clone());

    let result = wf.run(input(vec![photo(KITCHEN, Some("Kitchen"))])).await.unwrap();
    let payload = result.payload().expect("completed payload");

    assert!(payload.issues_enriched.is_empty());
    assert_eq!(payload.summary.issue_count, 0);
    assert_eq!(payload.summary.summary_severity, Severity::Low);
    assert_eq!(payload.summary.summary_cost_low, 0.0);
    assert_eq!(payload.summary.summary_cost_high, 0.0);
    assert!(payload.report_markdown.contains("No issues were found"));
    assert!(payload.warnings.is_empty());
    // detection + report; enrichment short-circuits on an empty list
    assert_eq!(client.calls(), 2);

    let (target, body) = next_notification(&mut rx).await.expect("webhook dispatched");
    assert_eq!(target, NotifyTarget::Inspection);
    assert_eq!(body["inspection_id"], "insp-42");
}

#[tokio::test]
async fn scenario_water_damage_end_to_end() {
    let detected = water_damage_detected(KITCHEN);
    let client =
        ScriptedClient::with_replies([detected.as_str(), WATER_DAMAGE_ENRICHED, WATER_DAMAGE_REPORT]);
    let (wf, mut rx) = workflow(client.clone());

    let result = wf.run(input(vec![photo(KITCHEN, Some("Kitchen"))])).await.unwrap();
    let payload = result.payload().expect("completed payload");

    assert_eq!(payload.issues_enriched.len(), 1);
    let issue = &payload.issues_enriched[0];
    assert_eq!(issue.issue.issue_type, IssueType::WaterDamage);
    assert_eq!(issue.issue.room_name.as_deref(), Some("Kitchen"));
    assert!(issue.repair.cost_low <= issue.repair.cost_high);
    assert!(!issue.repair.recommended_trade.is_empty());
    assert_eq!(payload.summary.summary_severity, Severity::High);
    assert_eq!(payload.summary.summary_cost_low, 350.0);
    assert_eq!(payload.summary.summary_cost_high, 900.0);
    assert!(payload.report_markdown.to_lowercase().contains("urgent"));
    // counts are recomputed locally regardless of what the model claimed
    assert_eq!(payload.report_summary_json.code_violations_found, 1);
    assert_eq!(payload.report_summary_json.priority_issues, 1);
    assert_eq!(client.calls(), 3);

    let (_, body) = next_notification(&mut rx).await.expect("webhook dispatched");
    assert_eq!(body["summary"]["summary_severity"], "high");
    assert_eq!(body["issues_enriched"][0]["recommended_trade"], "plumber");
}

#[tokio::test]
async fn malformed_detection_degrades_to_no_issues() {
    let client = ScriptedClient::with_replies([
        r#"{"issues": [{"image_url": "https://cdn.example.com/insp"#,
        NO_ISSUES_REPORT,
    ]);
    let (wf, _rx) = workflow(client.clone());

    let result = wf.run(input(vec![photo(KITCHEN, None)])).await.unwrap();
    let payload = result.payload().expect("completed payload");

    assert!(payload.issues_enriched.is_empty());
    assert_eq!(payload.warnings.len(), 1);
    assert_eq!(payload.warnings[0].stage, Stage::Detect);
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn room_name_is_back_filled_from_photo() {
    let detected = water_damage_detected(BATH);
    let enriched = WATER_DAMAGE_ENRICHED.replace(KITCHEN, BATH);
    let client = ScriptedClient::with_replies([
        detected.as_str(),
        enriched.as_str(),
        WATER_DAMAGE_REPORT,
    ]);
    let (wf, _rx) = workflow(client);

    let result = wf
        .run(input(vec![
            photo(KITCHEN, Some("Kitchen")),
            photo(BATH, Some("Hall bath")),
        ]))
        .await
        .unwrap();
    let payload = result.payload().unwrap();
    assert_eq!(
        payload.issues_enriched[0].issue.room_name.as_deref(),
        Some("Hall bath")
    );
}

#[tokio::test]
async fn rejected_urls_never_reach_the_payload() {
    let rejected = "cdn.example.com/inspections/garage.jpg";
    // the model echoes the rejected URL anyway
    let detected = serde_json::json!({
        "issues": [
            {"image_url": rejected, "issue_type": "crack", "description": "x", "severity": "low", "confidence": 0.5},
        ]
    })
    .to_string();
    let client = ScriptedClient::with_replies([detected.as_str(), NO_ISSUES_REPORT]);
    let (wf, _rx) = workflow(client.clone());

    let result = wf
        .run(input(vec![photo(KITCHEN, None), photo(rejected, None)]))
        .await
        .unwrap();
    let payload = result.payload().unwrap();

    assert_eq!(payload.processed_photos.len(), 1);
    assert!(payload.processed_photos.iter().all(|p| p.image_url != rejected));
    assert!(payload.issues_enriched.is_empty());
    assert!(payload.warnings[0].message.contains("unknown photos"));

    let vision_request = &client.requests()[0];
    let user = &vision_request.messages[1];
    assert_eq!(user.image_urls(), vec![KITCHEN]);
}

#[tokio::test]
async fn transport_failure_propagates_and_skips_webhook() {
    let client = ScriptedClient::new();
    client.push_error(PipelineError::Completion {
        message: "completion service returned 503".into(),
    });
    let (wf, mut rx) = workflow(client.clone());

    let err = wf.run(input(vec![photo(KITCHEN, None)])).await.unwrap_err();
    assert!(matches!(err, PipelineError::Completion { .. }));
    assert_eq!(client.calls(), 1);
    tokio::task::yield_now().await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn webhook_failure_does_not_affect_result() {
    let client = ScriptedClient::with_replies([NO_ISSUES_DETECTED, NO_ISSUES_REPORT]);
    let wf = InspectionWorkflow::new(&test_config(), client, Arc::new(FailingNotifier)).unwrap();

    let result = wf.run(input(vec![photo(KITCHEN, None)])).await;
    assert!(matches!(result, Ok(InspectionResult::Completed(_))));
}

#[tokio::test]
async fn missing_id_is_generated() {
    let client = ScriptedClient::with_replies([NO_ISSUES_DETECTED, NO_ISSUES_REPORT]);
    let (wf, _rx) = workflow(client);

    let mut req = input(vec![photo(KITCHEN, None)]);
    req.inspection_id = None;
    let result = wf.run(req).await.unwrap();
    assert!(uuid::Uuid::parse_str(result.inspection_id()).is_ok());
}

#[tokio::test]
async fn requests_carry_images_region_guidance_and_json_mode() {
    let detected = water_damage_detected(KITCHEN);
    let client =
        ScriptedClient::with_replies([detected.as_str(), WATER_DAMAGE_ENRICHED, WATER_DAMAGE_REPORT]);
    let (wf, _rx) = workflow(client.clone());

    let mut req = input(vec![photo(KITCHEN, Some("Kitchen"))]);
    req.property_context = Some(PropertyContext {
        property_type: Some("single family".into()),
        state: Some("ca".into()),
    });
    wf.run(req).await.unwrap();

    let requests = client.requests();
    assert_eq!(requests.len(), 3);

    let vision = &requests[0];
    assert!(!vision.json_mode);
    assert_eq!(vision.model, "gpt-4o");
    let system = vision.messages[0].text();
    assert!(system.contains("STATE-SPECIFIC CONSIDERATIONS (CA)"));
    assert!(system.contains("water_damage"));
    assert!(matches!(vision.messages[1].content, MessageContent::Parts(_)));
    assert!(vision.messages[1].text().contains("Property type: single family. State: ca."));

    let enrich = &requests[1];
    assert!(enrich.json_mode);
    assert!(enrich.messages[1].text().contains("water_damage"));

    let report = &requests[2];
    assert!(report.json_mode);
    assert!(report.messages[1].text().contains("Licensed plumber"));
}
