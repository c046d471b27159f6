//! Shared fixtures: a scripted completion client and a channel-backed notifier.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use inspect_pipeline::clients::{CompletionClient, CompletionRequest};
use inspect_pipeline::config::Config;
use inspect_pipeline::error::{PipelineError, Result};
use inspect_pipeline::notify::{Notifier, NotifyTarget};
use inspect_pipeline::schemas::PhotoSubmission;

/// Replays queued replies in order and records every request it sees.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_replies<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::default();
        {
            let mut queue = client.replies.lock().unwrap();
            queue.extend(replies.into_iter().map(|r| Ok(r.into())));
        }
        Arc::new(client)
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, err: PipelineError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(PipelineError::Internal {
                    message: "no scripted reply left".into(),
                })
            })
    }
}

/// Forwards every delivered payload to a channel.
pub struct RecordingNotifier {
    tx: mpsc::UnboundedSender<(NotifyTarget, Value)>,
}

impl RecordingNotifier {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<(NotifyTarget, Value)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, target: NotifyTarget, payload: &Value) -> Result<()> {
        let _ = self.tx.send((target, payload.clone()));
        Ok(())
    }
}

/// Always fails, like an unreachable backend.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn deliver(&self, _target: NotifyTarget, _payload: &Value) -> Result<()> {
        Err(PipelineError::Notification {
            message: "connection refused".into(),
        })
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.webhooks.enabled = false;
    config
}

pub fn photo(url: &str, room: Option<&str>) -> PhotoSubmission {
    PhotoSubmission {
        image_url: url.to_string(),
        room_name: room.map(str::to_string),
        order_index: None,
    }
}

/// Wait briefly for a dispatched notification.
pub async fn next_notification(
    rx: &mut mpsc::UnboundedReceiver<(NotifyTarget, Value)>,
) -> Option<(NotifyTarget, Value)> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .ok()
        .flatten()
}

pub const KITCHEN: &str = "https://cdn.example.com/inspections/kitchen.jpg";
pub const BATH: &str = "https://cdn.example.com/inspections/bath.jpg";

pub const NO_ISSUES_DETECTED: &str = r#"{"issues": []}"#;

pub const NO_ISSUES_REPORT: &str = r###"{
  "report_markdown": "## Inspection Report\n\n### Executive Summary\nNo issues were found in the submitted photos.",
  "report_summary_json": {"headline": "No issues found", "recommendations": []}
}"###;

pub fn water_damage_detected(url: &str) -> String {
    serde_json::json!({
        "issues": [{
            "image_url": url,
            "room_name": null,
            "issue_type": "water_damage",
            "description": "Brown staining and swelling on the cabinet floor under the sink",
            "severity": "high",
            "confidence": 0.86,
            "potential_code_violation": true,
            "code_category": "plumbing",
            "compliance_note": "Active leaks must be repaired",
            "bounding_box": null
        }]
    })
    .to_string()
}

pub const WATER_DAMAGE_ENRICHED: &str = r#"{
  "issues_enriched": [{
    "image_url": "https://cdn.example.com/inspections/kitchen.jpg",
    "issue_type": "water_damage",
    "recommended_action": "Find and repair the leak, then replace the cabinet base",
    "recommended_trade": "plumber",
    "diy_possible": false,
    "cost_low": 350,
    "cost_high": 900,
    "time_hours": 4,
    "materials_list": [],
    "safety_warnings": "Shut off the water supply before work"
  }],
  "summary": {"issue_count": 1, "summary_severity": "high", "summary_cost_low": 350, "summary_cost_high": 900}
}"#;

pub const WATER_DAMAGE_REPORT: &str = r###"{
  "report_markdown": "## Inspection Report\n\n### Priority Action Items\nUrgent: repair the leak under the kitchen sink promptly to prevent mold.",
  "report_summary_json": {
    "headline": "One urgent plumbing issue",
    "code_violations_found": 0,
    "priority_issues": 0,
    "recommendations": ["Hire a licensed plumber"]
  }
}"###;
