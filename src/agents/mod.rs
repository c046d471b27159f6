//! Pipeline stages.
//!
//! Ingestion is a pure filter. Every other stage makes exactly one call to the
//! completion service and turns the reply into typed records, falling back to
//! a degraded [`StageOutcome`](crate::schemas::StageOutcome) when the reply is
//! not usable. Transport errors from the client are returned as-is.

pub mod diagnosis;
pub mod ingestion;
pub mod repair_scope;
pub mod report;
pub mod vision;

pub use diagnosis::MaintenanceDiagnosisAgent;
pub use ingestion::MediaIngestionAgent;
pub use repair_scope::{DiagnosisRepairScopeAgent, InspectionRepairScopeAgent};
pub use report::{DiagnosisReportAgent, InspectionReportAgent};
pub use vision::InspectionVisionAgent;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::building_codes::region_guidance;
use crate::clients::{ChatMessage, CompletionClient, CompletionRequest};
use crate::config::AgentSettings;
use crate::error::Result;
use crate::prompts::Prompt;
use crate::schemas::{PropertyContext, Stage};

/// Everything a stage needs to make its one completion call.
#[derive(Clone)]
pub struct StageModel {
    client: Arc<dyn CompletionClient>,
    settings: AgentSettings,
    default_model: String,
    prompt: Arc<Prompt>,
}

impl StageModel {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        settings: AgentSettings,
        default_model: impl Into<String>,
        prompt: Arc<Prompt>,
    ) -> Self {
        Self {
            client,
            settings,
            default_model: default_model.into(),
            prompt,
        }
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub fn model(&self) -> &str {
        self.settings.model_or(&self.default_model)
    }

    /// Send `system` + `user` and return the raw reply text.
    pub async fn call(
        &self,
        correlation_id: &str,
        stage: Stage,
        system: String,
        user: ChatMessage,
    ) -> Result<String> {
        debug!(
            correlation_id,
            stage = stage.as_str(),
            prompt_id = %self.prompt.id,
            prompt_checksum = %self.prompt.checksum,
            model = self.model(),
            "calling completion service"
        );
        let request = CompletionRequest::from_settings(
            &self.settings,
            &self.default_model,
            vec![ChatMessage::system(system), user],
        );
        self.client.complete(request).await
    }
}

/// Parse a model reply as a JSON object.
///
/// Markdown fences are stripped first; if the reply still has prose around the
/// object, the outermost `{...}` span is tried. Anything that is not an object
/// yields `None`.
pub fn extract_json(text: &str) -> Option<Map<String, Value>> {
    let trimmed = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```JSON")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return Some(map);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Deserialize each element independently; returns the survivors and how many were dropped.
pub fn parse_items<T: DeserializeOwned>(items: &[Value]) -> (Vec<T>, usize) {
    let mut kept = Vec::with_capacity(items.len());
    let mut dropped = 0;
    for item in items {
        match serde_json::from_value::<T>(item.clone()) {
            Ok(v) => kept.push(v),
            Err(e) => {
                debug!("dropping malformed item: {}", e);
                dropped += 1;
            }
        }
    }
    (kept, dropped)
}

/// Region-specific addendum for detection instructions; empty when no guidance applies.
pub fn region_addendum(context: Option<&PropertyContext>) -> String {
    context
        .and_then(|c| c.state.as_deref())
        .and_then(|state| {
            region_guidance(state).map(|text| {
                format!(
                    "\n\nSTATE-SPECIFIC CONSIDERATIONS ({}):\n{}",
                    state.trim().to_ascii_uppercase(),
                    text
                )
            })
        })
        .unwrap_or_default()
}

/// Join non-empty reasons into one warning message.
pub(crate) fn join_reasons(reasons: Vec<String>) -> Option<String> {
    if reasons.is_empty() {
        None
    } else {
        Some(reasons.join("; "))
    }
}
