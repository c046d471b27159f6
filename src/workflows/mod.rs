//! The two orchestrators: ingest, detect, enrich, report, then notify.
//!
//! Stages run strictly in order. Transport errors from any stage end the run
//! and propagate to the caller; degraded stage outputs are carried forward and
//! listed in the payload's `warnings`.

pub mod diagnosis;
pub mod inspection;

pub use diagnosis::DiagnosisWorkflow;
pub use inspection::InspectionWorkflow;

use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::agents::StageModel;
use crate::clients::CompletionClient;
use crate::config::AgentSettings;
use crate::error::Result;
use crate::notify::{self, Notifier, NotifyTarget};
use crate::prompts::PromptRegistry;

fn stage_model(
    registry: &PromptRegistry,
    prompt_id: &str,
    client: &Arc<dyn CompletionClient>,
    settings: &AgentSettings,
    default_model: &str,
) -> Result<StageModel> {
    Ok(StageModel::new(
        Arc::clone(client),
        settings.clone(),
        default_model,
        registry.require(prompt_id)?,
    ))
}

/// Caller-supplied id, or a fresh UUID when missing or blank.
fn correlation_id(supplied: Option<&str>) -> String {
    supplied
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Serialize and hand off to the notifier without waiting.
fn notify_completion<T: Serialize>(
    notifier: &Arc<dyn Notifier>,
    target: NotifyTarget,
    correlation_id: &str,
    payload: &T,
) {
    match serde_json::to_value(payload) {
        Ok(value) => {
            notify::dispatch(
                Arc::clone(notifier),
                target,
                correlation_id.to_string(),
                value,
            );
        }
        Err(e) => warn!(
            correlation_id,
            stage = "notify",
            "could not serialize payload for webhook: {}",
            e
        ),
    }
}
