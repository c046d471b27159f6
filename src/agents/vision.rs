use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};

use super::{StageModel, extract_json, join_reasons, parse_items, region_addendum};
use crate::clients::{ChatMessage, ContentPart};
use crate::error::Result;
use crate::schemas::{
    InspectionIssue, IssueType, PhotoReference, PropertyContext, Stage, StageOutcome,
};

/// Detects visible damage and code concerns across a batch of inspection photos.
pub struct InspectionVisionAgent {
    model: StageModel,
}

impl InspectionVisionAgent {
    pub fn new(model: StageModel) -> Self {
        Self { model }
    }

    fn system_prompt(&self, context: Option<&PropertyContext>) -> String {
        let issue_types = IssueType::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        self.model.prompt().render(&[
            ("issue_types", &issue_types),
            ("region_guidance", &region_addendum(context)),
        ])
    }

    fn user_message(photos: &[PhotoReference], context: Option<&PropertyContext>) -> ChatMessage {
        let mut parts = Vec::with_capacity(photos.len() + 3);
        if let Some(ctx) = context {
            let described = ctx.describe();
            if !described.is_empty() {
                parts.push(ContentPart::text(described));
            }
        }
        parts.push(ContentPart::text(format!(
            "Analyze these {} property photos for damage and issues:",
            photos.len()
        )));
        let listing = photos
            .iter()
            .enumerate()
            .map(|(i, p)| match &p.room_name {
                Some(room) => format!("Photo {}: {} (room: {})", i + 1, p.image_url, room),
                None => format!("Photo {}: {}", i + 1, p.image_url),
            })
            .collect::<Vec<_>>()
            .join("\n");
        parts.push(ContentPart::text(listing));
        parts.extend(photos.iter().map(|p| ContentPart::image(&p.image_url)));
        ChatMessage::user_parts(parts)
    }

    /// Detect issues in `photos`. No photos means no call and no issues.
    pub async fn detect(
        &self,
        inspection_id: &str,
        photos: &[PhotoReference],
        context: Option<&PropertyContext>,
    ) -> Result<StageOutcome<Vec<InspectionIssue>>> {
        if photos.is_empty() {
            return Ok(StageOutcome::complete(Vec::new()));
        }

        let reply = self
            .model
            .call(
                inspection_id,
                Stage::Detect,
                self.system_prompt(context),
                Self::user_message(photos, context),
            )
            .await?;

        let outcome = interpret(&reply, photos);
        match &outcome.degraded {
            Some(reason) => warn!(
                inspection_id,
                stage = "detect",
                issues = outcome.value.len(),
                "detection degraded: {}",
                reason
            ),
            None => info!(
                inspection_id,
                stage = "detect",
                issues = outcome.value.len(),
                "detection finished"
            ),
        }
        Ok(outcome)
    }
}

/// Turn the raw reply into issues tied to known photos, back-filling room names.
fn interpret(reply: &str, photos: &[PhotoReference]) -> StageOutcome<Vec<InspectionIssue>> {
    let Some(mut object) = extract_json(reply) else {
        return StageOutcome::degraded(Vec::new(), "detection output was not valid JSON");
    };
    let items = match object.remove("issues") {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => {
            return StageOutcome::degraded(Vec::new(), "detection output had no issues list");
        }
        Some(_) => {
            return StageOutcome::degraded(Vec::new(), "detection issues field was not a list");
        }
    };

    let rooms: HashMap<&str, Option<&str>> = photos
        .iter()
        .map(|p| (p.image_url.as_str(), p.room_name.as_deref()))
        .collect();

    let (parsed, malformed) = parse_items::<InspectionIssue>(&items);
    let mut unknown = 0;
    let mut issues = Vec::with_capacity(parsed.len());
    for mut issue in parsed {
        let url = issue.image_url.trim().to_string();
        match rooms.get(url.as_str()) {
            Some(room) => {
                issue.image_url = url;
                if issue.room_name.is_none() {
                    issue.room_name = room.map(str::to_string);
                }
                issues.push(issue);
            }
            None => unknown += 1,
        }
    }

    let mut reasons = Vec::new();
    if malformed > 0 {
        reasons.push(format!("dropped {} malformed issue(s)", malformed));
    }
    if unknown > 0 {
        reasons.push(format!(
            "dropped {} issue(s) referencing unknown photos",
            unknown
        ));
    }
    StageOutcome {
        value: issues,
        degraded: join_reasons(reasons),
    }
}
