use serde_json::Value;
use tracing::{info, warn};

use super::{StageModel, extract_json, join_reasons, parse_items, region_addendum};
use crate::clients::{ChatMessage, ContentPart};
use crate::error::Result;
use crate::schemas::{
    Diagnosis, DiagnosisIssue, PhotoReference, PropertyContext, Stage, StageOutcome,
    SystemCategory,
};

const NO_PHOTOS_SUMMARY: &str = "No photos provided for analysis.";
const UNPARSEABLE_SUMMARY: &str = "Unable to parse diagnosis.";

/// Infers the likely cause of a maintenance problem from photos and an optional description.
pub struct MaintenanceDiagnosisAgent {
    model: StageModel,
}

impl MaintenanceDiagnosisAgent {
    pub fn new(model: StageModel) -> Self {
        Self { model }
    }

    fn system_prompt(&self, context: Option<&PropertyContext>) -> String {
        let systems = SystemCategory::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        self.model.prompt().render(&[
            ("systems", &systems),
            ("region_guidance", &region_addendum(context)),
        ])
    }

    fn user_message(
        photos: &[PhotoReference],
        description: Option<&str>,
        context: Option<&PropertyContext>,
    ) -> ChatMessage {
        let mut parts = Vec::with_capacity(photos.len() + 3);
        if let Some(ctx) = context {
            let described = ctx.describe();
            if !described.is_empty() {
                parts.push(ContentPart::text(described));
            }
        }
        if let Some(text) = description.map(str::trim).filter(|d| !d.is_empty()) {
            parts.push(ContentPart::text(format!("User description: {}", text)));
        }
        parts.push(ContentPart::text(format!(
            "Diagnose the maintenance issue from these {} photos:",
            photos.len()
        )));
        parts.extend(photos.iter().map(|p| ContentPart::image(&p.image_url)));
        ChatMessage::user_parts(parts)
    }

    pub async fn diagnose(
        &self,
        diagnosis_id: &str,
        photos: &[PhotoReference],
        description: Option<&str>,
        context: Option<&PropertyContext>,
    ) -> Result<StageOutcome<Diagnosis>> {
        if photos.is_empty() {
            return Ok(StageOutcome::complete(Diagnosis {
                diagnosis_summary: NO_PHOTOS_SUMMARY.to_string(),
                issues: Vec::new(),
            }));
        }

        let reply = self
            .model
            .call(
                diagnosis_id,
                Stage::Detect,
                self.system_prompt(context),
                Self::user_message(photos, description, context),
            )
            .await?;

        let outcome = interpret(&reply);
        match &outcome.degraded {
            Some(reason) => warn!(
                diagnosis_id,
                stage = "detect",
                issues = outcome.value.issues.len(),
                "diagnosis degraded: {}",
                reason
            ),
            None => info!(
                diagnosis_id,
                stage = "detect",
                issues = outcome.value.issues.len(),
                "diagnosis finished"
            ),
        }
        Ok(outcome)
    }
}

fn interpret(reply: &str) -> StageOutcome<Diagnosis> {
    let Some(mut object) = extract_json(reply) else {
        return StageOutcome::degraded(
            Diagnosis {
                diagnosis_summary: UNPARSEABLE_SUMMARY.to_string(),
                issues: Vec::new(),
            },
            "diagnosis output was not valid JSON",
        );
    };

    let diagnosis_summary = match object.remove("diagnosis_summary") {
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    };
    let items = match object.remove("issues") {
        Some(Value::Array(items)) => items,
        _ => {
            return StageOutcome::degraded(
                Diagnosis {
                    diagnosis_summary,
                    issues: Vec::new(),
                },
                "diagnosis output had no issues list",
            );
        }
    };

    let (issues, malformed) = parse_items::<DiagnosisIssue>(&items);
    let reasons = if malformed > 0 {
        vec![format!("dropped {} malformed issue(s)", malformed)]
    } else {
        Vec::new()
    };
    StageOutcome {
        value: Diagnosis {
            diagnosis_summary,
            issues,
        },
        degraded: join_reasons(reasons),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{CodeCategory, Severity};

    #[test]
    fn parses_summary_and_issues() {
        let reply = r#"```json
{"diagnosis_summary":"Likely a slow leak from the supply line.",
 "issues":[{"issue_label":"ceiling leak","system":"plumbing","urgency":"High",
   "probable_cause":"failed supply line","confidence":0.75,
   "potential_code_violation":"no","code_category":"plumbing"}]}
```"#;
        let out = interpret(reply);
        assert!(!out.is_degraded());
        assert_eq!(out.value.issues.len(), 1);
        let issue = &out.value.issues[0];
        assert_eq!(issue.system, SystemCategory::Plumbing);
        assert_eq!(issue.urgency, Severity::High);
        assert_eq!(issue.code_category, CodeCategory::Plumbing);
        assert!(!issue.potential_code_violation);
    }

    #[test]
    fn unknown_system_maps_to_other() {
        let reply = r#"{"diagnosis_summary":"s","issues":[{"issue_label":"x","system":"pool","urgency":"low"}]}"#;
        assert_eq!(interpret(reply).value.issues[0].system, SystemCategory::Other);
    }

    #[test]
    fn garbage_falls_back() {
        let out = interpret("I cannot help with that.");
        assert!(out.is_degraded());
        assert_eq!(out.value.diagnosis_summary, UNPARSEABLE_SUMMARY);
        assert!(out.value.issues.is_empty());
    }
}
