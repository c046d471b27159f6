//! Narrative report writers.

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::{info, warn};

use super::{StageModel, extract_json};
use crate::building_codes::{
    COMPLIANCE_DISCLAIMER, common_violations, is_critical_violation,
    professional_recommendations,
};
use crate::clients::ChatMessage;
use crate::error::Result;
use crate::schemas::{
    CodeCategory, DiagnosisRepairScope, DiagnosisReport, DiagnosisReportSummary,
    InspectionIssueEnriched, InspectionRepairScope, InspectionReport, InspectionReportSummary,
    PropertyIdentity, Severity, Stage, StageOutcome,
};

const ERROR_HEADLINE: &str = "Error generating report";

fn error_markdown() -> String {
    format!("# {}\n\n{}\n", ERROR_HEADLINE, COMPLIANCE_DISCLAIMER)
}

/// Split a reply into markdown and the raw synopsis object.
fn markdown_and_synopsis(reply: &str) -> std::result::Result<(String, Option<Value>), String> {
    let Some(mut object) = extract_json(reply) else {
        return Err("report output was not valid JSON".to_string());
    };
    let markdown = match object.remove("report_markdown") {
        Some(Value::String(md)) if !md.trim().is_empty() => md,
        _ => return Err("report output had no report_markdown".to_string()),
    };
    Ok((markdown, object.remove("report_summary_json")))
}

fn property_block(property: Option<&PropertyIdentity>) -> String {
    property.map(PropertyIdentity::describe).unwrap_or_default()
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn log_outcome(correlation_id: &str, degraded: Option<&String>) {
    match degraded {
        Some(reason) => warn!(correlation_id, stage = "report", "report degraded: {}", reason),
        None => info!(correlation_id, stage = "report", "report finished"),
    }
}

/// Whether an enriched issue belongs in the priority list.
pub fn is_priority(issue: &InspectionIssueEnriched) -> bool {
    let code_critical = issue.issue.potential_code_violation
        && is_critical_violation(Some(issue.issue.issue_type), issue.issue.code_category);
    issue.issue.severity >= Severity::High || code_critical
}

/// Code categories present on flagged issues, in first-seen order.
fn flagged_categories(issues: &[InspectionIssueEnriched]) -> Vec<CodeCategory> {
    let mut seen = BTreeSet::new();
    issues
        .iter()
        .filter(|i| i.issue.potential_code_violation)
        .map(|i| i.issue.code_category)
        .filter(|c| *c != CodeCategory::NotApplicable && seen.insert(c.as_str()))
        .collect()
}

pub struct InspectionReportAgent {
    model: StageModel,
}

impl InspectionReportAgent {
    pub fn new(model: StageModel) -> Self {
        Self { model }
    }

    fn user_message(
        property: Option<&PropertyIdentity>,
        scope: &InspectionRepairScope,
        professionals: &[String],
    ) -> Result<ChatMessage> {
        let mut text = format!(
            "Generate an inspection report.\n\n{}\nSummary:\n{}\n\nIssues:\n{}\n",
            property_block(property),
            to_json(&scope.summary)?,
            to_json(&scope.issues_enriched)?,
        );
        let categories = flagged_categories(&scope.issues_enriched);
        if !categories.is_empty() {
            text.push_str("\nCommon violations to check:\n");
            for category in &categories {
                text.push_str(&format!(
                    "- {}: {}\n",
                    category.as_str(),
                    common_violations(*category).join("; ")
                ));
            }
        }
        if !professionals.is_empty() {
            text.push_str("\nRecommended professional consultations:\n");
            for p in professionals {
                text.push_str(&format!("- {}\n", p));
            }
        }
        Ok(ChatMessage::user(text))
    }

    pub async fn write(
        &self,
        inspection_id: &str,
        property: Option<&PropertyIdentity>,
        scope: &InspectionRepairScope,
    ) -> Result<StageOutcome<InspectionReport>> {
        let professionals =
            professional_recommendations(flagged_categories(&scope.issues_enriched));
        let reply = self
            .model
            .call(
                inspection_id,
                Stage::Report,
                self.model.prompt().render(&[]),
                Self::user_message(property, scope, &professionals)?,
            )
            .await?;

        let outcome = interpret_inspection(&reply, scope, professionals);
        log_outcome(inspection_id, outcome.degraded.as_ref());
        Ok(outcome)
    }
}

fn interpret_inspection(
    reply: &str,
    scope: &InspectionRepairScope,
    professionals: Vec<String>,
) -> StageOutcome<InspectionReport> {
    let code_violations_found = scope
        .issues_enriched
        .iter()
        .filter(|i| i.issue.potential_code_violation)
        .count();
    let priority_issues = scope.issues_enriched.iter().filter(|i| is_priority(i)).count();

    let (report_markdown, synopsis) = match markdown_and_synopsis(reply) {
        Ok(parts) => parts,
        Err(reason) => {
            let report = InspectionReport {
                report_markdown: error_markdown(),
                report_summary_json: InspectionReportSummary {
                    headline: ERROR_HEADLINE.to_string(),
                    code_violations_found,
                    priority_issues,
                    recommendations: professionals,
                },
            };
            return StageOutcome::degraded(report, reason);
        }
    };

    let mut summary = synopsis
        .and_then(|v| serde_json::from_value::<InspectionReportSummary>(v).ok())
        .unwrap_or_default();
    if summary.headline.trim().is_empty() {
        summary.headline = InspectionReportSummary::default().headline;
    }
    summary.code_violations_found = code_violations_found;
    summary.priority_issues = priority_issues;
    if summary.recommendations.is_empty() {
        summary.recommendations = professionals;
    }
    StageOutcome::complete(InspectionReport {
        report_markdown,
        report_summary_json: summary,
    })
}

pub struct DiagnosisReportAgent {
    model: StageModel,
}

impl DiagnosisReportAgent {
    pub fn new(model: StageModel) -> Self {
        Self { model }
    }

    fn user_message(
        property: Option<&PropertyIdentity>,
        diagnosis_summary: &str,
        scope: &DiagnosisRepairScope,
    ) -> Result<ChatMessage> {
        Ok(ChatMessage::user(format!(
            "Generate a maintenance diagnosis report.\n\n{}\nDiagnosis Summary:\n{}\n\nSummary:\n{}\n\nIssues:\n{}\n",
            property_block(property),
            diagnosis_summary,
            to_json(&scope.summary)?,
            to_json(&scope.issues_enriched)?,
        )))
    }

    pub async fn write(
        &self,
        diagnosis_id: &str,
        property: Option<&PropertyIdentity>,
        diagnosis_summary: &str,
        scope: &DiagnosisRepairScope,
    ) -> Result<StageOutcome<DiagnosisReport>> {
        let reply = self
            .model
            .call(
                diagnosis_id,
                Stage::Report,
                self.model.prompt().render(&[]),
                Self::user_message(property, diagnosis_summary, scope)?,
            )
            .await?;

        let outcome = interpret_diagnosis(&reply);
        log_outcome(diagnosis_id, outcome.degraded.as_ref());
        Ok(outcome)
    }
}

fn interpret_diagnosis(reply: &str) -> StageOutcome<DiagnosisReport> {
    let (report_markdown, synopsis) = match markdown_and_synopsis(reply) {
        Ok(parts) => parts,
        Err(reason) => {
            let report = DiagnosisReport {
                report_markdown: error_markdown(),
                report_summary_json: DiagnosisReportSummary {
                    headline: ERROR_HEADLINE.to_string(),
                    recommended_next_step: "Please try again".to_string(),
                },
            };
            return StageOutcome::degraded(report, reason);
        }
    };

    let defaults = DiagnosisReportSummary::default();
    let mut summary = synopsis
        .and_then(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .map(synopsis_from_map)
        .unwrap_or_default();
    if summary.headline.trim().is_empty() {
        summary.headline = defaults.headline;
    }
    if summary.recommended_next_step.trim().is_empty() {
        summary.recommended_next_step = defaults.recommended_next_step;
    }
    StageOutcome::complete(DiagnosisReport {
        report_markdown,
        report_summary_json: summary,
    })
}

fn synopsis_from_map(map: Map<String, Value>) -> DiagnosisReportSummary {
    let text = |key: &str| {
        map.get(key)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };
    DiagnosisReportSummary {
        headline: text("headline"),
        recommended_next_step: text("recommended_next_step"),
    }
}
