//! Records flowing through the maintenance-diagnosis pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{
    CodeCategory, PhotoReference, PhotoSubmission, PropertyContext, PropertyIdentity,
    RepairEstimate, Severity, StageWarning,
};

/// Inbound request for the diagnosis workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosisInput {
    #[serde(default)]
    pub diagnosis_id: Option<String>,
    #[serde(default)]
    pub photos: Vec<PhotoSubmission>,
    #[serde(default)]
    pub user_description: Option<String>,
    #[serde(default)]
    pub property_context: Option<PropertyContext>,
    #[serde(default)]
    pub property: Option<PropertyIdentity>,
}

/// Building system a diagnosed issue belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemCategory {
    Plumbing,
    Roof,
    Hvac,
    Electrical,
    Structure,
    Appliance,
    #[serde(other)]
    Other,
}

impl SystemCategory {
    pub const ALL: [SystemCategory; 7] = [
        SystemCategory::Plumbing,
        SystemCategory::Roof,
        SystemCategory::Hvac,
        SystemCategory::Electrical,
        SystemCategory::Structure,
        SystemCategory::Appliance,
        SystemCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SystemCategory::Plumbing => "plumbing",
            SystemCategory::Roof => "roof",
            SystemCategory::Hvac => "hvac",
            SystemCategory::Electrical => "electrical",
            SystemCategory::Structure => "structure",
            SystemCategory::Appliance => "appliance",
            SystemCategory::Other => "other",
        }
    }
}

/// One candidate cause inferred from the photos and description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisIssue {
    pub issue_label: String,
    pub system: SystemCategory,
    pub urgency: Severity,
    #[serde(default)]
    pub probable_cause: String,
    #[serde(default, deserialize_with = "crate::deserializers::de_confidence_forgiving")]
    pub confidence: f32,
    #[serde(default, deserialize_with = "crate::deserializers::de_bool_forgiving")]
    pub potential_code_violation: bool,
    #[serde(default)]
    pub code_category: CodeCategory,
    #[serde(default, deserialize_with = "crate::deserializers::de_option_text_forgiving")]
    pub compliance_recommendation: Option<String>,
}

/// Output of the diagnosis stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Diagnosis {
    pub diagnosis_summary: String,
    pub issues: Vec<DiagnosisIssue>,
}

/// A diagnosed issue plus its repair estimate and ordered steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisIssueEnriched {
    #[serde(flatten)]
    pub issue: DiagnosisIssue,
    #[serde(flatten)]
    pub repair: RepairEstimate,
}

/// Aggregate over all enriched diagnosis issues.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisSummary {
    pub overall_urgency: Severity,
    pub summary_cost_low: f64,
    pub summary_cost_high: f64,
}

/// Output of the enrichment stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisRepairScope {
    pub issues_enriched: Vec<DiagnosisIssueEnriched>,
    pub summary: DiagnosisSummary,
}

/// Short machine-readable synopsis of a diagnosis report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisReportSummary {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub recommended_next_step: String,
}

impl Default for DiagnosisReportSummary {
    fn default() -> Self {
        Self {
            headline: "Diagnosis complete".to_string(),
            recommended_next_step: "Review the report".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisReport {
    pub report_markdown: String,
    pub report_summary_json: DiagnosisReportSummary,
}

/// Final aggregate payload returned to the caller and pushed to the webhook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisPayload {
    pub diagnosis_id: String,
    pub report_markdown: String,
    pub report_summary_json: DiagnosisReportSummary,
    pub diagnosis_summary: String,
    pub issues_enriched: Vec<DiagnosisIssueEnriched>,
    pub summary: DiagnosisSummary,
    pub processed_photos: Vec<PhotoReference>,
    #[serde(default)]
    pub warnings: Vec<StageWarning>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisRejected {
    pub diagnosis_id: String,
    pub error: String,
}

/// What the diagnosis workflow hands back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DiagnosisResult {
    Completed(Box<DiagnosisPayload>),
    NoValidPhotos(DiagnosisRejected),
}

impl DiagnosisResult {
    pub fn diagnosis_id(&self) -> &str {
        match self {
            DiagnosisResult::Completed(payload) => &payload.diagnosis_id,
            DiagnosisResult::NoValidPhotos(rejected) => &rejected.diagnosis_id,
        }
    }

    pub fn payload(&self) -> Option<&DiagnosisPayload> {
        match self {
            DiagnosisResult::Completed(payload) => Some(payload),
            DiagnosisResult::NoValidPhotos(_) => None,
        }
    }
}
