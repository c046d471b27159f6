//! Records flowing through the inspection-analysis pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{
    BoundingBox, CodeCategory, PhotoReference, PhotoSubmission, PropertyContext,
    PropertyIdentity, RepairEstimate, Severity, StageWarning,
};

/// Inbound request for the inspection workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InspectionInput {
    #[serde(default)]
    pub inspection_id: Option<String>,
    #[serde(default)]
    pub photos: Vec<PhotoSubmission>,
    #[serde(default)]
    pub property_context: Option<PropertyContext>,
    #[serde(default)]
    pub property: Option<PropertyIdentity>,
}

/// Closed vocabulary of visible issues the vision stage may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Scratch,
    Stain,
    Crack,
    Dent,
    Hole,
    WaterDamage,
    MoldSigns,
    BrokenFixture,
    FlooringDamage,
    ElectricalViolation,
    PlumbingViolation,
    SafetyViolation,
    StructuralViolation,
    FireSafetyViolation,
    VentilationIssue,
    #[serde(other)]
    Other,
}

impl IssueType {
    pub const ALL: [IssueType; 16] = [
        IssueType::Scratch,
        IssueType::Stain,
        IssueType::Crack,
        IssueType::Dent,
        IssueType::Hole,
        IssueType::WaterDamage,
        IssueType::MoldSigns,
        IssueType::BrokenFixture,
        IssueType::FlooringDamage,
        IssueType::ElectricalViolation,
        IssueType::PlumbingViolation,
        IssueType::SafetyViolation,
        IssueType::StructuralViolation,
        IssueType::FireSafetyViolation,
        IssueType::VentilationIssue,
        IssueType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Scratch => "scratch",
            IssueType::Stain => "stain",
            IssueType::Crack => "crack",
            IssueType::Dent => "dent",
            IssueType::Hole => "hole",
            IssueType::WaterDamage => "water_damage",
            IssueType::MoldSigns => "mold_signs",
            IssueType::BrokenFixture => "broken_fixture",
            IssueType::FlooringDamage => "flooring_damage",
            IssueType::ElectricalViolation => "electrical_violation",
            IssueType::PlumbingViolation => "plumbing_violation",
            IssueType::SafetyViolation => "safety_violation",
            IssueType::StructuralViolation => "structural_violation",
            IssueType::FireSafetyViolation => "fire_safety_violation",
            IssueType::VentilationIssue => "ventilation_issue",
            IssueType::Other => "other",
        }
    }
}

/// One visible issue detected in one photo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectionIssue {
    pub image_url: String,
    #[serde(default, deserialize_with = "crate::deserializers::de_option_text_forgiving")]
    pub room_name: Option<String>,
    pub issue_type: IssueType,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    #[serde(default, deserialize_with = "crate::deserializers::de_confidence_forgiving")]
    pub confidence: f32,
    #[serde(default, deserialize_with = "crate::deserializers::de_bool_forgiving")]
    pub potential_code_violation: bool,
    #[serde(default)]
    pub code_category: CodeCategory,
    #[serde(default, deserialize_with = "crate::deserializers::de_option_text_forgiving")]
    pub compliance_note: Option<String>,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
}

/// A detected issue plus its repair estimate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectionIssueEnriched {
    #[serde(flatten)]
    pub issue: InspectionIssue,
    #[serde(flatten)]
    pub repair: RepairEstimate,
}

/// Aggregate over all enriched inspection issues.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InspectionSummary {
    pub issue_count: usize,
    pub summary_severity: Severity,
    pub summary_cost_low: f64,
    pub summary_cost_high: f64,
}

/// Output of the enrichment stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InspectionRepairScope {
    pub issues_enriched: Vec<InspectionIssueEnriched>,
    pub summary: InspectionSummary,
}

/// Short machine-readable synopsis of an inspection report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectionReportSummary {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub code_violations_found: usize,
    #[serde(default)]
    pub priority_issues: usize,
    #[serde(default, deserialize_with = "crate::deserializers::de_string_list_forgiving")]
    pub recommendations: Vec<String>,
}

impl Default for InspectionReportSummary {
    fn default() -> Self {
        Self {
            headline: "Inspection complete".to_string(),
            code_violations_found: 0,
            priority_issues: 0,
            recommendations: Vec::new(),
        }
    }
}

/// Narrative document plus synopsis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectionReport {
    pub report_markdown: String,
    pub report_summary_json: InspectionReportSummary,
}

/// Final aggregate payload returned to the caller and pushed to the webhook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectionPayload {
    pub inspection_id: String,
    pub report_markdown: String,
    pub report_summary_json: InspectionReportSummary,
    pub issues_enriched: Vec<InspectionIssueEnriched>,
    pub summary: InspectionSummary,
    pub processed_photos: Vec<PhotoReference>,
    #[serde(default)]
    pub warnings: Vec<StageWarning>,
    pub completed_at: DateTime<Utc>,
}

/// Early-exit payload when no submitted photo had a usable URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectionRejected {
    pub inspection_id: String,
    pub error: String,
}

/// What the inspection workflow hands back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum InspectionResult {
    Completed(Box<InspectionPayload>),
    NoValidPhotos(InspectionRejected),
}

impl InspectionResult {
    pub fn inspection_id(&self) -> &str {
        match self {
            InspectionResult::Completed(payload) => &payload.inspection_id,
            InspectionResult::NoValidPhotos(rejected) => &rejected.inspection_id,
        }
    }

    pub fn payload(&self) -> Option<&InspectionPayload> {
        match self {
            InspectionResult::Completed(payload) => Some(payload),
            InspectionResult::NoValidPhotos(_) => None,
        }
    }
}
