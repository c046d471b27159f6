//! Typed records exchanged between pipeline stages.
//!
//! Each pipeline (inspection, diagnosis) has its own record family; the
//! shared pieces (photos, property metadata, severity scale, stage outcome
//! wrapper) live in `common`.

pub mod common;
pub mod diagnosis;
pub mod inspection;

pub use common::{
    BoundingBox, CodeCategory, NO_VALID_PHOTOS, PhotoReference, PhotoSubmission,
    PropertyContext, PropertyIdentity, RepairEstimate, Severity, Stage, StageOutcome,
    StageWarning,
};
pub use diagnosis::{
    Diagnosis, DiagnosisInput, DiagnosisIssue, DiagnosisIssueEnriched, DiagnosisPayload,
    DiagnosisRejected, DiagnosisRepairScope, DiagnosisReport, DiagnosisReportSummary,
    DiagnosisResult, DiagnosisSummary, SystemCategory,
};
pub use inspection::{
    InspectionInput, InspectionIssue, InspectionIssueEnriched, InspectionPayload,
    InspectionRejected, InspectionRepairScope, InspectionReport, InspectionReportSummary,
    InspectionResult, InspectionSummary, IssueType,
};
