//! Local rollups over enriched issues.
//!
//! The enrichment model is asked to produce a summary too, but the totals
//! reported to callers are always recomputed here from the per-issue records.

use crate::schemas::{
    DiagnosisIssueEnriched, DiagnosisSummary, InspectionIssueEnriched, InspectionSummary,
    RepairEstimate, Severity,
};

/// Differences smaller than a cent are not worth reporting.
const COST_TOLERANCE: f64 = 0.01;

/// Highest severity in `levels`, `Low` when empty.
pub fn rollup_severity<I>(levels: I) -> Severity
where
    I: IntoIterator<Item = Severity>,
{
    levels.into_iter().max().unwrap_or_default()
}

/// Summed `(cost_low, cost_high)` over a set of repair estimates.
pub fn sum_costs<'a, I>(estimates: I) -> (f64, f64)
where
    I: IntoIterator<Item = &'a RepairEstimate>,
{
    estimates
        .into_iter()
        .fold((0.0, 0.0), |(low, high), est| {
            (low + est.cost_low, high + est.cost_high)
        })
}

pub fn inspection_summary(issues: &[InspectionIssueEnriched]) -> InspectionSummary {
    let (low, high) = sum_costs(issues.iter().map(|i| &i.repair));
    InspectionSummary {
        issue_count: issues.len(),
        summary_severity: rollup_severity(issues.iter().map(|i| i.issue.severity)),
        summary_cost_low: low,
        summary_cost_high: high,
    }
}

pub fn diagnosis_summary(issues: &[DiagnosisIssueEnriched]) -> DiagnosisSummary {
    let (low, high) = sum_costs(issues.iter().map(|i| &i.repair));
    DiagnosisSummary {
        overall_urgency: rollup_severity(issues.iter().map(|i| i.issue.urgency)),
        summary_cost_low: low,
        summary_cost_high: high,
    }
}

/// True when a model-reported total is off from the recomputed one.
pub fn totals_disagree(reported: f64, computed: f64) -> bool {
    (reported - computed).abs() > COST_TOLERANCE
}
