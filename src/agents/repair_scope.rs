//! Repair-scope enrichment for both pipelines.
//!
//! The model returns one estimate per issue, echoing the issue's identifying
//! fields. Estimates are matched on those fields (position is the fallback),
//! normalized, and the summary is recomputed locally over every detected
//! issue; the model's own totals are only compared and logged.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{StageModel, extract_json, join_reasons};
use crate::aggregate::{self, rollup_severity, totals_disagree};
use crate::clients::ChatMessage;
use crate::error::Result;
use crate::schemas::{
    DiagnosisIssue, DiagnosisIssueEnriched, DiagnosisRepairScope, DiagnosisSummary,
    InspectionIssue, InspectionIssueEnriched, InspectionRepairScope, InspectionSummary,
    IssueType, PropertyContext, RepairEstimate, Stage, StageOutcome,
};

/// Reply parsed far enough to pair; `Err` carries the degradation reason.
fn estimate_items(reply: &str) -> std::result::Result<(Vec<Value>, Map<String, Value>), String> {
    let Some(mut object) = extract_json(reply) else {
        return Err("enrichment output was not valid JSON".to_string());
    };
    match object.remove("issues_enriched") {
        Some(Value::Array(items)) => Ok((items, object)),
        _ => Err("enrichment output had no issues_enriched list".to_string()),
    }
}

/// One estimate per detected issue, plus reasons to flag the result.
struct Paired<I> {
    pairs: Vec<(I, RepairEstimate)>,
    reasons: Vec<String>,
}

/// Recognises the issue an estimate was written for from the fields it echoes back.
trait EstimateTarget: Clone {
    /// `None` when the item carries none of the identifying fields.
    fn matches(&self, item: &Value) -> Option<bool>;
}

fn echoed_text<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

impl EstimateTarget for InspectionIssue {
    fn matches(&self, item: &Value) -> Option<bool> {
        let url = echoed_text(item, "image_url");
        let kind = echoed_text(item, "issue_type")
            .and_then(|k| serde_json::from_value::<IssueType>(Value::String(k.to_string())).ok());
        if url.is_none() && kind.is_none() {
            return None;
        }
        Some(
            url.is_none_or(|u| u == self.image_url.trim())
                && kind.is_none_or(|k| k == self.issue_type),
        )
    }
}

impl EstimateTarget for DiagnosisIssue {
    fn matches(&self, item: &Value) -> Option<bool> {
        echoed_text(item, "issue_label")
            .map(|label| label.eq_ignore_ascii_case(self.issue_label.trim()))
    }
}

/// Slot state per detected issue.
#[derive(Clone)]
enum Slot {
    Open,
    Filled(RepairEstimate),
    Unusable,
}

/// Attach estimates to issues: echoed identifiers first, position as the fallback.
///
/// Every detected issue comes back exactly once; issues without a usable
/// estimate get a zero-cost placeholder and a reason is recorded.
fn pair_estimates<I: EstimateTarget>(issues: &[I], items: &[Value]) -> Paired<I> {
    let mut reasons = Vec::new();
    if items.len() != issues.len() {
        reasons.push(format!(
            "model returned {} estimate(s) for {} issue(s)",
            items.len(),
            issues.len()
        ));
    }

    let mut slots = vec![Slot::Open; issues.len()];
    let mut unmatched = 0;
    let mut reordered = 0;
    let mut malformed = 0;

    let fill = |slot: &mut Slot, item: &Value, malformed: &mut usize| {
        *slot = match serde_json::from_value::<RepairEstimate>(item.clone()) {
            Ok(estimate) => Slot::Filled(estimate.normalized()),
            Err(e) => {
                debug!("unusable estimate: {}", e);
                *malformed += 1;
                Slot::Unusable
            }
        };
    };

    let mut anonymous = Vec::new();
    for (position, item) in items.iter().enumerate() {
        let verdicts: Vec<Option<bool>> = issues.iter().map(|i| i.matches(item)).collect();
        if verdicts.iter().all(Option::is_none) {
            anonymous.push(position);
            continue;
        }
        let is_open = |idx: usize| matches!(slots[idx], Slot::Open);
        let target = if verdicts.get(position) == Some(&Some(true)) && is_open(position) {
            Some(position)
        } else {
            (0..issues.len()).find(|&idx| verdicts[idx] == Some(true) && is_open(idx))
        };
        match target {
            Some(idx) => {
                if idx != position {
                    reordered += 1;
                }
                fill(&mut slots[idx], item, &mut malformed);
            }
            None => unmatched += 1,
        }
    }
    for position in anonymous {
        match slots.get_mut(position) {
            Some(slot) if matches!(slot, Slot::Open) => {
                fill(slot, &items[position], &mut malformed)
            }
            _ => unmatched += 1,
        }
    }

    if reordered > 0 {
        reasons.push(format!("{} estimate(s) matched out of order", reordered));
    }
    if unmatched > 0 {
        reasons.push(format!("{} estimate(s) matched no detected issue", unmatched));
    }
    if malformed > 0 {
        reasons.push(format!("{} malformed estimate(s) replaced with zero cost", malformed));
    }
    let missing = slots.iter().filter(|s| matches!(s, Slot::Open)).count();
    if missing > 0 {
        reasons.push(format!("{} issue(s) had no estimate, costs left at zero", missing));
    }

    let pairs = issues
        .iter()
        .cloned()
        .zip(slots)
        .map(|(issue, slot)| match slot {
            Slot::Filled(estimate) => (issue, estimate),
            Slot::Open | Slot::Unusable => (issue, RepairEstimate::default()),
        })
        .collect();
    Paired { pairs, reasons }
}

/// Log when the model's own totals differ from ours.
fn compare_model_totals(correlation_id: &str, rest: &Map<String, Value>, low: f64, high: f64) {
    let Some(summary) = rest.get("summary") else {
        return;
    };
    let reported_low = summary.get("summary_cost_low").and_then(Value::as_f64);
    let reported_high = summary.get("summary_cost_high").and_then(Value::as_f64);
    if let (Some(rl), Some(rh)) = (reported_low, reported_high)
        && (totals_disagree(rl, low) || totals_disagree(rh, high))
    {
        debug!(
            correlation_id,
            reported_low = rl,
            reported_high = rh,
            computed_low = low,
            computed_high = high,
            "model summary disagrees with recomputed totals"
        );
    }
}

fn user_message<T: Serialize>(
    kind: &str,
    issues: &[T],
    context: Option<&PropertyContext>,
) -> Result<ChatMessage> {
    let mut text = String::new();
    if let Some(ctx) = context {
        let described = ctx.describe();
        if !described.is_empty() {
            text.push_str(&described);
            text.push_str("\n\n");
        }
    }
    text.push_str(&format!(
        "Provide repair recommendations for these {} {} issues, in the same order:\n\n",
        issues.len(),
        kind
    ));
    for (n, issue) in issues.iter().enumerate() {
        text.push_str(&format!(
            "Issue {}:\n{}\n\n",
            n + 1,
            serde_json::to_string_pretty(issue)?
        ));
    }
    Ok(ChatMessage::user(text.trim_end().to_string()))
}

fn log_outcome(correlation_id: &str, enriched: usize, degraded: Option<&String>) {
    match degraded {
        Some(reason) => warn!(
            correlation_id,
            stage = "enrich",
            enriched,
            "enrichment degraded: {}",
            reason
        ),
        None => info!(correlation_id, stage = "enrich", enriched, "enrichment finished"),
    }
}

pub struct InspectionRepairScopeAgent {
    model: StageModel,
}

impl InspectionRepairScopeAgent {
    pub fn new(model: StageModel) -> Self {
        Self { model }
    }

    /// Enrich `issues`; an empty list returns a zero summary without calling the model.
    pub async fn enrich(
        &self,
        inspection_id: &str,
        issues: &[InspectionIssue],
        context: Option<&PropertyContext>,
    ) -> Result<StageOutcome<InspectionRepairScope>> {
        if issues.is_empty() {
            return Ok(StageOutcome::complete(InspectionRepairScope::default()));
        }

        let reply = self
            .model
            .call(
                inspection_id,
                Stage::Enrich,
                self.model.prompt().render(&[]),
                user_message("inspection", issues, context)?,
            )
            .await?;

        let outcome = interpret_inspection(inspection_id, &reply, issues);
        log_outcome(
            inspection_id,
            outcome.value.issues_enriched.len(),
            outcome.degraded.as_ref(),
        );
        Ok(outcome)
    }
}

fn interpret_inspection(
    inspection_id: &str,
    reply: &str,
    issues: &[InspectionIssue],
) -> StageOutcome<InspectionRepairScope> {
    let (items, rest) = match estimate_items(reply) {
        Ok(parsed) => parsed,
        Err(reason) => {
            let fallback = InspectionRepairScope {
                issues_enriched: Vec::new(),
                summary: InspectionSummary {
                    issue_count: issues.len(),
                    summary_severity: rollup_severity(issues.iter().map(|i| i.severity)),
                    summary_cost_low: 0.0,
                    summary_cost_high: 0.0,
                },
            };
            return StageOutcome::degraded(fallback, reason);
        }
    };

    let Paired { pairs, reasons } = pair_estimates(issues, &items);
    let issues_enriched: Vec<InspectionIssueEnriched> = pairs
        .into_iter()
        .map(|(issue, repair)| InspectionIssueEnriched { issue, repair })
        .collect();
    let summary = aggregate::inspection_summary(&issues_enriched);
    compare_model_totals(
        inspection_id,
        &rest,
        summary.summary_cost_low,
        summary.summary_cost_high,
    );
    StageOutcome {
        value: InspectionRepairScope {
            issues_enriched,
            summary,
        },
        degraded: join_reasons(reasons),
    }
}

pub struct DiagnosisRepairScopeAgent {
    model: StageModel,
}

impl DiagnosisRepairScopeAgent {
    pub fn new(model: StageModel) -> Self {
        Self { model }
    }

    pub async fn enrich(
        &self,
        diagnosis_id: &str,
        issues: &[DiagnosisIssue],
        context: Option<&PropertyContext>,
    ) -> Result<StageOutcome<DiagnosisRepairScope>> {
        if issues.is_empty() {
            return Ok(StageOutcome::complete(DiagnosisRepairScope::default()));
        }

        let reply = self
            .model
            .call(
                diagnosis_id,
                Stage::Enrich,
                self.model.prompt().render(&[]),
                user_message("diagnosed", issues, context)?,
            )
            .await?;

        let outcome = interpret_diagnosis(diagnosis_id, &reply, issues);
        log_outcome(
            diagnosis_id,
            outcome.value.issues_enriched.len(),
            outcome.degraded.as_ref(),
        );
        Ok(outcome)
    }
}

fn interpret_diagnosis(
    diagnosis_id: &str,
    reply: &str,
    issues: &[DiagnosisIssue],
) -> StageOutcome<DiagnosisRepairScope> {
    let (items, rest) = match estimate_items(reply) {
        Ok(parsed) => parsed,
        Err(reason) => {
            let fallback = DiagnosisRepairScope {
                issues_enriched: Vec::new(),
                summary: DiagnosisSummary {
                    overall_urgency: rollup_severity(issues.iter().map(|i| i.urgency)),
                    summary_cost_low: 0.0,
                    summary_cost_high: 0.0,
                },
            };
            return StageOutcome::degraded(fallback, reason);
        }
    };

    let Paired { pairs, reasons } = pair_estimates(issues, &items);
    let issues_enriched: Vec<DiagnosisIssueEnriched> = pairs
        .into_iter()
        .map(|(issue, repair)| DiagnosisIssueEnriched { issue, repair })
        .collect();
    let summary = aggregate::diagnosis_summary(&issues_enriched);
    compare_model_totals(
        diagnosis_id,
        &rest,
        summary.summary_cost_low,
        summary.summary_cost_high,
    );
    StageOutcome {
        value: DiagnosisRepairScope {
            issues_enriched,
            summary,
        },
        degraded: join_reasons(reasons),
    }
}
