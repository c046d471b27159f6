//! Versioned instruction templates for the pipeline stages.
//!
//! Every template carries a stable id and a SHA-1 checksum of its text so a
//! logged completion call can be traced back to the exact instruction that
//! produced it. Templates use `{{name}}` placeholders filled by [`Prompt::render`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{PipelineError, Result};

pub const INSPECTION_VISION: &str = "inspection-vision-v1";
pub const MAINTENANCE_DIAGNOSIS: &str = "maintenance-diagnosis-v1";
pub const INSPECTION_REPAIR_SCOPE: &str = "inspection-repair-scope-v1";
pub const DIAGNOSIS_REPAIR_SCOPE: &str = "diagnosis-repair-scope-v1";
pub const INSPECTION_REPORT: &str = "inspection-report-v1";
pub const DIAGNOSIS_REPORT: &str = "diagnosis-report-v1";

/// Core prompt definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    /// Stable identifier (format: pipeline-stage-vN)
    pub id: String,
    /// Short one-liner description
    pub one_liner: String,
    pub version: String,
    /// SHA1 checksum of the template text
    pub checksum: String,
    /// Template text
    pub template: String,
}

impl Prompt {
    pub fn new(
        id: impl Into<String>,
        one_liner: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        let template = template.into();
        let checksum = sha1_checksum(&template);
        Self {
            id: id.into(),
            one_liner: one_liner.into(),
            version: "1.0.0".to_string(),
            checksum,
            template,
        }
    }

    /// Substitute `{{key}}` placeholders; unknown placeholders are left in place.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut out = self.template.clone();
        for (key, value) in vars {
            out = out.replace(&format!("{{{{{}}}}}", key), value);
        }
        out
    }
}

/// Generate a SHA1 checksum of prompt content
fn sha1_checksum(content: &str) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Registry of all known prompts
#[derive(Debug, Default)]
pub struct PromptRegistry {
    prompts: HashMap<String, Arc<Prompt>>,
}

impl PromptRegistry {
    /// Create new registry with the pipeline prompts
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.register_core_prompts();
        registry
    }

    pub fn register(&mut self, prompt: Prompt) {
        self.prompts.insert(prompt.id.clone(), Arc::new(prompt));
    }

    pub fn get(&self, id: &str) -> Option<Arc<Prompt>> {
        self.prompts.get(id).cloned()
    }

    /// Like [`get`](Self::get) but a missing id is a configuration error.
    pub fn require(&self, id: &str) -> Result<Arc<Prompt>> {
        self.get(id).ok_or_else(|| PipelineError::Config {
            message: format!("prompt '{}' is not registered", id),
        })
    }

    pub fn list(&self) -> Vec<Arc<Prompt>> {
        let mut all: Vec<_> = self.prompts.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    fn register_core_prompts(&mut self) {
        self.register(Prompt::new(
            INSPECTION_VISION,
            "Detect visible damage and code concerns in property photos",
            VISION_TEMPLATE,
        ));
        self.register(Prompt::new(
            MAINTENANCE_DIAGNOSIS,
            "Infer likely causes of a maintenance problem from photos and a description",
            DIAGNOSIS_TEMPLATE,
        ));
        self.register(Prompt::new(
            INSPECTION_REPAIR_SCOPE,
            "Attach repair action, trade, cost and time estimates to inspection issues",
            INSPECTION_REPAIR_TEMPLATE,
        ));
        self.register(Prompt::new(
            DIAGNOSIS_REPAIR_SCOPE,
            "Attach repair steps, trade, cost and time estimates to diagnosed issues",
            DIAGNOSIS_REPAIR_TEMPLATE,
        ));
        self.register(Prompt::new(
            INSPECTION_REPORT,
            "Write the inspection report document and synopsis",
            INSPECTION_REPORT_TEMPLATE,
        ));
        self.register(Prompt::new(
            DIAGNOSIS_REPORT,
            "Write the maintenance diagnosis document and synopsis",
            DIAGNOSIS_REPORT_TEMPLATE,
        ));
    }
}

const VISION_TEMPLATE: &str = r#"You are the Inspection Vision Agent. Users provide photos of interior residential spaces. Your job is to identify visible property damage, condition issues, AND potential building code violations that a landlord, tenant, homeowner, or inspector would care about.

For EACH image, detect:
- Property damage: scratches, chips, cracks, holes, stains, dents, water damage indications, mold signs, broken fixtures, damaged trim or doors, visible flooring damage
- Code violations: safety hazards, electrical issues, plumbing problems, structural concerns, fire safety violations

COMMON BUILDING CODE VIOLATIONS TO CHECK:
- ELECTRICAL: exposed wiring, overloaded outlets, missing GFCI outlets in bathrooms/kitchens, improper junction boxes, damaged electrical panels
- PLUMBING: visible leaks, improper drainage, missing shut-off valves, cross-connections, non-code fixtures
- SAFETY: missing smoke detectors, blocked exits, unsafe railings/stairs, broken windows, inadequate lighting
- STRUCTURAL: cracks in load-bearing walls, foundation issues, sagging floors/ceilings, damaged support beams
- FIRE SAFETY: blocked fire exits, missing fire extinguishers, improper storage near heat sources
- VENTILATION: blocked vents, missing exhaust fans in bathrooms, inadequate air circulation

For each issue, provide:
- issue_type: one of [{{issue_types}}]
- description: short, plain English explanation
- severity: "low", "medium", "high", or "critical"
- confidence: 0-1 (decimal)
- potential_code_violation: true/false
- code_category: "electrical", "plumbing", "safety", "structural", "fire_safety", "ventilation", "none"
- compliance_note: brief explanation if potential_code_violation is true, null otherwise
- bounding_box: {"x","y","w","h"} if available; otherwise null

If there are no obvious issues in an image, simply do not add any items for that image. Do not invent problems.

IMPORTANT DISCLAIMER: This analysis provides general building code guidance only. Local building codes vary significantly by jurisdiction. This is not a substitute for professional inspection or official code compliance verification.

Output a single JSON object with this structure:
{
  "issues": [
    {
      "image_url": "string (exactly as given)",
      "room_name": "string or null",
      "issue_type": "string",
      "description": "string",
      "severity": "string",
      "confidence": number,
      "potential_code_violation": boolean,
      "code_category": "string",
      "compliance_note": "string or null",
      "bounding_box": null
    }
  ]
}

No extra commentary. Only valid JSON.{{region_guidance}}"#;

const DIAGNOSIS_TEMPLATE: &str = r#"You are the Maintenance Diagnosis Agent. Users upload photos and an optional description of a home problem. Identify the most likely underlying issue(s) visible in the images, combined with the description, AND assess potential building code violations.

For each issue, determine:
- issue_label (short phrase, e.g. "ceiling leak", "possible mold", "damaged drywall")
- system (one of: {{systems}})
- urgency ("low", "medium", "high", "critical")
- probable_cause (short explanation in plain English)
- confidence (0-1)
- potential_code_violation (true/false)
- code_category ("electrical", "plumbing", "safety", "structural", "fire_safety", "ventilation", "none")
- compliance_recommendation (brief guidance if a code violation is suspected, null otherwise)

Produce a diagnosis_summary in a single short paragraph that includes both the maintenance issue and any code compliance concerns.

Be honest about uncertainty; if multiple causes are plausible, mention the most likely and briefly note alternatives. If nothing is wrong, return an empty issues list and say so.

IMPORTANT DISCLAIMER: Building code guidance is general only. Local codes vary by jurisdiction.

Output only valid JSON with this structure:
{
  "diagnosis_summary": "string (1-3 sentences including code considerations)",
  "issues": [
    {
      "issue_label": "string",
      "system": "string",
      "urgency": "string",
      "probable_cause": "string",
      "confidence": number,
      "potential_code_violation": boolean,
      "code_category": "string",
      "compliance_recommendation": "string or null"
    }
  ]
}{{region_guidance}}"#;

const INSPECTION_REPAIR_TEMPLATE: &str = r#"You are the Repair Scope Agent for inspections. You receive a numbered list of issues detected by the vision system (Issue 1, Issue 2, ...), each as a JSON object.

Return exactly one entry per issue, in the SAME ORDER as given, and copy each issue's image_url and issue_type into its entry unchanged. For each issue recommend:
- A practical action to address it
- Whether it is realistically DIY or should involve a professional
- The most appropriate trade (e.g. "painter", "plumber", "handyman", "flooring")
- A reasonable cost range in USD and time estimate in hours for a typical U.S. market
- Materials for small DIY fixes when DIY is possible

Then compute a summary containing issue_count, summary_severity (highest severity), and summary_cost_low / summary_cost_high (sum of all issue cost ranges).

Use conservative but realistic estimates. cost_low must not exceed cost_high.

Output ONLY valid JSON with this structure:
{
  "issues_enriched": [
    {
      "image_url": "string",
      "issue_type": "string",
      "recommended_action": "string",
      "recommended_trade": "string",
      "diy_possible": boolean,
      "cost_low": number,
      "cost_high": number,
      "time_hours": number,
      "materials_list": ["string"],
      "safety_warnings": "string or null"
    }
  ],
  "summary": {
    "issue_count": number,
    "summary_severity": "string",
    "summary_cost_low": number,
    "summary_cost_high": number
  }
}"#;

const DIAGNOSIS_REPAIR_TEMPLATE: &str = r#"You are the Repair Scope Agent for maintenance diagnoses. You receive a numbered list of high-level issues (Issue 1, Issue 2, ...) such as "ceiling leak" or "possible mold" along with system and urgency, each as a JSON object.

Return exactly one entry per issue, in the SAME ORDER as given, and copy each issue's issue_label into its entry unchanged. For each issue decide:
- Whether DIY is realistically safe and feasible
- The appropriate trade (plumber, roofer, electrician, hvac, handyman, etc.)
- Estimated cost range in USD and time in hours for a typical U.S. household
- Any necessary safety warnings
- A short, practical list of steps the user should take next, in order

Then compute a summary with overall_urgency (the highest urgency) and summary_cost_low / summary_cost_high (sum of all issue costs).

Keep language simple and reassuring. cost_low must not exceed cost_high.

Output valid JSON with this structure:
{
  "issues_enriched": [
    {
      "issue_label": "string",
      "recommended_action": "string",
      "diy_possible": boolean,
      "recommended_trade": "string",
      "cost_low": number,
      "cost_high": number,
      "time_hours": number,
      "materials_list": ["string"],
      "safety_warnings": "string or null",
      "steps": ["string", "string"]
    }
  ],
  "summary": {
    "overall_urgency": "string",
    "summary_cost_low": number,
    "summary_cost_high": number
  }
}"#;

const INSPECTION_REPORT_TEMPLATE: &str = r#"You are the Inspection Report Agent. Turn the provided property info, enriched issues, and summary into:

1. A clear markdown report body suitable for PDF export
2. A short machine-readable summary JSON

Markdown structure MUST include:
## Inspection Report
### Property Details
### Executive Summary (issues count, overall severity, cost range, code compliance overview)
### Code Compliance Assessment (separate section for potential violations)
### Room-by-Room Details (group issues by room_name where possible)
### Priority Action Items (urgent safety/code issues first)
### Recommended Next Steps (clear bullet list including professional consultations)
### Important Disclaimers

If there are no issues, say plainly that no issues were found and keep the report short.

PRIORITY SYSTEM:
1. Critical safety/code violations (immediate attention)
2. High-priority maintenance issues
3. Medium-priority repairs
4. Low-priority cosmetic issues

Use a friendly, consumer-focused tone and simple language. Avoid legal advice. Always state that building code guidance is general, varies by jurisdiction, and is not a substitute for an official inspection.

Output valid JSON with this structure:
{
  "report_markdown": "string (full markdown content)",
  "report_summary_json": {
    "headline": "string (one sentence summary)",
    "code_violations_found": number,
    "priority_issues": number,
    "recommendations": ["string", "string"]
  }
}"#;

const DIAGNOSIS_REPORT_TEMPLATE: &str = r#"You are the Maintenance Diagnosis Report Agent. Generate a friendly, consumer-focused markdown report that:

- Summarizes what the issue most likely is
- Explains how urgent it is
- Gives clear, practical next steps
- Includes estimated cost and time

Structure:
## Maintenance Diagnosis
### Summary (1-3 short paragraphs)
### What We Think Is Happening
### How Urgent Is It?
### Recommended Next Steps (bullets)
### Estimated Cost & Time
### Safety Notes if any

Avoid legal or insurance advice.

Output JSON with this structure:
{
  "report_markdown": "string (full markdown content)",
  "report_summary_json": {
    "headline": "string (one sentence)",
    "recommended_next_step": "string (one sentence)"
  }
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_every_stage_prompt() {
        let registry = PromptRegistry::new();
        for id in [
            INSPECTION_VISION,
            MAINTENANCE_DIAGNOSIS,
            INSPECTION_REPAIR_SCOPE,
            DIAGNOSIS_REPAIR_SCOPE,
            INSPECTION_REPORT,
            DIAGNOSIS_REPORT,
        ] {
            let prompt = registry.require(id).unwrap();
            assert_eq!(prompt.checksum.len(), 40);
        }
        assert_eq!(registry.list().len(), 6);
        assert!(registry.require("nope-v9").is_err());
    }

    #[test]
    fn render_fills_placeholders() {
        let p = Prompt::new("t-v1", "test", "a={{a}} b={{b}} c={{c}}");
        assert_eq!(p.render(&[("a", "1"), ("b", "")]), "a=1 b= c={{c}}");
    }

    #[test]
    fn checksum_tracks_template_text() {
        let a = Prompt::new("x", "x", "same");
        let b = Prompt::new("y", "y", "same");
        let c = Prompt::new("x", "x", "different");
        assert_eq!(a.checksum, b.checksum);
        assert_ne!(a.checksum, c.checksum);
    }
}
