//! Static building-code reference data.
//!
//! Region guidance is injected into detection-stage instructions only; it is
//! never part of the structured output.

use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap};

use crate::schemas::{CodeCategory, IssueType};

static REGION_GUIDANCE: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("AL", "Alabama requires smoke detectors in bedrooms. GFCI outlets in wet locations. Hurricane preparedness in coastal areas."),
        ("AK", "Alaska has extreme weather building requirements. Proper insulation critical. Heating system safety paramount."),
        ("AZ", "Arizona requires energy-efficient construction. Proper ventilation for desert climate. Electrical safety in high-heat conditions."),
        ("AR", "Arkansas requires smoke detectors on every level. GFCI protection in wet areas. Tornado-resistant construction considerations."),
        ("CA", "California requires GFCI outlets in all bathrooms, kitchens, and outdoor areas. Seismic safety standards apply. Energy efficiency codes are strict. Professional permits required for most work."),
        ("CO", "Colorado has high-altitude building considerations. Proper ventilation critical. Snow load requirements for roofing."),
        ("CT", "Connecticut requires smoke and CO detectors. GFCI protection mandatory. Energy efficiency standards enforced."),
        ("DE", "Delaware requires smoke detectors in bedrooms. GFCI outlets in wet locations. Coastal building considerations."),
        ("FL", "Florida has strict hurricane codes - impact-resistant windows, reinforced roofing. GFCI outlets required in bathrooms, kitchens, garages. Mold prevention is critical due to humidity."),
        ("GA", "Georgia requires smoke detectors in bedrooms and hallways. GFCI protection in wet areas. Termite inspection considerations."),
        ("HI", "Hawaii has tropical climate building requirements. Hurricane/typhoon resistance. Proper ventilation for humidity control."),
        ("ID", "Idaho requires smoke detectors on every level. GFCI outlets in wet locations. Seismic considerations in some areas."),
        ("IL", "Illinois requires smoke detectors on every level and in bedrooms. GFCI outlets in bathrooms and kitchens. Carbon monoxide detectors required near sleeping areas."),
        ("IN", "Indiana requires smoke detectors in bedrooms. GFCI protection in wet areas. Tornado-resistant construction considerations."),
        ("IA", "Iowa requires smoke detectors on every level. GFCI outlets in wet locations. Severe weather building considerations."),
        ("KS", "Kansas requires smoke detectors in bedrooms. GFCI protection mandatory. Tornado-resistant construction important."),
        ("KY", "Kentucky requires smoke detectors on every level. GFCI outlets in wet areas. Radon testing considerations."),
        ("LA", "Louisiana has hurricane building codes. GFCI protection required. Flood-resistant construction in flood zones."),
        ("ME", "Maine requires smoke and CO detectors. GFCI protection in wet areas. Cold weather building considerations."),
        ("MD", "Maryland requires smoke detectors in bedrooms. GFCI outlets mandatory. Radon testing may be required."),
        ("MA", "Massachusetts requires smoke and CO detectors. GFCI protection mandatory. Energy efficiency codes enforced."),
        ("MI", "Michigan requires smoke detectors on every level. GFCI protection in bathrooms, kitchens, and basements. Carbon monoxide detectors required."),
        ("MN", "Minnesota requires smoke detectors on every level. GFCI outlets in wet locations. Cold weather building standards."),
        ("MS", "Mississippi requires smoke detectors in bedrooms. GFCI protection in wet areas. Hurricane preparedness in coastal areas."),
        ("MO", "Missouri requires smoke detectors on every level. GFCI outlets in wet locations. Tornado-resistant construction considerations."),
        ("MT", "Montana requires smoke detectors on every level. GFCI protection mandatory. Cold weather and seismic considerations."),
        ("NE", "Nebraska requires smoke detectors in bedrooms. GFCI outlets in wet areas. Severe weather building considerations."),
        ("NV", "Nevada requires smoke detectors on every level. GFCI protection mandatory. Desert climate building considerations."),
        ("NH", "New Hampshire requires smoke and CO detectors. GFCI protection in wet areas. Cold weather building standards."),
        ("NJ", "New Jersey requires smoke detectors in bedrooms. GFCI outlets mandatory. Radon testing considerations."),
        ("NM", "New Mexico requires smoke detectors on every level. GFCI protection in wet areas. Desert climate considerations."),
        ("NY", "New York requires smoke and carbon monoxide detectors. GFCI protection in bathrooms, kitchens, basements. Lead paint disclosure required for pre-1978 buildings."),
        ("NC", "North Carolina requires smoke detectors in all bedrooms. GFCI outlets in bathrooms and kitchens. Hurricane preparedness in coastal areas."),
        ("ND", "North Dakota requires smoke detectors on every level. GFCI protection mandatory. Extreme cold weather building standards."),
        ("OH", "Ohio requires smoke detectors on every level and in bedrooms. GFCI outlets in bathrooms, kitchens, and basements."),
        ("OK", "Oklahoma requires smoke detectors in bedrooms. GFCI protection in wet areas. Tornado-resistant construction critical."),
        ("OR", "Oregon requires smoke detectors on every level. GFCI protection mandatory. Seismic building codes enforced."),
        ("PA", "Pennsylvania requires smoke detectors in bedrooms and hallways. GFCI protection in wet locations. Radon testing may be required."),
        ("RI", "Rhode Island requires smoke and CO detectors. GFCI protection mandatory. Coastal building considerations."),
        ("SC", "South Carolina requires smoke detectors in bedrooms. GFCI outlets in wet areas. Hurricane preparedness in coastal areas."),
        ("SD", "South Dakota requires smoke detectors on every level. GFCI protection in wet areas. Severe weather considerations."),
        ("TN", "Tennessee requires smoke detectors in bedrooms. GFCI protection mandatory. Tornado-resistant construction considerations."),
        ("TX", "Texas requires smoke detectors in all bedrooms and hallways. GFCI protection required in bathrooms and kitchens. Hurricane-resistant features may be required in coastal areas."),
        ("UT", "Utah requires smoke detectors on every level. GFCI outlets in wet locations. Seismic building considerations."),
        ("VT", "Vermont requires smoke and CO detectors. GFCI protection mandatory. Cold weather building standards."),
        ("VA", "Virginia requires smoke detectors in bedrooms. GFCI outlets in wet areas. Hurricane preparedness in coastal areas."),
        ("WA", "Washington requires smoke detectors on every level. GFCI protection mandatory. Seismic building codes enforced."),
        ("WV", "West Virginia requires smoke detectors in bedrooms. GFCI protection in wet areas. Radon testing considerations."),
        ("WI", "Wisconsin requires smoke detectors on every level. GFCI outlets in wet locations. Cold weather building standards."),
        ("WY", "Wyoming requires smoke detectors on every level. GFCI protection mandatory. Cold weather and wind-resistant construction."),
    ]
    .into_iter()
    .collect()
});

/// Standard disclaimer appended wherever code guidance is surfaced.
pub const COMPLIANCE_DISCLAIMER: &str = "**IMPORTANT BUILDING CODE DISCLAIMER:** This analysis provides general building code guidance only. Building codes vary significantly by local jurisdiction (city, county, state). This assessment is not a substitute for professional inspection or official code compliance verification. Always consult local building authorities and licensed professionals for official compliance determinations. This report does not constitute legal advice or official inspection results.";

/// Regulatory guidance for a two-letter region code; `None` for unknown codes.
pub fn region_guidance(code: &str) -> Option<&'static str> {
    let normalized = code.trim().to_ascii_uppercase();
    REGION_GUIDANCE.get(normalized.as_str()).copied()
}

/// Frequent violations for a code category, used to seed report guidance.
pub fn common_violations(category: CodeCategory) -> &'static [&'static str] {
    match category {
        CodeCategory::Electrical => &[
            "Exposed wiring or junction boxes",
            "Missing GFCI outlets in bathrooms/kitchens",
            "Overloaded electrical panels or circuits",
            "Improper grounding or bonding",
            "Extension cords used as permanent wiring",
        ],
        CodeCategory::Plumbing => &[
            "Visible leaks or water damage",
            "Improper drainage or standing water",
            "Missing shut-off valves",
            "Cross-connections between potable and non-potable water",
            "Improper venting of plumbing fixtures",
        ],
        CodeCategory::Safety => &[
            "Missing or non-functional smoke detectors",
            "Missing carbon monoxide detectors",
            "Blocked emergency exits or egress windows",
            "Unsafe stair railings or missing handrails",
            "Broken or missing safety glass",
        ],
        CodeCategory::Structural => &[
            "Cracks in load-bearing walls or foundations",
            "Sagging floors, ceilings, or rooflines",
            "Damaged or missing support beams",
            "Water damage affecting structural integrity",
        ],
        CodeCategory::FireSafety => &[
            "Blocked fire exits or escape routes",
            "Improper storage near heat sources",
            "Damaged fire-rated walls or doors",
            "Inadequate clearance around heating equipment",
        ],
        CodeCategory::Ventilation => &[
            "Blocked or missing exhaust fans in bathrooms",
            "Blocked HVAC vents or returns",
            "Improper dryer vent installations",
            "Moisture problems due to poor ventilation",
        ],
        CodeCategory::NotApplicable => &[],
    }
}

/// Whether an issue belongs to a category that needs immediate attention.
pub fn is_critical_violation(issue_type: Option<IssueType>, category: CodeCategory) -> bool {
    let critical_type = matches!(
        issue_type,
        Some(
            IssueType::ElectricalViolation
                | IssueType::SafetyViolation
                | IssueType::FireSafetyViolation
                | IssueType::StructuralViolation
        )
    );
    let critical_category = matches!(
        category,
        CodeCategory::Electrical
            | CodeCategory::Safety
            | CodeCategory::FireSafety
            | CodeCategory::Structural
    );
    critical_type || critical_category
}

fn professional_for(category: CodeCategory) -> Option<&'static str> {
    match category {
        CodeCategory::Electrical => {
            Some("Licensed electrician for electrical code compliance verification")
        }
        CodeCategory::Plumbing => Some("Licensed plumber for plumbing code compliance assessment"),
        CodeCategory::Safety => {
            Some("Certified home inspector for comprehensive safety evaluation")
        }
        CodeCategory::Structural => {
            Some("Structural engineer for load-bearing and foundation assessment")
        }
        CodeCategory::FireSafety => Some("Fire safety inspector for fire code compliance review"),
        CodeCategory::Ventilation => {
            Some("HVAC professional for ventilation system evaluation")
        }
        CodeCategory::NotApplicable => None,
    }
}

/// Professional consultations to recommend for the code categories found.
///
/// Output is deterministic (category order, deduplicated) and ends with the
/// general permit / inspector advice whenever any category applies.
pub fn professional_recommendations<I>(categories: I) -> Vec<String>
where
    I: IntoIterator<Item = CodeCategory>,
{
    let found: BTreeSet<&'static str> = categories
        .into_iter()
        .filter(|c| *c != CodeCategory::NotApplicable)
        .map(|c| c.as_str())
        .collect();
    if found.is_empty() {
        return Vec::new();
    }

    let mut recommendations: Vec<String> = [
        CodeCategory::Electrical,
        CodeCategory::Plumbing,
        CodeCategory::Safety,
        CodeCategory::Structural,
        CodeCategory::FireSafety,
        CodeCategory::Ventilation,
    ]
    .into_iter()
    .filter(|c| found.contains(c.as_str()))
    .filter_map(professional_for)
    .map(str::to_string)
    .collect();
    recommendations
        .push("Local building inspector for official code compliance verification".to_string());
    recommendations.push("Obtain proper permits before making any corrections".to_string());
    recommendations
}
