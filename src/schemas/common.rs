//! Records shared by the inspection and diagnosis pipelines

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// A photo as submitted by the caller; the URL has not been checked yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoSubmission {
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub room_name: Option<String>,
    #[serde(default)]
    pub order_index: Option<i32>,
}

/// A photo that survived ingestion: `image_url` is an absolute HTTP(S) URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoReference {
    pub image_url: String,
    pub room_name: Option<String>,
    pub order_index: Option<i32>,
}

/// Property metadata used to parameterise instruction templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PropertyContext {
    #[serde(default)]
    pub property_type: Option<String>,
    /// Two-letter region code, e.g. `"CA"`
    #[serde(default)]
    pub state: Option<String>,
}

impl PropertyContext {
    /// One-line context preamble sent ahead of the stage input, empty when nothing is known.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if let Some(kind) = self.property_type.as_deref().filter(|s| !s.trim().is_empty()) {
            out.push_str(&format!("Property type: {}. ", kind.trim()));
        }
        if let Some(state) = self.state.as_deref().filter(|s| !s.trim().is_empty()) {
            out.push_str(&format!("State: {}. ", state.trim()));
        }
        out.trim_end().to_string()
    }
}

/// Property identity printed at the top of generated reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PropertyIdentity {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address_line1: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

impl PropertyIdentity {
    /// Multi-line "Property / Address / Location" block; location needs both city and state.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if let Some(name) = &self.name {
            out.push_str(&format!("Property: {}\n", name));
        }
        if let Some(address) = &self.address_line1 {
            out.push_str(&format!("Address: {}\n", address));
        }
        if let (Some(city), Some(state)) = (&self.city, &self.state) {
            out.push_str(&format!("Location: {}, {}", city, state));
            if let Some(postal) = &self.postal_code {
                out.push_str(&format!(" {}", postal));
            }
            out.push('\n');
        }
        out
    }
}

/// Severity / urgency scale shared by both pipelines, ordered `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "minor" => Ok(Severity::Low),
            "medium" | "moderate" => Ok(Severity::Medium),
            "high" | "major" => Ok(Severity::High),
            "critical" | "urgent" | "emergency" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

// Case-insensitive, with a few synonyms models like to use.
impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Building-code category attached to an issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeCategory {
    Electrical,
    Plumbing,
    Safety,
    Structural,
    FireSafety,
    Ventilation,
    #[default]
    #[serde(rename = "none", other)]
    NotApplicable,
}

impl CodeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeCategory::Electrical => "electrical",
            CodeCategory::Plumbing => "plumbing",
            CodeCategory::Safety => "safety",
            CodeCategory::Structural => "structural",
            CodeCategory::FireSafety => "fire_safety",
            CodeCategory::Ventilation => "ventilation",
            CodeCategory::NotApplicable => "none",
        }
    }
}

/// Axis-aligned box in image coordinates; every edge is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub w: Option<f64>,
    #[serde(default)]
    pub h: Option<f64>,
}

/// Repair estimate produced by the enrichment stage for one issue.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RepairEstimate {
    #[serde(default)]
    pub recommended_action: String,
    #[serde(default)]
    pub recommended_trade: String,
    #[serde(default, deserialize_with = "crate::deserializers::de_bool_forgiving")]
    pub diy_possible: bool,
    #[serde(default, deserialize_with = "crate::deserializers::de_f64_forgiving")]
    pub cost_low: f64,
    #[serde(default, deserialize_with = "crate::deserializers::de_f64_forgiving")]
    pub cost_high: f64,
    #[serde(default, deserialize_with = "crate::deserializers::de_f64_forgiving")]
    pub time_hours: f64,
    #[serde(default, deserialize_with = "crate::deserializers::de_string_list_forgiving")]
    pub materials_list: Vec<String>,
    #[serde(default, deserialize_with = "crate::deserializers::de_option_text_forgiving")]
    pub safety_warnings: Option<String>,
    /// Ordered next steps; only the diagnosis pipeline asks for these.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "crate::deserializers::de_string_list_forgiving"
    )]
    pub steps: Vec<String>,
}

impl RepairEstimate {
    /// Clamp negatives to zero and restore `cost_low <= cost_high`.
    pub fn normalized(mut self) -> Self {
        self.cost_low = self.cost_low.max(0.0);
        self.cost_high = self.cost_high.max(0.0);
        self.time_hours = self.time_hours.max(0.0);
        if self.cost_low > self.cost_high {
            std::mem::swap(&mut self.cost_low, &mut self.cost_high);
        }
        self.recommended_trade = self.recommended_trade.trim().to_string();
        self
    }
}

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Ingest,
    Detect,
    Enrich,
    Report,
    Notify,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Detect => "detect",
            Stage::Enrich => "enrich",
            Stage::Report => "report",
            Stage::Notify => "notify",
        }
    }
}

/// A stage whose model output could not be used as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageWarning {
    pub stage: Stage,
    pub message: String,
}

/// Output of a model-backed stage; `degraded` carries the reason when a fallback was used.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome<T> {
    pub value: T,
    pub degraded: Option<String>,
}

impl<T> StageOutcome<T> {
    pub fn complete(value: T) -> Self {
        Self {
            value,
            degraded: None,
        }
    }

    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self {
            value,
            degraded: Some(reason.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    /// Split into the value and, if degraded, a warning tagged with `stage`.
    pub fn into_parts(self, stage: Stage) -> (T, Option<StageWarning>) {
        let warning = self.degraded.map(|message| StageWarning { stage, message });
        (self.value, warning)
    }
}

/// Error message carried by the early-exit payload when ingestion keeps no photos.
pub const NO_VALID_PHOTOS: &str = "No valid photos provided";
