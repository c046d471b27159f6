//! Custom deserializers for flexible parsing of completion-service output.
//!
//! Models do not always honour the requested JSON shape exactly: costs arrive as
//! `"$1,200"`, confidences as `85`, material lists as a single string. These
//! deserializers accept the common variants while still rejecting values that
//! make no sense, so a single sloppy field does not sink a whole issue record.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parse a human-formatted amount such as `"$1,250.50"`, `"150 USD"` or `"2.5"`.
fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .trim_end_matches("USD")
        .trim_end_matches("usd")
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Deserializes an `f64` accepting numbers, numeric strings and currency strings.
///
/// # Accepted Formats
///
/// * **Numeric**: `150`, `150.5`
/// * **String**: `"150"`, `"$1,200"`, `"75 USD"`
/// * **Null / empty string**: `0.0`
///
/// Use together with `#[serde(default)]` so a missing field also becomes `0.0`.
pub fn de_f64_forgiving<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let v = Value::deserialize(deserializer)?;
    match v {
        Value::Null => Ok(0.0),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .ok_or_else(|| D::Error::custom("non-finite numeric")),
        Value::String(s) => {
            if s.trim().is_empty() {
                return Ok(0.0);
            }
            parse_amount(&s).ok_or_else(|| D::Error::custom(format!("invalid amount: '{}'", s)))
        }
        other => Err(D::Error::custom(format!("invalid type for amount: {}", other))),
    }
}

/// Deserializes a confidence score into `[0.0, 1.0]`.
///
/// Values in `(1, 100]` are treated as percentages (`85` → `0.85`); anything
/// else outside the unit interval is clamped.
pub fn de_confidence_forgiving<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let v = Value::deserialize(deserializer)?;
    let raw = match v {
        Value::Null => return Ok(0.0),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| D::Error::custom("invalid numeric for confidence"))?,
        Value::String(s) => {
            let s = s.trim().trim_end_matches('%');
            s.parse::<f64>()
                .map_err(|_| D::Error::custom(format!("invalid confidence: '{}'", s)))?
        }
        other => {
            return Err(D::Error::custom(format!(
                "invalid type for confidence: {}",
                other
            )));
        }
    };
    if !raw.is_finite() {
        return Err(D::Error::custom("non-finite confidence"));
    }
    let scaled = if raw > 1.0 && raw <= 100.0 {
        raw / 100.0
    } else {
        raw
    };
    Ok(scaled.clamp(0.0, 1.0) as f32)
}

/// Deserializes a list of strings with support for string, array, or null values.
///
/// * **Null**: `null` → `vec![]`
/// * **String**: `"tape, spackle"` → `vec!["tape", "spackle"]`
/// * **Array with mixed types**: `["tape", 2]` → `vec!["tape", "2"]`
pub fn de_string_list_forgiving<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let v = Value::deserialize(deserializer)?;
    match v {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect()),
        Value::Array(arr) => Ok(arr
            .into_iter()
            .filter_map(|el| match el {
                Value::Null => None,
                Value::String(s) if s.trim().is_empty() => None,
                Value::String(s) => Some(s),
                other => Some(other.to_string()),
            })
            .collect()),
        other => Err(D::Error::custom(format!(
            "invalid type for string list: {}",
            other
        ))),
    }
}

/// Deserializes a boolean accepting `true`, `"yes"`, `"true"`, `1` and their negatives.
pub fn de_bool_forgiving<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let v = Value::deserialize(deserializer)?;
    match v {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Ok(true),
            "false" | "no" | "n" | "0" | "" => Ok(false),
            other => Err(D::Error::custom(format!("invalid boolean: '{}'", other))),
        },
        other => Err(D::Error::custom(format!("invalid type for bool: {}", other))),
    }
}

/// Deserializes an optional free-text field; `""`, `"null"`, `"none"` and `"n/a"` become `None`.
pub fn de_option_text_forgiving<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<Value>::deserialize(deserializer)?;
    let Some(v) = opt else { return Ok(None) };
    match v {
        Value::Null => Ok(None),
        Value::String(s) => {
            let trimmed = s.trim();
            match trimmed.to_lowercase().as_str() {
                "" | "null" | "none" | "n/a" => Ok(None),
                _ => Ok(Some(trimmed.to_string())),
            }
        }
        other => Ok(Some(other.to_string())),
    }
}
