//! Risk verdicts and classifier reply validation

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Category of detected hazard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskKind {
    #[default]
    None,
    Fall,
    Fire,
    Unknown,
}

impl RiskKind {
    /// Wire representation used by the classifier schema
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskKind::None => "NONE",
            RiskKind::Fall => "FALL",
            RiskKind::Fire => "FIRE",
            RiskKind::Unknown => "UNKNOWN",
        }
    }

    /// Parse a wire value. Exact, case-sensitive match.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "NONE" => Some(RiskKind::None),
            "FALL" => Some(RiskKind::Fall),
            "FIRE" => Some(RiskKind::Fire),
            "UNKNOWN" => Some(RiskKind::Unknown),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        *self == RiskKind::None
    }
}

impl fmt::Display for RiskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classification result for a single frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskVerdict {
    kind: RiskKind,
    description: String,
    confidence: f64,
}

impl RiskVerdict {
    /// Confidence is clamped into [0, 1]; NaN becomes 0.
    pub fn new(kind: RiskKind, description: impl Into<String>, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            kind,
            description: description.into(),
            confidence,
        }
    }

    /// UNKNOWN verdict with zero confidence
    pub fn unknown(reason: impl Into<String>) -> Self {
        Self::new(RiskKind::Unknown, reason, 0.0)
    }

    pub fn kind(&self) -> RiskKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// Remove an incidental Markdown code fence (```` ```json ... ``` ````)
/// around a reply. Unfenced text is returned trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    {
        Some(inner) => inner
            .trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_')
            .trim(),
        None => trimmed,
    }
}

/// Parse and validate a classifier reply.
///
/// Never fails: malformed JSON, an unrecognized `detected_risk`, missing or
/// mistyped fields and out-of-range confidence all yield an UNKNOWN verdict
/// whose description names the problem.
pub fn parse_verdict(text: &str) -> RiskVerdict {
    match validate(strip_code_fence(text)) {
        Ok(verdict) => verdict,
        Err(reason) => {
            warn!("Invalid classifier reply ({}): {}", reason, text);
            RiskVerdict::unknown(format!("Invalid classifier response: {}", reason))
        }
    }
}

fn validate(body: &str) -> Result<RiskVerdict, String> {
    let value: Value = serde_json::from_str(body).map_err(|e| format!("malformed JSON ({})", e))?;
    let object = value
        .as_object()
        .ok_or_else(|| "reply is not a JSON object".to_string())?;

    let risk = object
        .get("detected_risk")
        .and_then(Value::as_str)
        .ok_or_else(|| "detected_risk missing or not a string".to_string())?;
    let kind = RiskKind::from_wire(risk)
        .ok_or_else(|| format!("unrecognized detected_risk \"{}\"", risk))?;

    let description = object
        .get("description")
        .and_then(Value::as_str)
        .ok_or_else(|| "description missing or not a string".to_string())?;

    let confidence = object
        .get("confidence_score")
        .and_then(Value::as_f64)
        .ok_or_else(|| "confidence_score missing or not a number".to_string())?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(format!("confidence_score {} outside [0, 1]", confidence));
    }

    Ok(RiskVerdict::new(kind, description, confidence))
}
