//! Alert types

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;
use vision_classifier::RiskKind;

/// Confidence at or above which a risk alert is critical
const CRITICAL_CONFIDENCE: f64 = 0.90;
/// Confidence at or above which a risk alert is high
const HIGH_CONFIDENCE: f64 = 0.85;

/// What an alert is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Risk(RiskKind),
    Info,
    Error,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Risk(kind) => kind.as_str(),
            AlertKind::Info => "INFO",
            AlertKind::Error => "ERROR",
        }
    }
}

impl Serialize for AlertKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Severity label shown with an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Label a risk alert by the confidence behind it
    pub fn from_confidence(confidence: f64, threshold: f64) -> Self {
        if confidence >= CRITICAL_CONFIDENCE {
            Severity::Critical
        } else if confidence >= HIGH_CONFIDENCE {
            Severity::High
        } else if confidence >= threshold {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// A user-visible alert
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub id: Uuid,
    pub kind: AlertKind,
    pub message: String,
    pub details: Option<String>,
    pub severity: Severity,
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    fn build(kind: AlertKind, message: String, details: Option<String>, severity: Severity) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message,
            details,
            severity,
            raised_at: Utc::now(),
        }
    }

    pub fn risk(
        kind: RiskKind,
        message: impl Into<String>,
        details: Option<String>,
        severity: Severity,
    ) -> Self {
        Self::build(AlertKind::Risk(kind), message.into(), details, severity)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::build(AlertKind::Error, message.into(), None, Severity::High)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::build(AlertKind::Info, message.into(), None, Severity::Low)
    }

    /// Risk kind, for risk alerts
    pub fn risk_kind(&self) -> Option<RiskKind> {
        match self.kind {
            AlertKind::Risk(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_risk(&self) -> bool {
        self.risk_kind().is_some()
    }
}
