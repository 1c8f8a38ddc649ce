//! Session state tracking

use alerting::{Alert, AlertKind, Assessment};
use chrono::{DateTime, Utc};
use frame_capture::{SourceError, SourceKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vision_classifier::{RiskKind, RiskVerdict};

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Classifier not yet resolved
    Init,
    /// Accepting frames
    Ready,
    /// One classification in flight
    Analyzing,
    /// Credential missing or rejected; terminal until restart
    ConfigError,
}

/// Which video source the user wants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SourceSelection {
    Live,
    File {
        #[serde(default)]
        path: Option<PathBuf>,
    },
}

impl SourceSelection {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceSelection::Live => SourceKind::Live,
            SourceSelection::File { .. } => SourceKind::File,
        }
    }

    /// File mode with nothing chosen yet
    pub fn is_waiting_for_file(&self) -> bool {
        matches!(self, SourceSelection::File { path: None })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Sticky: survives source switches and successful analyses
    Configuration,
    /// Device or file problem; cleared by the next good analysis
    Source,
}

/// User-visible session error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SessionError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Configuration,
            message: message.into(),
        }
    }

    pub fn source(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Source,
            message: message.into(),
        }
    }

    pub fn is_sticky(&self) -> bool {
        self.kind == ErrorKind::Configuration
    }
}

/// Session state (mutated only by the monitor)
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub phase: Phase,
    pub active_risk: RiskKind,
    pub last_verdict: Option<RiskVerdict>,
    /// True exactly while one classification is outstanding
    pub is_analyzing: bool,
    /// Completion time of the last successful classification
    pub last_analysis_at: Option<DateTime<Utc>>,
    pub active_alert: Option<Alert>,
    pub source: SourceSelection,
    pub error: Option<SessionError>,
    /// Bumped on every source reset; results from an older generation are stale
    #[serde(skip)]
    generation: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Init,
            active_risk: RiskKind::None,
            last_verdict: None,
            is_analyzing: false,
            last_analysis_at: None,
            active_alert: None,
            source: SourceSelection::Live,
            error: None,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn mark_ready(&mut self) {
        if self.phase == Phase::Init {
            self.phase = Phase::Ready;
        }
    }

    pub(crate) fn mark_config_error(&mut self, message: impl Into<String>) {
        self.phase = Phase::ConfigError;
        self.is_analyzing = false;
        self.error = Some(SessionError::configuration(message));
    }

    /// Enter `Analyzing`; returns the current generation, or `None` when not `Ready`
    pub(crate) fn begin_analysis(&mut self) -> Option<u64> {
        if self.phase != Phase::Ready {
            return None;
        }
        self.phase = Phase::Analyzing;
        self.is_analyzing = true;
        Some(self.generation)
    }

    pub(crate) fn finish_analysis(&mut self) {
        self.is_analyzing = false;
        if self.phase == Phase::Analyzing {
            self.phase = Phase::Ready;
        }
    }

    /// Apply a successful classification
    pub(crate) fn apply_assessment(
        &mut self,
        verdict: RiskVerdict,
        assessment: Assessment,
        completed_at: DateTime<Utc>,
    ) {
        let previous = self.active_risk;
        let clears = assessment.clears(previous);

        self.active_risk = assessment.risk;
        self.last_verdict = Some(verdict);
        self.last_analysis_at = Some(completed_at);

        match assessment.alert {
            Some(alert) => self.active_alert = Some(alert),
            None if clears => self.active_alert = None,
            None => {}
        }

        // A good analysis means the device and service work again
        if self.error.as_ref().is_some_and(|e| !e.is_sticky()) {
            self.error = None;
        }
    }

    /// Apply a failed classification. The timestamp is left as is.
    pub(crate) fn apply_failure(&mut self, message: &str) {
        let text = format!("Analysis error: {}", message);
        self.active_risk = RiskKind::Unknown;
        self.last_verdict = Some(RiskVerdict::unknown(text.clone()));
        self.active_alert = Some(Alert::error(text));
    }

    /// Clear per-source results before switching to `selection`
    pub(crate) fn reset_for_source(&mut self, selection: SourceSelection) {
        self.generation = self.generation.wrapping_add(1);
        self.active_risk = RiskKind::None;
        self.last_verdict = None;
        self.last_analysis_at = None;
        self.active_alert = None;
        self.error = self.error.take().filter(SessionError::is_sticky);
        self.source = selection;
    }

    pub(crate) fn record_source_error(&mut self, err: &SourceError) {
        let message = format!("Video source error: {}", err);
        if !self.error.as_ref().is_some_and(SessionError::is_sticky) {
            self.error = Some(SessionError::source(message.clone()));
        }
        self.active_alert = Some(Alert::error(message));
    }

    /// Returns whether there was an alert to dismiss
    pub fn dismiss_alert(&mut self) -> bool {
        self.active_alert.take().is_some()
    }

    /// Configuration errors cannot be dismissed
    pub fn dismiss_error(&mut self) -> bool {
        match &self.error {
            Some(e) if !e.is_sticky() => {
                self.error = None;
                true
            }
            _ => false,
        }
    }

    /// One-line status for display
    pub fn status_text(&self) -> &'static str {
        if let Some(error) = &self.error {
            return match error.kind {
                ErrorKind::Configuration => "API key not configured.",
                ErrorKind::Source => "Problem with the video source.",
            };
        }
        if self
            .active_alert
            .as_ref()
            .is_some_and(|a| a.kind == AlertKind::Error)
        {
            return "System error.";
        }
        match self.phase {
            Phase::Init => "Initializing AI service...",
            Phase::ConfigError => "AI service unavailable.",
            _ if self.source.is_waiting_for_file() => "Waiting for video file...",
            Phase::Analyzing => "Analyzing frame...",
            Phase::Ready => "Monitoring...",
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status_text(),
            state: self.clone(),
        }
    }
}

/// Read-only view handed to callers
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub state: SessionState,
    pub status: &'static str,
}
