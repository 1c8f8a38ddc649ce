//! Frame analysis: classifier call, risk evaluation and state transitions

use alerting::{AlertThrottle, RiskEvaluator, ThrottleConfig};
use chrono::Utc;
use frame_capture::SourceError;
use metrics::counter;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use vision_classifier::{Classifier, ClassifierError, RiskKind};

use crate::gate::InFlight;
use crate::sampler::SampledFrame;
use crate::state::{SessionSnapshot, SessionState, SourceSelection};

/// What happened to one delivered frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Classified; carries the resulting active risk
    Classified(RiskKind),
    /// Classifier call failed; risk set to UNKNOWN
    Failed,
    /// Result arrived after a source switch and was discarded
    Stale,
    /// Dropped without calling the classifier
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No usable classifier
    NotConfigured,
    /// Another analysis is outstanding
    Busy,
}

struct Session {
    state: SessionState,
    throttle: AlertThrottle,
}

/// Serializes classification and owns the session state
#[derive(Clone)]
pub struct Analyzer {
    session: Arc<RwLock<Session>>,
    classifier: Option<Arc<dyn Classifier>>,
    evaluator: RiskEvaluator,
    in_flight: InFlight,
}

impl Analyzer {
    /// Resolve the classifier: `Init -> Ready` on success, `Init -> ConfigError` otherwise
    pub fn new(
        classifier: Result<Arc<dyn Classifier>, ClassifierError>,
        evaluator: RiskEvaluator,
        throttle: ThrottleConfig,
    ) -> Self {
        let mut state = SessionState::new();
        let classifier = match classifier {
            Ok(classifier) => {
                state.mark_ready();
                info!("Classifier ready (alert threshold {:.2})", evaluator.threshold());
                Some(classifier)
            }
            Err(e) => {
                error!("Classifier unavailable: {}", e);
                state.mark_config_error(e.to_string());
                None
            }
        };

        Self {
            session: Arc::new(RwLock::new(Session {
                state,
                throttle: AlertThrottle::new(throttle),
            })),
            classifier,
            evaluator,
            in_flight: InFlight::new(),
        }
    }

    /// Gate shared with the sampler
    pub fn in_flight(&self) -> InFlight {
        self.in_flight.clone()
    }

    /// Analyze one frame. At most one call runs at a time; frames arriving
    /// meanwhile are dropped. Frames from a source older than the current
    /// one are discarded before and after the classifier call.
    pub async fn handle_frame(&self, sampled: SampledFrame) -> FrameOutcome {
        let SampledFrame { generation, frame } = sampled;
        let Some(classifier) = self.classifier.clone() else {
            debug!("Frame #{} dropped: classifier unavailable", frame.sequence);
            return FrameOutcome::Dropped(DropReason::NotConfigured);
        };
        let Some(_permit) = self.in_flight.try_acquire() else {
            debug!("Frame #{} dropped: analysis in flight", frame.sequence);
            counter!("monitor_frames_skipped_total", "reason" => "in_flight").increment(1);
            return FrameOutcome::Dropped(DropReason::Busy);
        };

        {
            let mut session = self.session.write().await;
            if session.state.generation() != generation {
                debug!("Frame #{} discarded: captured from a previous source", frame.sequence);
                counter!("monitor_analyses_total", "outcome" => "stale").increment(1);
                return FrameOutcome::Stale;
            }
            if session.state.begin_analysis().is_none() {
                return FrameOutcome::Dropped(DropReason::NotConfigured);
            }
        }

        debug!("Classifying frame #{} ({} bytes)", frame.sequence, frame.bytes.len());
        let result = classifier.classify(&frame).await;

        let mut session = self.session.write().await;
        let Session { state, throttle } = &mut *session;

        if state.generation() != generation {
            debug!("Discarding result for frame #{}: source changed", frame.sequence);
            counter!("monitor_analyses_total", "outcome" => "stale").increment(1);
            state.finish_analysis();
            return FrameOutcome::Stale;
        }

        let outcome = match result {
            Ok(verdict) => {
                let assessment = self.evaluator.evaluate(&verdict);
                let risk = assessment.risk;
                if assessment.alert.is_some() && throttle.try_announce(risk) {
                    warn!(
                        "ALERT {}: {} (confidence {:.2})",
                        risk,
                        verdict.description(),
                        verdict.confidence()
                    );
                    counter!("monitor_alerts_raised_total", "kind" => risk.as_str()).increment(1);
                }
                debug!("Frame #{}: {} at {:.2}", frame.sequence, verdict.kind(), verdict.confidence());
                counter!("monitor_analyses_total", "outcome" => "ok").increment(1);
                state.apply_assessment(verdict, assessment, Utc::now());
                FrameOutcome::Classified(risk)
            }
            Err(e) if e.is_configuration() => {
                error!("Classifier rejected configuration: {}", e);
                counter!("monitor_analyses_total", "outcome" => "config_error").increment(1);
                state.mark_config_error(e.to_string());
                FrameOutcome::Failed
            }
            Err(e) => {
                warn!("Analysis of frame #{} failed: {}", frame.sequence, e);
                counter!("monitor_analyses_total", "outcome" => "error").increment(1);
                state.apply_failure(&e.to_string());
                FrameOutcome::Failed
            }
        };

        state.finish_analysis();
        outcome
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.read().await.state.snapshot()
    }

    /// Clear per-source results; returns the new source generation
    pub(crate) async fn reset_for_source(&self, selection: SourceSelection) -> u64 {
        let mut session = self.session.write().await;
        session.state.reset_for_source(selection);
        session.throttle.clear();
        session.state.generation()
    }

    pub(crate) async fn record_source_error(&self, err: &SourceError) {
        self.session.write().await.state.record_source_error(err);
    }

    pub async fn dismiss_alert(&self) -> bool {
        self.session.write().await.state.dismiss_alert()
    }

    pub async fn dismiss_error(&self) -> bool {
        self.session.write().await.state.dismiss_error()
    }
}
