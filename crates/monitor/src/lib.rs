//! Home Monitoring Session
//!
//! Ties the pieces together:
//! - Frame sampler pulling stills from the active video source
//! - Analyzer serializing classifier calls (at most one in flight)
//! - Risk evaluation and the alert shown to the user
//! - Source switching with a clean state reset

pub mod analyzer;
pub mod config;
pub mod gate;
pub mod provider;
pub mod sampler;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use analyzer::{Analyzer, DropReason, FrameOutcome};
pub use config::MonitorConfig;
pub use gate::InFlight;
pub use provider::{DeviceProvider, SourceProvider};
pub use sampler::{FrameSampler, SampledFrame};
pub use state::{ErrorKind, Phase, SessionError, SessionSnapshot, SessionState, SourceSelection};

use alerting::{RiskEvaluator, ThrottleConfig};
use frame_capture::SourceError;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};
use vision_classifier::{Classifier, ClassifierError};

/// Frames buffered between the sampler and the analyzer
const FRAME_QUEUE_DEPTH: usize = 4;

/// Monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Video source error: {0}")]
    Source(#[from] SourceError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Home monitor
#[derive(Clone)]
pub struct Monitor {
    analyzer: Analyzer,
    sampler: Arc<Mutex<FrameSampler>>,
    provider: Arc<dyn SourceProvider>,
}

impl Monitor {
    /// Create a monitor. A classifier error puts the session in `ConfigError`
    /// permanently; frames are still sampled but never classified.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(
        config: &MonitorConfig,
        classifier: Result<Arc<dyn Classifier>, ClassifierError>,
        provider: Arc<dyn SourceProvider>,
    ) -> Result<Self, MonitorError> {
        config.validate()?;

        let analyzer = Analyzer::new(
            classifier,
            RiskEvaluator::new(config.min_confidence),
            ThrottleConfig {
                cooldown_seconds: config.alert_cooldown_seconds,
            },
        );

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
        let mut sampler = FrameSampler::new(config.interval(), config.extraction(), analyzer.in_flight());
        sampler.on_frame(frame_tx);
        tokio::spawn(dispatch_frames(analyzer.clone(), frame_rx));

        Ok(Self {
            analyzer,
            sampler: Arc::new(Mutex::new(sampler)),
            provider,
        })
    }

    /// Monitor with the default device provider
    pub fn with_devices(
        config: &MonitorConfig,
        classifier: Result<Arc<dyn Classifier>, ClassifierError>,
    ) -> Result<Self, MonitorError> {
        let provider = DeviceProvider::new(config.camera(), config.clip_fps, config.clip_max_bytes);
        Self::new(config, classifier, Arc::new(provider))
    }

    /// Switch the video source. Per-source results are cleared before the
    /// old source is released; frames the old source still delivers are
    /// discarded. A failure to acquire the new source is recorded in the
    /// session and returned.
    pub async fn select_source(&self, selection: SourceSelection) -> Result<(), MonitorError> {
        let mut sampler = self.sampler.lock().await;
        info!("Selecting source {:?}", selection);

        let generation = self.analyzer.reset_for_source(selection.clone()).await;

        let Some(source) = self.provider.open(&selection) else {
            sampler.stop().await;
            info!("Waiting for a video file");
            return Ok(());
        };

        if let Err(e) = sampler.start(source, generation).await {
            self.analyzer.record_source_error(&e).await;
            return Err(MonitorError::Source(e));
        }
        Ok(())
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.analyzer.snapshot().await
    }

    pub async fn dismiss_alert(&self) -> bool {
        self.analyzer.dismiss_alert().await
    }

    pub async fn dismiss_error(&self) -> bool {
        self.analyzer.dismiss_error().await
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Stop sampling and release the active source
    pub async fn shutdown(&self) {
        info!("Shutting down monitor");
        self.sampler.lock().await.stop().await;
    }
}

async fn dispatch_frames(analyzer: Analyzer, mut frames: mpsc::Receiver<SampledFrame>) {
    while let Some(frame) = frames.recv().await {
        let analyzer = analyzer.clone();
        tokio::spawn(async move {
            let outcome = analyzer.handle_frame(frame).await;
            debug!("Frame outcome: {:?}", outcome);
        });
    }
    debug!("Frame queue closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EventLog, FakeSource, ScriptedClassifier};
    use alerting::AlertKind;
    use frame_capture::{SourceKind, VideoSource};
    use std::time::Duration;
    use tokio::time::sleep;
    use vision_classifier::{RiskKind, RiskVerdict};

    /// Hands out fake sources and records their lifecycle
    struct FakeProvider {
        log: EventLog,
        fail_live: Option<SourceError>,
        live_refresh_delay: Duration,
    }

    impl FakeProvider {
        fn new(log: &EventLog) -> Self {
            Self {
                log: log.clone(),
                fail_live: None,
                live_refresh_delay: Duration::ZERO,
            }
        }
    }

    impl SourceProvider for FakeProvider {
        fn open(&self, selection: &SourceSelection) -> Option<Box<dyn VideoSource>> {
            match selection {
                SourceSelection::Live => {
                    let source = FakeSource::new("live", &self.log).with_refresh_delay(self.live_refresh_delay);
                    Some(Box::new(match self.fail_live.clone() {
                        Some(err) => source.failing(err),
                        None => source,
                    }))
                }
                SourceSelection::File { path: Some(_) } => Some(Box::new(
                    FakeSource::new("file", &self.log).with_kind(SourceKind::File),
                )),
                SourceSelection::File { path: None } => None,
            }
        }
    }

    fn monitor(
        classifier: &Arc<ScriptedClassifier>,
        log: &EventLog,
        fail_live: Option<SourceError>,
    ) -> Monitor {
        let classifier: Arc<dyn Classifier> = classifier.clone();
        let provider = FakeProvider {
            fail_live,
            ..FakeProvider::new(log)
        };
        Monitor::new(&MonitorConfig::default(), Ok(classifier), Arc::new(provider)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_detected_end_to_end() {
        let log = EventLog::default();
        let classifier = Arc::new(ScriptedClassifier::new(vec![Ok(RiskVerdict::new(
            RiskKind::Fire,
            "smoke visible",
            0.82,
        ))]));
        let monitor = monitor(&classifier, &log, None);

        monitor.select_source(SourceSelection::Live).await.unwrap();
        sleep(Duration::from_millis(7_100)).await;

        let snapshot = monitor.snapshot().await;
        assert_eq!(classifier.calls(), 1);
        assert_eq!(snapshot.state.active_risk, RiskKind::Fire);
        let alert = snapshot.state.active_alert.unwrap();
        assert_eq!(alert.kind, AlertKind::Risk(RiskKind::Fire));
        assert!(alert.message.contains("smoke visible"));

        monitor.shutdown().await;
        assert_eq!(log.count("release:live"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_classifier_skips_ticks() {
        let log = EventLog::default();
        let classifier = Arc::new(
            ScriptedClassifier::new(vec![]).with_delay(Duration::from_secs(20)),
        );
        let monitor = monitor(&classifier, &log, None);
        monitor.select_source(SourceSelection::Live).await.unwrap();

        // Ticks at 14s and 21s land while the first call is outstanding
        sleep(Duration::from_millis(21_100)).await;
        assert_eq!(classifier.calls(), 1);
        assert_eq!(log.count("capture"), 1);

        // The call finishes at 27s; the next tick at 28s samples again
        sleep(Duration::from_secs(7)).await;
        assert_eq!(classifier.calls(), 2);

        monitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_to_file_clears_state() {
        let log = EventLog::default();
        let classifier = Arc::new(ScriptedClassifier::new(vec![Ok(RiskVerdict::new(
            RiskKind::Fall,
            "person on floor",
            0.9,
        ))]));
        let monitor = monitor(&classifier, &log, None);

        monitor.select_source(SourceSelection::Live).await.unwrap();
        sleep(Duration::from_millis(7_100)).await;
        assert_eq!(monitor.snapshot().await.state.active_risk, RiskKind::Fall);

        monitor
            .select_source(SourceSelection::File { path: None })
            .await
            .unwrap();
        let snapshot = monitor.snapshot().await;
        assert_eq!(snapshot.state.active_risk, RiskKind::None);
        assert!(snapshot.state.last_verdict.is_none());
        assert!(snapshot.state.active_alert.is_none());
        assert!(snapshot.state.last_analysis_at.is_none());
        assert_eq!(snapshot.status, "Waiting for video file...");
        assert_eq!(log.count("release:live"), 1);

        // Nothing is sampled until a file is chosen
        sleep(Duration::from_secs(30)).await;
        assert_eq!(classifier.calls(), 1);

        monitor
            .select_source(SourceSelection::File {
                path: Some("/tmp/hall.mjpeg".into()),
            })
            .await
            .unwrap();
        sleep(Duration::from_millis(7_100)).await;
        assert_eq!(classifier.calls(), 2);
        assert_eq!(
            log.events(),
            vec!["acquire:live", "capture:live", "release:live", "acquire:file", "capture:file"]
        );
        monitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_finished_during_switch_is_discarded() {
        let log = EventLog::default();
        let classifier = Arc::new(ScriptedClassifier::new(vec![Ok(RiskVerdict::new(
            RiskKind::Fire,
            "old camera fire",
            0.9,
        ))]));
        let provider = FakeProvider {
            live_refresh_delay: Duration::from_secs(2),
            ..FakeProvider::new(&log)
        };
        let shared: Arc<dyn Classifier> = classifier.clone();
        let monitor = Monitor::new(&MonitorConfig::default(), Ok(shared), Arc::new(provider)).unwrap();

        monitor.select_source(SourceSelection::Live).await.unwrap();
        // The tick at 7s is still refreshing when the switch starts
        sleep(Duration::from_secs(8)).await;
        monitor
            .select_source(SourceSelection::File { path: None })
            .await
            .unwrap();
        assert_eq!(log.count("capture:live"), 1);
        assert_eq!(log.count("release:live"), 1);

        sleep(Duration::from_secs(5)).await;
        let snapshot = monitor.snapshot().await;
        assert_eq!(classifier.calls(), 0);
        assert_eq!(snapshot.state.active_risk, RiskKind::None);
        assert!(snapshot.state.active_alert.is_none());
        assert!(snapshot.state.last_verdict.is_none());
        assert_eq!(snapshot.status, "Waiting for video file...");
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_failure_is_reported() {
        let log = EventLog::default();
        let classifier = Arc::new(ScriptedClassifier::new(vec![]));
        let monitor = monitor(
            &classifier,
            &log,
            Some(SourceError::PermissionDenied("camera access denied".into())),
        );

        let err = monitor.select_source(SourceSelection::Live).await.unwrap_err();
        assert!(matches!(err, MonitorError::Source(SourceError::PermissionDenied(_))));

        let snapshot = monitor.snapshot().await;
        assert_eq!(snapshot.state.error.map(|e| e.kind), Some(ErrorKind::Source));
        assert_eq!(snapshot.state.active_alert.map(|a| a.kind), Some(AlertKind::Error));

        sleep(Duration::from_secs(30)).await;
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_error_never_classifies() {
        let log = EventLog::default();
        let provider = FakeProvider::new(&log);
        let monitor = Monitor::new(
            &MonitorConfig::default(),
            Err(ClassifierError::MissingCredential("API_KEY")),
            Arc::new(provider),
        )
        .unwrap();

        monitor.select_source(SourceSelection::Live).await.unwrap();
        sleep(Duration::from_secs(30)).await;

        let snapshot = monitor.snapshot().await;
        assert_eq!(snapshot.state.phase, Phase::ConfigError);
        assert_eq!(snapshot.status, "API key not configured.");
        assert!(snapshot.state.last_verdict.is_none());
        assert!(!monitor.dismiss_error().await);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = MonitorConfig {
            min_confidence: -0.1,
            ..Default::default()
        };
        let log = EventLog::default();
        let provider = FakeProvider::new(&log);
        let result = Monitor::new(&config, Err(ClassifierError::MissingCredential("API_KEY")), Arc::new(provider));
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }
}
