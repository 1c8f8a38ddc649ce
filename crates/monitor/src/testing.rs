//! Test doubles for sources and classifiers

use async_trait::async_trait;
use frame_capture::{EncodedFrame, Readiness, SourceError, SourceKind, VideoFrame, VideoSource};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vision_classifier::{Classifier, ClassifierError, RiskVerdict};

use crate::sampler::SampledFrame;

/// Shared record of source lifecycle calls, e.g. `acquire:cam`, `release:cam`
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

/// In-memory source producing solid gray frames
pub struct FakeSource {
    name: String,
    kind: SourceKind,
    log: EventLog,
    /// Readiness reported by successive `refresh` calls; the last value repeats
    readiness: VecDeque<Readiness>,
    current: Readiness,
    fail_acquire: Option<SourceError>,
    width: u32,
    height: u32,
    sequence: u64,
    refresh_delay: Duration,
}

impl FakeSource {
    pub fn new(name: &str, log: &EventLog) -> Self {
        Self {
            name: name.to_string(),
            kind: SourceKind::Live,
            log: log.clone(),
            readiness: VecDeque::new(),
            current: Readiness::Unavailable,
            fail_acquire: None,
            width: 32,
            height: 24,
            sequence: 0,
            refresh_delay: Duration::ZERO,
        }
    }

    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_readiness(mut self, script: &[Readiness]) -> Self {
        self.readiness = script.iter().copied().collect();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Make each `refresh` take `delay`, like a slow snapshot fetch
    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    pub fn failing(mut self, err: SourceError) -> Self {
        self.fail_acquire = Some(err);
        self
    }
}

#[async_trait]
impl VideoSource for FakeSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn describe(&self) -> String {
        format!("fake source {}", self.name)
    }

    async fn acquire(&mut self) -> Result<(), SourceError> {
        self.log.push(format!("acquire:{}", self.name));
        if let Some(err) = self.fail_acquire.clone() {
            return Err(err);
        }
        self.current = Readiness::Ready;
        Ok(())
    }

    fn readiness(&self) -> Readiness {
        self.current
    }

    async fn refresh(&mut self) -> Readiness {
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }
        if let Some(next) = self.readiness.pop_front() {
            self.current = next;
            if self.readiness.is_empty() {
                self.readiness.push_back(next);
            }
        }
        self.current
    }

    async fn capture(&mut self) -> Option<VideoFrame> {
        if self.current != Readiness::Ready {
            return None;
        }
        self.sequence += 1;
        self.log.push(format!("capture:{}", self.name));
        let data = vec![128u8; (self.width * self.height * 3) as usize];
        Some(VideoFrame::new(data, self.width, self.height, self.sequence))
    }

    async fn release(&mut self) {
        self.log.push(format!("release:{}", self.name));
        self.current = Readiness::Unavailable;
    }
}

/// Build a small encoded frame from the initial source generation
pub fn sampled_frame(sequence: u64) -> SampledFrame {
    let frame = VideoFrame::new(vec![100u8; 8 * 8 * 3], 8, 8, sequence)
        .encode_jpeg(80)
        .unwrap();
    SampledFrame { generation: 0, frame }
}

/// Classifier replaying scripted results, optionally after a delay
pub struct ScriptedClassifier {
    script: Mutex<VecDeque<Result<RiskVerdict, ClassifierError>>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new(script: Vec<Result<RiskVerdict, ClassifierError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, _frame: &EncodedFrame) -> Result<RiskVerdict, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(RiskVerdict::new(vision_classifier::RiskKind::None, "quiet", 0.9)))
    }
}
