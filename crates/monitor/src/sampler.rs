//! Periodic frame sampling
//!
//! The sampler owns the active [`VideoSource`]. On each tick it skips when
//! an analysis is in flight or the source is not ready, otherwise it
//! extracts one frame, downscales it, encodes it as JPEG and pushes it to
//! the frame sink. Switching sources stops and releases the old one before
//! the new one is acquired.
//!
//! Every frame carries the session generation its source was started under,
//! so a frame finished by a worker that is already being stopped can be told
//! apart from frames of the next source.

use frame_capture::{EncodedFrame, ExtractionConfig, Readiness, SourceError, SourceKind, VideoSource};
use metrics::counter;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::gate::InFlight;

/// An encoded frame tagged with the generation of the source that produced it
#[derive(Debug, Clone)]
pub struct SampledFrame {
    pub generation: u64,
    pub frame: EncodedFrame,
}

struct ActiveSource {
    kind: SourceKind,
    description: String,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Frame sampler
pub struct FrameSampler {
    period: Duration,
    extraction: ExtractionConfig,
    in_flight: InFlight,
    sink: Option<mpsc::Sender<SampledFrame>>,
    active: Option<ActiveSource>,
}

impl FrameSampler {
    pub fn new(period: Duration, extraction: ExtractionConfig, in_flight: InFlight) -> Self {
        Self {
            period,
            extraction,
            in_flight,
            sink: None,
            active: None,
        }
    }

    /// Register the consumer of extracted frames. Takes effect on the next `start`.
    pub fn on_frame(&mut self, sink: mpsc::Sender<SampledFrame>) {
        self.sink = Some(sink);
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_kind(&self) -> Option<SourceKind> {
        self.active.as_ref().map(|a| a.kind)
    }

    /// Stop any current source, acquire `source` and start ticking. Frames
    /// are tagged with `generation`. The first tick fires one period after a
    /// successful acquire.
    pub async fn start(&mut self, mut source: Box<dyn VideoSource>, generation: u64) -> Result<(), SourceError> {
        self.stop().await;

        let kind = source.kind();
        let description = source.describe();
        if let Err(e) = source.acquire().await {
            error!("Failed to acquire {}: {}", description, e);
            source.release().await;
            return Err(e);
        }
        info!("Sampling {} every {:?}", description, self.period);

        let (shutdown, shutdown_rx) = oneshot::channel();
        let worker = Worker {
            source,
            extraction: self.extraction,
            in_flight: self.in_flight.clone(),
            sink: self.sink.clone(),
            generation,
        };
        let task = tokio::spawn(worker.run(self.period, shutdown_rx));

        self.active = Some(ActiveSource {
            kind,
            description,
            shutdown,
            task,
        });
        Ok(())
    }

    /// Stop ticking and release the source. Returns once the source is released.
    pub async fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            let _ = active.shutdown.send(());
            if let Err(e) = active.task.await {
                warn!("Sampler task for {} ended abnormally: {}", active.description, e);
            }
            info!("Stopped sampling {}", active.description);
        }
    }
}

struct Worker {
    source: Box<dyn VideoSource>,
    extraction: ExtractionConfig,
    in_flight: InFlight,
    sink: Option<mpsc::Sender<SampledFrame>>,
    generation: u64,
}

impl Worker {
    async fn run(mut self, period: Duration, mut shutdown: oneshot::Receiver<()>) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                // Also fires when the sampler is dropped without `stop`
                _ = &mut shutdown => break,
                _ = ticker.tick() => self.tick().await,
            }
        }

        self.source.release().await;
    }

    async fn tick(&mut self) {
        if self.in_flight.is_set() {
            debug!("Tick skipped: analysis in flight");
            counter!("monitor_frames_skipped_total", "reason" => "in_flight").increment(1);
            return;
        }

        let Some(frame) = self.extract().await else {
            return;
        };

        let Some(sink) = &self.sink else {
            return;
        };
        let sampled = SampledFrame {
            generation: self.generation,
            frame,
        };
        if let Err(e) = sink.try_send(sampled) {
            debug!("Frame dropped: {}", e);
            counter!("monitor_frames_skipped_total", "reason" => "backpressure").increment(1);
        }
    }

    async fn extract(&mut self) -> Option<EncodedFrame> {
        if self.source.refresh().await < Readiness::Ready {
            debug!("Tick skipped: {} not ready", self.source.describe());
            counter!("monitor_frames_skipped_total", "reason" => "not_ready").increment(1);
            return None;
        }

        let Some(frame) = self.source.capture().await else {
            counter!("monitor_frames_skipped_total", "reason" => "stalled").increment(1);
            return None;
        };

        let sequence = frame.sequence;
        let frame = frame.fit_within(self.extraction.max_width, self.extraction.max_height);
        match frame.encode_jpeg(self.extraction.jpeg_quality) {
            Ok(encoded) => {
                debug!(
                    "Extracted frame #{} ({}x{}, {} bytes)",
                    sequence,
                    encoded.width,
                    encoded.height,
                    encoded.bytes.len()
                );
                counter!("monitor_frames_captured_total").increment(1);
                Some(encoded)
            }
            Err(e) => {
                warn!("Frame #{} could not be encoded: {}", sequence, e);
                counter!("monitor_frames_skipped_total", "reason" => "encode").increment(1);
                None
            }
        }
    }
}
