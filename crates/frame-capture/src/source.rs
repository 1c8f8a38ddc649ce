//! Video source abstraction

use async_trait::async_trait;

use crate::{SourceError, VideoFrame};

/// Source type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Live capture device
    Live,
    /// User-supplied clip file
    File,
}

/// How much data a source has buffered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Readiness {
    /// Not acquired, or released
    Unavailable,
    /// Acquired but cannot render a full frame right now
    Buffering,
    /// At least one full frame can be extracted
    Ready,
}

/// A video source exclusively owned by the frame sampler.
///
/// Lifecycle: `acquire` once, then per extraction `refresh` followed by
/// `capture` when the source reports `Ready`, then `release`. Releasing is
/// idempotent.
#[async_trait]
pub trait VideoSource: Send {
    fn kind(&self) -> SourceKind;

    /// Human-readable description for logs
    fn describe(&self) -> String;

    /// Open the underlying device or file
    async fn acquire(&mut self) -> Result<(), SourceError>;

    /// Last known readiness, without touching the device
    fn readiness(&self) -> Readiness;

    /// Buffer data for the next extraction and report the resulting readiness
    async fn refresh(&mut self) -> Readiness;

    /// Extract the current frame. `None` means the source stalled between
    /// `refresh` and `capture`; the caller skips this extraction.
    async fn capture(&mut self) -> Option<VideoFrame>;

    /// Stop the device / drop decoded data
    async fn release(&mut self);
}
