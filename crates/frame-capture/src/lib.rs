//! Frame Capture Library for Home Monitoring
//!
//! Owns the video sources the sampler pulls stills from:
//! - Live snapshot camera (HTTP JPEG endpoint, video only)
//! - Uploaded clip file (Motion-JPEG stream or still image), looped forever
//!
//! Frames are decoded to RGB, downscaled and re-encoded as JPEG for transport.

pub mod camera;
pub mod clip;
pub mod frame;
pub mod source;

pub use camera::SnapshotCamera;
pub use clip::ClipSource;
pub use frame::{EncodedFrame, VideoFrame, JPEG_MIME};
pub use source::{Readiness, SourceKind, VideoSource};

use thiserror::Error;

/// Source acquisition and decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Device busy: {0}")]
    Busy(String),

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Source not acquired")]
    NotAcquired,
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => SourceError::NotFound(err.to_string()),
            std::io::ErrorKind::PermissionDenied => SourceError::PermissionDenied(err.to_string()),
            _ => SourceError::Io(err.to_string()),
        }
    }
}

impl From<image::ImageError> for SourceError {
    fn from(err: image::ImageError) -> Self {
        SourceError::Decode(err.to_string())
    }
}

/// Largest snapshot body accepted from the live camera
pub const DEFAULT_MAX_SNAPSHOT_BYTES: u64 = 8 * 1024 * 1024;

/// Live camera configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Snapshot endpoint (e.g., "http://192.168.1.20/snapshot.jpg")
    pub snapshot_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Snapshot bodies larger than this are rejected
    pub max_snapshot_bytes: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            snapshot_url: "http://127.0.0.1:8081/snapshot.jpg".to_string(),
            timeout_ms: 3000,
            max_snapshot_bytes: DEFAULT_MAX_SNAPSHOT_BYTES,
        }
    }
}

/// Reject payloads over `max` bytes
pub(crate) fn check_size(len: u64, max: u64, what: &str) -> Result<(), SourceError> {
    if len > max {
        return Err(SourceError::Decode(format!(
            "{} is {} bytes, limit is {}",
            what, len, max
        )));
    }
    Ok(())
}

/// Frame extraction settings shared by all sources
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionConfig {
    /// Maximum width of an extracted frame
    pub max_width: u32,
    /// Maximum height of an extracted frame
    pub max_height: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_width: 640,
            max_height: 480,
            jpeg_quality: 80,
        }
    }
}
