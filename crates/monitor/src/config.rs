//! Monitor configuration

use frame_capture::{CameraConfig, ExtractionConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::MonitorError;

/// Monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Sampling period (milliseconds)
    pub analysis_interval_ms: u64,

    /// Minimum verdict confidence that raises an alert
    pub min_confidence: f64,

    /// JPEG quality for frames sent to the classifier (1-100)
    pub jpeg_quality: u8,

    /// Extracted frames are downscaled to fit this box
    pub max_width: u32,
    pub max_height: u32,

    /// Live camera snapshot endpoint
    pub camera_url: String,
    pub camera_timeout_ms: u64,
    /// Largest snapshot body accepted from the camera
    pub camera_max_bytes: u64,

    /// Playback rate for Motion-JPEG clips
    pub clip_fps: u32,
    /// Largest clip file accepted
    pub clip_max_bytes: u64,

    /// Cooldown between announcements of the same risk (seconds)
    pub alert_cooldown_seconds: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let camera = CameraConfig::default();
        let extraction = ExtractionConfig::default();
        Self {
            analysis_interval_ms: 7000,
            min_confidence: alerting::DEFAULT_MIN_CONFIDENCE,
            jpeg_quality: extraction.jpeg_quality,
            max_width: extraction.max_width,
            max_height: extraction.max_height,
            camera_url: camera.snapshot_url,
            camera_timeout_ms: camera.timeout_ms,
            camera_max_bytes: camera.max_snapshot_bytes,
            clip_fps: frame_capture::clip::DEFAULT_CLIP_FPS,
            clip_max_bytes: frame_capture::clip::DEFAULT_MAX_CLIP_BYTES,
            alert_cooldown_seconds: 30,
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.analysis_interval_ms)
    }

    pub fn extraction(&self) -> ExtractionConfig {
        ExtractionConfig {
            max_width: self.max_width,
            max_height: self.max_height,
            jpeg_quality: self.jpeg_quality,
        }
    }

    pub fn camera(&self) -> CameraConfig {
        CameraConfig {
            snapshot_url: self.camera_url.clone(),
            timeout_ms: self.camera_timeout_ms,
            max_snapshot_bytes: self.camera_max_bytes,
        }
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.analysis_interval_ms == 0 {
            return Err(MonitorError::Config("analysis_interval_ms must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(MonitorError::Config(format!(
                "min_confidence {} outside [0, 1]",
                self.min_confidence
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(MonitorError::Config(format!(
                "jpeg_quality {} outside 1-100",
                self.jpeg_quality
            )));
        }
        if self.max_width == 0 || self.max_height == 0 {
            return Err(MonitorError::Config("frame bounds must be positive".into()));
        }
        if self.camera_max_bytes == 0 || self.clip_max_bytes == 0 {
            return Err(MonitorError::Config("source size limits must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.interval(), Duration::from_millis(7000));
        assert_eq!(config.min_confidence, 0.7);
        assert_eq!(config.extraction().jpeg_quality, 80);
        assert_eq!(config.camera().max_snapshot_bytes, 8 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let bad_threshold = MonitorConfig {
            min_confidence: 1.2,
            ..Default::default()
        };
        assert!(bad_threshold.validate().is_err());

        let bad_interval = MonitorConfig {
            analysis_interval_ms: 0,
            ..Default::default()
        };
        assert!(bad_interval.validate().is_err());

        let no_clip_budget = MonitorConfig {
            clip_max_bytes: 0,
            ..Default::default()
        };
        assert!(no_clip_budget.validate().is_err());
    }
}
