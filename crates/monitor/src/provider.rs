//! Source construction from a user selection

use frame_capture::{CameraConfig, ClipSource, SnapshotCamera, VideoSource};

use crate::state::SourceSelection;

/// Builds video sources for the monitor
pub trait SourceProvider: Send + Sync {
    /// `None` when the selection names no concrete source yet
    fn open(&self, selection: &SourceSelection) -> Option<Box<dyn VideoSource>>;
}

/// Default provider: HTTP snapshot camera for live mode, clip files otherwise
#[derive(Debug, Clone)]
pub struct DeviceProvider {
    camera: CameraConfig,
    clip_fps: u32,
    clip_max_bytes: u64,
}

impl DeviceProvider {
    pub fn new(camera: CameraConfig, clip_fps: u32, clip_max_bytes: u64) -> Self {
        Self {
            camera,
            clip_fps,
            clip_max_bytes,
        }
    }
}

impl SourceProvider for DeviceProvider {
    fn open(&self, selection: &SourceSelection) -> Option<Box<dyn VideoSource>> {
        match selection {
            SourceSelection::Live => Some(Box::new(SnapshotCamera::new(self.camera.clone()))),
            SourceSelection::File { path: Some(path) } => {
                let clip = ClipSource::with_fps(path.clone(), self.clip_fps).with_max_bytes(self.clip_max_bytes);
                Some(Box::new(clip))
            }
            SourceSelection::File { path: None } => None,
        }
    }
}
