//! Live snapshot camera
//!
//! Pulls one JPEG per extraction from a camera's HTTP snapshot endpoint.
//! Only video is requested; nothing is kept after the frame is handed out.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::source::{Readiness, SourceKind, VideoSource};
use crate::{check_size, CameraConfig, SourceError, VideoFrame};

/// HTTP snapshot camera driver
pub struct SnapshotCamera {
    config: CameraConfig,
    client: Option<reqwest::Client>,
    buffered: Option<VideoFrame>,
    readiness: Readiness,
    sequence: u64,
}

impl SnapshotCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            client: None,
            buffered: None,
            readiness: Readiness::Unavailable,
            sequence: 0,
        }
    }

    async fn fetch(&mut self) -> Result<VideoFrame, SourceError> {
        let client = self.client.as_ref().ok_or(SourceError::NotAcquired)?;
        let url = &self.config.snapshot_url;

        let mut response = client
            .get(url)
            .header(reqwest::header::ACCEPT, "image/jpeg")
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        if let Some(err) = status_error(response.status(), url) {
            return Err(err);
        }

        let max = self.config.max_snapshot_bytes;
        if let Some(len) = response.content_length() {
            check_size(len, max, url)?;
        }
        // Content-Length may be absent or wrong; enforce the limit while reading
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| transport_error(url, e))? {
            body.extend_from_slice(&chunk);
            check_size(body.len() as u64, max, url)?;
        }

        self.sequence += 1;
        VideoFrame::decode(&body, self.sequence)
    }
}

/// Map an HTTP status from the camera to an acquisition error
pub(crate) fn status_error(status: StatusCode, url: &str) -> Option<SourceError> {
    if status.is_success() {
        return None;
    }
    let detail = format!("{} returned {}", url, status);
    Some(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::PermissionDenied(detail),
        StatusCode::NOT_FOUND | StatusCode::GONE => SourceError::NotFound(detail),
        StatusCode::CONFLICT | StatusCode::LOCKED | StatusCode::SERVICE_UNAVAILABLE => {
            SourceError::Busy(detail)
        }
        _ => SourceError::Io(detail),
    })
}

fn transport_error(url: &str, err: reqwest::Error) -> SourceError {
    if err.is_connect() {
        SourceError::NotFound(format!("{} unreachable: {}", url, err))
    } else if err.is_timeout() {
        SourceError::Busy(format!("{} timed out", url))
    } else {
        SourceError::Io(err.to_string())
    }
}

#[async_trait]
impl VideoSource for SnapshotCamera {
    fn kind(&self) -> SourceKind {
        SourceKind::Live
    }

    fn describe(&self) -> String {
        format!("live camera {}", self.config.snapshot_url)
    }

    async fn acquire(&mut self) -> Result<(), SourceError> {
        info!("Opening live camera: {}", self.config.snapshot_url);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .build()
            .map_err(|e| SourceError::Io(e.to_string()))?;
        self.client = Some(client);

        // Probe once so permission/absence/busy surface at acquisition time
        match self.fetch().await {
            Ok(frame) => {
                debug!("Camera probe ok: {}x{}", frame.width, frame.height);
                self.readiness = Readiness::Ready;
                Ok(())
            }
            Err(e) => {
                self.client = None;
                self.readiness = Readiness::Unavailable;
                Err(e)
            }
        }
    }

    fn readiness(&self) -> Readiness {
        self.readiness
    }

    async fn refresh(&mut self) -> Readiness {
        if self.client.is_none() {
            return Readiness::Unavailable;
        }
        match self.fetch().await {
            Ok(frame) => {
                self.buffered = Some(frame);
                self.readiness = Readiness::Ready;
            }
            Err(e) => {
                warn!("Live camera stalled: {}", e);
                self.buffered = None;
                self.readiness = Readiness::Buffering;
            }
        }
        self.readiness
    }

    async fn capture(&mut self) -> Option<VideoFrame> {
        self.buffered.take()
    }

    async fn release(&mut self) {
        if self.client.take().is_some() {
            info!("Live camera released: {}", self.config.snapshot_url);
        }
        self.buffered = None;
        self.readiness = Readiness::Unavailable;
    }
}
