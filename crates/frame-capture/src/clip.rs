//! Uploaded clip source
//!
//! Plays a Motion-JPEG stream file (concatenated JPEG images) or a single
//! still image. Playback follows the wall clock at the clip frame rate and
//! loops indefinitely.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::source::{Readiness, SourceKind, VideoSource};
use crate::{check_size, SourceError, VideoFrame};

/// Default playback rate for Motion-JPEG clips
pub const DEFAULT_CLIP_FPS: u32 = 15;

/// Largest clip file accepted
pub const DEFAULT_MAX_CLIP_BYTES: u64 = 256 * 1024 * 1024;

/// Looping clip file source
pub struct ClipSource {
    path: PathBuf,
    fps: u32,
    max_bytes: u64,
    frames: Vec<Vec<u8>>,
    started: Option<Instant>,
    readiness: Readiness,
    sequence: u64,
}

impl ClipSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_fps(path, DEFAULT_CLIP_FPS)
    }

    pub fn with_fps(path: impl Into<PathBuf>, fps: u32) -> Self {
        Self {
            path: path.into(),
            fps: fps.max(1),
            max_bytes: DEFAULT_MAX_CLIP_BYTES,
            frames: Vec::new(),
            started: None,
            readiness: Readiness::Unavailable,
            sequence: 0,
        }
    }

    /// Refuse clip files larger than `max_bytes`
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of decoded-frame slots in the clip
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Clip frame index for a playback position, wrapping at the end
    pub fn frame_index_at(&self, elapsed_secs: f64) -> usize {
        if self.frames.is_empty() {
            return 0;
        }
        let position = (elapsed_secs.max(0.0) * self.fps as f64) as u64;
        (position % self.frames.len() as u64) as usize
    }

    fn is_mjpeg(&self) -> bool {
        matches!(
            self.path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
                .as_deref(),
            Some("mjpeg") | Some("mjpg")
        )
    }
}

/// Split a Motion-JPEG byte stream into individual JPEG images
pub fn split_mjpeg(data: &[u8]) -> Vec<&[u8]> {
    let mut frames = Vec::new();
    let mut pos = 0;

    while let Some(offset) = find_soi(&data[pos..]) {
        let start = pos + offset;
        match jpeg_end(data, start) {
            Some(end) => {
                frames.push(&data[start..end]);
                pos = end;
            }
            None => break,
        }
    }

    frames
}

fn find_soi(data: &[u8]) -> Option<usize> {
    data.windows(3).position(|w| w == [0xFF, 0xD8, 0xFF])
}

/// Walk JPEG segments from the SOI at `start`; returns the index just past EOI
fn jpeg_end(data: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 2;

    loop {
        if *data.get(i)? != 0xFF {
            return None;
        }
        while *data.get(i + 1)? == 0xFF {
            i += 1;
        }
        let marker = *data.get(i + 1)?;
        i += 2;

        match marker {
            0xD9 => return Some(i),
            0x01 | 0xD0..=0xD7 => continue,
            _ => {
                let len = u16::from_be_bytes([*data.get(i)?, *data.get(i + 1)?]) as usize;
                if len < 2 {
                    return None;
                }
                i += len;

                if marker == 0xDA {
                    // Entropy-coded data runs until the next non-stuffed, non-RST marker
                    loop {
                        let byte = *data.get(i)?;
                        let next = *data.get(i + 1)?;
                        if byte == 0xFF && next != 0x00 && !(0xD0..=0xD7).contains(&next) {
                            break;
                        }
                        i += 1;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl VideoSource for ClipSource {
    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    fn describe(&self) -> String {
        format!("clip {}", self.path.display())
    }

    async fn acquire(&mut self) -> Result<(), SourceError> {
        info!("Opening clip: {}", self.path.display());

        let file = tokio::fs::File::open(&self.path).await?;
        let mut data = Vec::new();
        file.take(self.max_bytes.saturating_add(1))
            .read_to_end(&mut data)
            .await?;
        check_size(data.len() as u64, self.max_bytes, &self.describe())?;

        let frames: Vec<Vec<u8>> = if self.is_mjpeg() {
            split_mjpeg(&data).into_iter().map(<[u8]>::to_vec).collect()
        } else {
            vec![data]
        };

        let first = frames
            .first()
            .ok_or_else(|| SourceError::Decode(format!("{} has no frames", self.path.display())))?;
        VideoFrame::decode(first, 0)?;

        debug!("Clip {} holds {} frames", self.path.display(), frames.len());
        self.frames = frames;
        self.started = Some(Instant::now());
        self.readiness = Readiness::Ready;
        Ok(())
    }

    fn readiness(&self) -> Readiness {
        self.readiness
    }

    async fn refresh(&mut self) -> Readiness {
        self.readiness = if self.frames.is_empty() {
            Readiness::Unavailable
        } else {
            Readiness::Ready
        };
        self.readiness
    }

    async fn capture(&mut self) -> Option<VideoFrame> {
        let elapsed = self.started?.elapsed().as_secs_f64();
        let index = self.frame_index_at(elapsed);
        let bytes = self.frames.get(index)?;

        self.sequence += 1;
        match VideoFrame::decode(bytes, self.sequence) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("Skipping undecodable clip frame {}: {}", index, e);
                self.readiness = Readiness::Buffering;
                None
            }
        }
    }

    async fn release(&mut self) {
        if !self.frames.is_empty() {
            info!("Clip released: {}", self.path.display());
        }
        self.frames.clear();
        self.started = None;
        self.readiness = Readiness::Unavailable;
    }
}
