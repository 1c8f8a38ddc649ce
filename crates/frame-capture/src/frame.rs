//! Video frame types and JPEG transport encoding

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::SourceError;

/// MIME type of every encoded frame
pub const JPEG_MIME: &str = "image/jpeg";

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Extraction time
    pub captured_at: DateTime<Utc>,
    /// Frame sequence number within the current source
    pub sequence: u64,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            data,
            width,
            height,
            captured_at: Utc::now(),
            sequence,
        }
    }

    /// Decode a still image (JPEG or PNG) into an RGB frame
    pub fn decode(bytes: &[u8], sequence: u64) -> Result<Self, SourceError> {
        let rgb = image::load_from_memory(bytes)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(SourceError::Decode("empty image".to_string()));
        }
        Ok(Self::new(rgb.into_raw(), width, height, sequence))
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        let pixel = self.data.get(idx..idx + 3)?;
        Some([pixel[0], pixel[1], pixel[2]])
    }

    /// Resize frame (nearest neighbor)
    pub fn resize(&self, new_width: u32, new_height: u32) -> VideoFrame {
        let mut resized = Vec::with_capacity((new_width * new_height * 3) as usize);

        let x_ratio = self.width as f32 / new_width as f32;
        let y_ratio = self.height as f32 / new_height as f32;

        for y in 0..new_height {
            for x in 0..new_width {
                let x0 = ((x as f32 * x_ratio).floor() as u32).min(self.width.saturating_sub(1));
                let y0 = ((y as f32 * y_ratio).floor() as u32).min(self.height.saturating_sub(1));

                match self.get_pixel(x0, y0) {
                    Some(pixel) => resized.extend_from_slice(&pixel),
                    None => resized.extend_from_slice(&[0, 0, 0]),
                }
            }
        }

        VideoFrame {
            data: resized,
            width: new_width,
            height: new_height,
            captured_at: self.captured_at,
            sequence: self.sequence,
        }
    }

    /// Downscale to fit inside `max_width` x `max_height`, keeping aspect ratio.
    /// Frames already inside the box are returned unchanged.
    pub fn fit_within(self, max_width: u32, max_height: u32) -> VideoFrame {
        if self.width <= max_width && self.height <= max_height {
            return self;
        }
        let scale = f64::min(
            max_width as f64 / self.width as f64,
            max_height as f64 / self.height as f64,
        );
        let width = ((self.width as f64 * scale).round() as u32).max(1);
        let height = ((self.height as f64 * scale).round() as u32).max(1);
        self.resize(width, height)
    }

    /// Encode as JPEG at the given quality (1-100)
    pub fn encode_jpeg(&self, quality: u8) -> Result<EncodedFrame, SourceError> {
        let expected = self.width as usize * self.height as usize * 3;
        if self.data.len() != expected {
            return Err(SourceError::Decode(format!(
                "frame #{} holds {} bytes, {}x{} RGB needs {}",
                self.sequence,
                self.data.len(),
                self.width,
                self.height,
                expected
            )));
        }

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
            .encode(&self.data, self.width, self.height, ExtendedColorType::Rgb8)
            .map_err(|e| SourceError::Decode(format!("JPEG encode failed: {}", e)))?;

        Ok(EncodedFrame {
            bytes,
            width: self.width,
            height: self.height,
            captured_at: self.captured_at,
            sequence: self.sequence,
        })
    }
}

/// A still image ready to be sent to the classifier
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// JPEG bytes
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
    pub sequence: u64,
}

impl EncodedFrame {
    pub fn mime_type(&self) -> &'static str {
        JPEG_MIME
    }

    /// Standard base64 of the JPEG bytes (no data-URL prefix)
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

#[cfg(test)]
pub(crate) fn test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let data = vec![128u8; (width * height * 3) as usize];
    VideoFrame::new(data, width, height, 0)
        .encode_jpeg(90)
        .map(|f| f.bytes)
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gradient(width: u32, height: u32) -> VideoFrame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        VideoFrame::new(data, width, height, 7)
    }

    #[test]
    fn test_get_pixel_bounds() {
        let frame = gradient(4, 3);
        assert_eq!(frame.get_pixel(2, 1), Some([2, 1, 0]));
        assert_eq!(frame.get_pixel(4, 0), None);
        assert_eq!(frame.get_pixel(0, 3), None);
    }

    #[test]
    fn test_fit_within_keeps_aspect_ratio() {
        let frame = gradient(1280, 720).fit_within(640, 480);
        assert_eq!((frame.width, frame.height), (640, 360));
        assert_eq!(frame.data.len(), 640 * 360 * 3);
        assert_eq!(frame.sequence, 7);
    }

    #[test]
    fn test_fit_within_leaves_small_frames() {
        let frame = gradient(320, 240).fit_within(640, 480);
        assert_eq!((frame.width, frame.height), (320, 240));
    }

    #[test]
    fn test_encode_jpeg_produces_decodable_image() {
        let encoded = gradient(64, 48).encode_jpeg(80).unwrap();
        assert_eq!(&encoded.bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(encoded.mime_type(), "image/jpeg");

        let decoded = VideoFrame::decode(&encoded.bytes, 1).unwrap();
        assert_eq!((decoded.width, decoded.height), (64, 48));
    }

    #[test]
    fn test_mismatched_buffer_is_rejected() {
        let frame = VideoFrame::new(vec![0u8; 10], 4, 4, 3);
        let err = frame.encode_jpeg(80).unwrap_err();
        assert!(matches!(err, SourceError::Decode(msg) if msg.contains("needs 48")));
        assert_eq!(frame.get_pixel(3, 3), None);

        let resized = frame.resize(2, 2);
        assert_eq!(resized.data.len(), 2 * 2 * 3);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = VideoFrame::decode(b"definitely not an image", 0).unwrap_err();
        assert!(matches!(err, SourceError::Decode(_)));
    }

    #[test]
    fn test_base64_has_no_data_url_prefix() {
        let encoded = gradient(8, 8).encode_jpeg(80).unwrap();
        let b64 = encoded.to_base64();
        assert!(b64.starts_with("/9j/"));
        assert!(!b64.contains(','));
    }

    proptest! {
        #[test]
        fn prop_fit_within_stays_in_bounds(width in 1u32..2000, height in 1u32..2000) {
            let frame = VideoFrame::new(vec![0; (width * height * 3) as usize], width, height, 0);
            let fitted = frame.fit_within(640, 480);
            prop_assert!(fitted.width <= 640 && fitted.height <= 480);
            prop_assert!(fitted.width >= 1 && fitted.height >= 1);
            prop_assert_eq!(fitted.data.len(), (fitted.width * fitted.height * 3) as usize);
        }
    }
}
