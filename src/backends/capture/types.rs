// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for synchronized color + depth capture

use crate::errors::CaptureError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Interleaved 4-channel pixel layout of a [`ColorFrame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// B G R A byte order (native output of most capture devices)
    #[default]
    Bgra,
    /// R G B A byte order
    Rgba,
}

impl PixelFormat {
    /// Byte offsets of the red, green and blue channels within a pixel
    pub fn rgb_offsets(&self) -> (usize, usize, usize) {
        match self {
            PixelFormat::Bgra => (2, 1, 0),
            PixelFormat::Rgba => (0, 1, 2),
        }
    }

    /// Convert to a GStreamer video/x-raw format string.
    pub fn to_gst_format_string(&self) -> &'static str {
        match self {
            PixelFormat::Bgra => "BGRA",
            PixelFormat::Rgba => "RGBA",
        }
    }

    /// Parse format from GStreamer format string
    pub fn from_gst_format(format: &str) -> Option<Self> {
        match format {
            "BGRA" | "BGRx" => Some(PixelFormat::Bgra),
            "RGBA" | "RGBx" => Some(PixelFormat::Rgba),
            _ => None,
        }
    }
}

/// One video sample.
///
/// Pixel data is reference counted so the same frame can be handed to the
/// writer and kept as the passthrough source without copying.
#[derive(Debug, Clone)]
pub struct ColorFrame {
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    pub format: PixelFormat,
    pub data: Arc<[u8]>,
    /// Source sequence number (monotonic per capture session)
    pub sequence: u64,
    /// Timestamp relative to the start of the clip
    pub presentation_time: Duration,
}

impl ColorFrame {
    /// Create a tightly packed frame. Returns `None` if `data` is too short.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: impl Into<Arc<[u8]>>) -> Option<Self> {
        let data = data.into();
        if data.len() < width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            stride: width * 4,
            format,
            data,
            sequence: 0,
            presentation_time: Duration::ZERO,
        })
    }

    /// Solid-color frame, mostly useful for tests and synthetic sources
    pub fn filled(width: u32, height: u32, format: PixelFormat, pixel: [u8; 4]) -> Self {
        let data: Vec<u8> = pixel
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            stride: width * 4,
            format,
            data: Arc::from(data.into_boxed_slice()),
            sequence: 0,
            presentation_time: Duration::ZERO,
        }
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_presentation_time(mut self, presentation_time: Duration) -> Self {
        self.presentation_time = presentation_time;
        self
    }

    /// Raw bytes of the pixel at (x, y) in the frame's own channel order
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = y as usize * self.stride as usize + x as usize * 4;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.data[offset..offset + 4]);
        out
    }

    /// One row of pixels without stride padding
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride as usize;
        &self.data[start..start + self.width as usize * 4]
    }

    /// Pixel bytes with any stride padding removed
    pub fn packed_data(&self) -> Vec<u8> {
        if self.stride == self.width * 4 {
            return self.data[..self.width as usize * self.height as usize * 4].to_vec();
        }
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            out.extend_from_slice(self.row(y));
        }
        out
    }

    /// Compare pixels (ignoring stride padding and timing)
    pub fn same_pixels(&self, other: &ColorFrame) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.format == other.format
            && (0..self.height).all(|y| self.row(y) == other.row(y))
    }
}

/// Interpretation of the values in a depth buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthDataKind {
    /// Inverse distance (larger = nearer)
    #[default]
    Disparity,
    /// Metric distance (larger = farther); converted to disparity on copy
    Depth,
}

/// Transient depth buffer lent by a capture source for one instant.
///
/// The buffer is only valid during delivery; recording takes a deep copy
/// via [`DepthFrame::copy_from`].
#[derive(Debug, Clone, Copy)]
pub struct DepthBuffer<'a> {
    pub data: &'a [f32],
    pub width: u32,
    pub height: u32,
    /// Row stride in elements
    pub stride: u32,
    pub kind: DepthDataKind,
    pub sequence: u64,
}

/// Owned depth/disparity sample.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFrame {
    pub data: Vec<f32>,
    pub width: u32,
    pub height: u32,
    /// Row stride in elements
    pub stride: u32,
    /// Index of the clip frame this sample belongs to
    pub frame_index: u64,
    /// Sequence number of the capture instant it was copied from
    pub source_sequence: u64,
}

impl DepthFrame {
    /// Packed frame from row-major values. Returns `None` on a size mismatch.
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
            stride: width,
            frame_index: 0,
            source_sequence: 0,
        })
    }

    /// Deep copy of a transient buffer. Stride padding is dropped and metric
    /// depth is converted to disparity (1/d, 0 where d is not positive).
    pub fn copy_from(buffer: &DepthBuffer<'_>) -> CaptureResult<Self> {
        let width = buffer.width as usize;
        let height = buffer.height as usize;
        let stride = buffer.stride as usize;
        if stride < width || (height > 0 && buffer.data.len() < stride * (height - 1) + width) {
            return Err(CaptureError::FrameDropped(DropReason::MalformedBuffer));
        }

        let mut data = Vec::with_capacity(width * height);
        for row in 0..height {
            let start = row * stride;
            data.extend_from_slice(&buffer.data[start..start + width]);
        }

        if buffer.kind == DepthDataKind::Depth {
            for v in &mut data {
                *v = if *v > 0.0 && v.is_finite() { 1.0 / *v } else { 0.0 };
            }
        }

        Ok(Self {
            data,
            width: buffer.width,
            height: buffer.height,
            stride: buffer.width,
            frame_index: 0,
            source_sequence: buffer.sequence,
        })
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.stride as usize + x as usize]
    }

    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Framerate as a fraction (numerator/denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Framerate {
    pub num: u32,
    pub denom: u32,
}

impl Framerate {
    /// Create a new framerate from numerator and denominator
    pub fn new(num: u32, denom: u32) -> Self {
        Self {
            num,
            denom: if denom == 0 { 1 } else { denom },
        }
    }

    /// Create a framerate from an integer (e.g., 30 becomes 30/1)
    pub fn from_int(fps: u32) -> Self {
        Self { num: fps, denom: 1 }
    }

    /// Get the framerate as a floating point value
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.denom as f64
    }

    /// Duration of one frame
    pub fn frame_duration(&self) -> Duration {
        self.presentation_time(1)
    }

    /// Presentation timestamp of frame `index`, rounded to the nearest nanosecond
    pub fn presentation_time(&self, index: u64) -> Duration {
        if self.num == 0 {
            return Duration::ZERO;
        }
        let num = self.num as u128;
        let nanos = (index as u128 * self.denom as u128 * NANOS_PER_SEC + num / 2) / num;
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }

    /// Frame index shown at `time`: `floor(time * rate)`.
    ///
    /// One nanosecond of slack absorbs the rounding applied by
    /// [`presentation_time`](Self::presentation_time), so
    /// `frame_index_at(presentation_time(i)) == i`.
    pub fn frame_index_at(&self, time: Duration) -> u64 {
        let nanos = time.as_nanos() + 1;
        let index = nanos * self.num as u128 / (self.denom as u128 * NANOS_PER_SEC);
        index.min(u64::MAX as u128) as u64
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.denom != 1 {
            write!(f, "{:.2}", self.as_f64())
        } else {
            write!(f, "{}", self.num)
        }
    }
}

impl Default for Framerate {
    fn default() -> Self {
        Self::from_int(crate::constants::NOMINAL_FRAME_RATE)
    }
}

/// Rotation in degrees (clockwise) applied to depth maps so they line up
/// with the video orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SensorRotation {
    #[default]
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl SensorRotation {
    pub fn degrees(&self) -> u32 {
        match self {
            SensorRotation::None => 0,
            SensorRotation::Rotate90 => 90,
            SensorRotation::Rotate180 => 180,
            SensorRotation::Rotate270 => 270,
        }
    }

    /// Check if rotation swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, SensorRotation::Rotate90 | SensorRotation::Rotate270)
    }
}

impl std::fmt::Display for SensorRotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Why the source dropped one member of a synchronized pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Discontinuity,
    LateData,
    OutOfBuffers,
    /// Delivered, but too short for its declared geometry
    MalformedBuffer,
    /// Reason not reported by the device
    None,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::Discontinuity => write!(f, "discontinuity"),
            DropReason::LateData => write!(f, "late data"),
            DropReason::OutOfBuffers => write!(f, "out of buffers"),
            DropReason::MalformedBuffer => write!(f, "malformed buffer"),
            DropReason::None => write!(f, "unspecified"),
        }
    }
}

/// One member of a synchronized pair: either the sample or why it is missing
#[derive(Debug, Clone)]
pub enum Synced<T> {
    Delivered(T),
    Dropped(DropReason),
}

impl<T> Synced<T> {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Synced::Delivered(_))
    }

    pub fn dropped_reason(&self) -> Option<DropReason> {
        match self {
            Synced::Delivered(_) => None,
            Synced::Dropped(reason) => Some(*reason),
        }
    }
}

/// Color and depth samples captured at the same instant
#[derive(Debug, Clone)]
pub struct SynchronizedSamplePair<'a> {
    pub color: Synced<ColorFrame>,
    pub depth: Synced<DepthBuffer<'a>>,
}

impl SynchronizedSamplePair<'_> {
    /// Both members present
    pub fn is_complete(&self) -> bool {
        self.color.is_delivered() && self.depth.is_delivered()
    }
}

/// A device (or simulation) that produces synchronized color + depth pairs.
///
/// Pairs borrow transient depth buffers owned by the source, so they are
/// handed to a callback rather than returned.
pub trait CaptureSource: Send {
    /// Configure the device. Failures are surfaced unchanged to the caller.
    fn configure(&mut self) -> CaptureResult<()> {
        Ok(())
    }

    /// Nominal delivery rate
    fn frame_rate(&self) -> Framerate;

    /// Deliver the next pair. Returns `Ok(false)` once the source is exhausted.
    fn next_pair(
        &mut self,
        deliver: &mut dyn FnMut(SynchronizedSamplePair<'_>),
    ) -> CaptureResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presentation_time_round_trips_to_index() {
        let rates = [
            Framerate::from_int(30),
            Framerate::new(30000, 1001),
            Framerate::from_int(24),
        ];
        for rate in rates {
            for i in [0u64, 1, 2, 29, 30, 299, 1001, 10_000] {
                let t = rate.presentation_time(i);
                assert_eq!(rate.frame_index_at(t), i, "rate {} index {}", rate, i);
            }
        }
    }

    #[test]
    fn test_frame_index_floors_mid_frame() {
        let rate = Framerate::from_int(30);
        let mid = rate.presentation_time(3) + Duration::from_millis(10);
        assert_eq!(rate.frame_index_at(mid), 3);
    }

    #[test]
    fn test_depth_copy_drops_stride_padding() {
        let values = [1.0, 2.0, -1.0, 3.0, 4.0, -1.0];
        let buffer = DepthBuffer {
            data: &values,
            width: 2,
            height: 2,
            stride: 3,
            kind: DepthDataKind::Disparity,
            sequence: 7,
        };
        let frame = DepthFrame::copy_from(&buffer).unwrap();
        assert_eq!(frame.data, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(frame.stride, 2);
        assert_eq!(frame.source_sequence, 7);
    }

    #[test]
    fn test_depth_copy_converts_metric_depth() {
        let values = [2.0, 0.0, 4.0, f32::NAN];
        let buffer = DepthBuffer {
            data: &values,
            width: 2,
            height: 2,
            stride: 2,
            kind: DepthDataKind::Depth,
            sequence: 0,
        };
        let frame = DepthFrame::copy_from(&buffer).unwrap();
        assert_eq!(frame.data, vec![0.5, 0.0, 0.25, 0.0]);
    }

    #[test]
    fn test_depth_copy_rejects_short_buffer() {
        let values = [0.0; 3];
        let buffer = DepthBuffer {
            data: &values,
            width: 2,
            height: 2,
            stride: 2,
            kind: DepthDataKind::Disparity,
            sequence: 0,
        };
        assert_eq!(
            DepthFrame::copy_from(&buffer).unwrap_err(),
            CaptureError::FrameDropped(DropReason::MalformedBuffer)
        );
    }

    #[test]
    fn test_bgra_offsets() {
        let frame = ColorFrame::filled(1, 1, PixelFormat::Bgra, [10, 20, 30, 255]);
        let (r, g, b) = frame.format.rgb_offsets();
        let px = frame.pixel(0, 0);
        assert_eq!((px[r], px[g], px[b]), (30, 20, 10));
    }
}
