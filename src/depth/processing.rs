// SPDX-License-Identifier: MPL-2.0

//! Depth map preparation: normalization, noise reduction, orientation
//! and resampling.

use crate::backends::capture::{DepthFrame, SensorRotation};
use crate::constants::depth as depth_consts;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Cleanup applied to each depth frame before masking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthPreparation {
    /// Differences below this level are smoothed away, `[0, 0.1]`
    pub noise_level: f32,
    /// Unsharp re-sharpening amount, `[0, 1]`
    pub sharpness: f32,
    /// Rotation that aligns the depth map with the video
    pub orientation: SensorRotation,
}

impl Default for DepthPreparation {
    fn default() -> Self {
        Self {
            noise_level: depth_consts::DEFAULT_NOISE_LEVEL,
            sharpness: depth_consts::DEFAULT_SHARPNESS,
            orientation: SensorRotation::None,
        }
    }
}

impl DepthPreparation {
    /// No smoothing, no sharpening, no rotation
    pub fn passthrough() -> Self {
        Self {
            noise_level: 0.0,
            sharpness: 0.0,
            orientation: SensorRotation::None,
        }
    }

    /// Settings with both sliders clamped into range
    pub fn clamped(self) -> Self {
        let clamp = |v: f32, max: f32| if v.is_finite() { v.clamp(0.0, max) } else { 0.0 };
        Self {
            noise_level: clamp(self.noise_level, depth_consts::MAX_NOISE_LEVEL),
            sharpness: clamp(self.sharpness, depth_consts::MAX_SHARPNESS),
            orientation: self.orientation,
        }
    }

    pub fn apply(&self, frame: &DepthFrame) -> DepthFrame {
        let settings = self.clamped();
        let reduced = reduce_noise(frame, settings.noise_level, settings.sharpness);
        rotate(&reduced, settings.orientation)
    }
}

/// Rescale finite values to `[0, 1]` using the frame's own min/max.
///
/// A flat frame (or one with no finite values) becomes all zeros.
pub fn normalize_in_place(frame: &mut DepthFrame) {
    let (min, max) = frame
        .data
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let range = max - min;
    if !range.is_finite() || range <= f32::EPSILON {
        trace!(min, max, "Degenerate depth range, zeroing frame");
        frame.data.iter_mut().for_each(|v| *v = 0.0);
        return;
    }

    for v in &mut frame.data {
        *v = if v.is_finite() { (*v - min) / range } else { 0.0 };
    }
}

/// Mean of the 3x3 neighbourhood with clamped edges
fn box3(data: &[f32], width: usize, height: usize, x: usize, y: usize) -> f32 {
    let mut sum = 0.0;
    for dy in [-1i64, 0, 1] {
        let yy = (y as i64 + dy).clamp(0, height as i64 - 1) as usize;
        for dx in [-1i64, 0, 1] {
            let xx = (x as i64 + dx).clamp(0, width as i64 - 1) as usize;
            sum += data[yy * width + xx];
        }
    }
    sum / 9.0
}

/// Thresholded smoothing followed by unsharp re-sharpening.
///
/// Pixels that differ from their neighbourhood mean by no more than
/// `noise_level` are replaced by that mean; larger steps (object edges)
/// are kept. The smoothed map is then sharpened by `sharpness` and
/// clamped to `[0, 1]`.
pub fn reduce_noise(frame: &DepthFrame, noise_level: f32, sharpness: f32) -> DepthFrame {
    if (noise_level <= 0.0 && sharpness <= 0.0) || frame.is_empty() {
        return frame.clone();
    }

    let width = frame.width as usize;
    let height = frame.height as usize;
    let packed: Vec<f32> = (0..height)
        .flat_map(|y| {
            let start = y * frame.stride as usize;
            frame.data[start..start + width].iter().copied()
        })
        .collect();

    let mut smoothed = packed.clone();
    if noise_level > 0.0 {
        for y in 0..height {
            for x in 0..width {
                let mean = box3(&packed, width, height, x, y);
                let v = packed[y * width + x];
                if (v - mean).abs() <= noise_level {
                    smoothed[y * width + x] = mean;
                }
            }
        }
    }

    let mut out = smoothed.clone();
    if sharpness > 0.0 {
        for y in 0..height {
            for x in 0..width {
                let v = smoothed[y * width + x];
                let mean = box3(&smoothed, width, height, x, y);
                out[y * width + x] = (v + sharpness * (v - mean)).clamp(0.0, 1.0);
            }
        }
    }

    DepthFrame {
        data: out,
        width: frame.width,
        height: frame.height,
        stride: frame.width,
        frame_index: frame.frame_index,
        source_sequence: frame.source_sequence,
    }
}

/// Rotate clockwise by `rotation`
pub fn rotate(frame: &DepthFrame, rotation: SensorRotation) -> DepthFrame {
    if rotation == SensorRotation::None {
        return frame.clone();
    }

    let (w, h) = (frame.width, frame.height);
    let (out_w, out_h) = if rotation.swaps_dimensions() { (h, w) } else { (w, h) };
    let mut data = Vec::with_capacity(frame.len());
    for y in 0..out_h {
        for x in 0..out_w {
            let (sx, sy) = match rotation {
                SensorRotation::Rotate90 => (y, h - 1 - x),
                SensorRotation::Rotate180 => (w - 1 - x, h - 1 - y),
                SensorRotation::Rotate270 => (w - 1 - y, x),
                SensorRotation::None => (x, y),
            };
            data.push(frame.get(sx, sy));
        }
    }

    DepthFrame {
        data,
        width: out_w,
        height: out_h,
        stride: out_w,
        frame_index: frame.frame_index,
        source_sequence: frame.source_sequence,
    }
}

/// Catmull-Rom resample of a packed single-channel plane.
///
/// Returns `None` if `data` does not match `width * height`.
pub fn resample_plane(
    data: Vec<f32>,
    width: u32,
    height: u32,
    out_width: u32,
    out_height: u32,
) -> Option<Vec<f32>> {
    if (width, height) == (out_width, out_height) {
        return (data.len() == width as usize * height as usize).then_some(data);
    }
    let buffer: ImageBuffer<Luma<f32>, Vec<f32>> = ImageBuffer::from_raw(width, height, data)?;
    let resized = imageops::resize(&buffer, out_width, out_height, FilterType::CatmullRom);
    Some(
        resized
            .into_raw()
            .into_iter()
            .map(|v| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32, data: Vec<f32>) -> DepthFrame {
        DepthFrame::new(width, height, data).unwrap()
    }

    #[test]
    fn test_normalize_spans_unit_range() {
        let mut f = frame(2, 2, vec![2.0, 4.0, 6.0, f32::NAN]);
        normalize_in_place(&mut f);
        assert_eq!(f.data, vec![0.0, 0.5, 1.0, 0.0]);
    }

    #[test]
    fn test_normalize_flat_frame_is_zero() {
        let mut f = frame(2, 1, vec![3.0, 3.0]);
        normalize_in_place(&mut f);
        assert_eq!(f.data, vec![0.0, 0.0]);
    }

    #[test]
    fn test_noise_reduction_keeps_edges() {
        // left half near, right half far, with a small speck of noise
        let mut data = vec![0.0; 36];
        for y in 0..6 {
            for x in 3..6 {
                data[y * 6 + x] = 1.0;
            }
        }
        data[7] = 0.02;
        let f = frame(6, 6, data);
        let out = reduce_noise(&f, 0.05, 0.0);
        assert!(out.get(1, 1) < 0.02, "speck should be smoothed");
        assert!(out.get(0, 0) < 0.01);
        assert_eq!(out.get(5, 5), 1.0);
        assert_eq!(out.get(2, 2), 0.0, "edge pixel should not be averaged");
    }

    #[test]
    fn test_rotate_90_moves_top_left_to_top_right() {
        // 3x2:
        // 1 2 3
        // 4 5 6
        let f = frame(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let r = rotate(&f, SensorRotation::Rotate90);
        assert_eq!((r.width, r.height), (2, 3));
        assert_eq!(r.data, vec![4.0, 1.0, 5.0, 2.0, 6.0, 3.0]);

        let back = rotate(&rotate(&r, SensorRotation::Rotate180), SensorRotation::Rotate90);
        assert_eq!(back.data, f.data);
    }

    #[test]
    fn test_preparation_clamps_sliders() {
        let prep = DepthPreparation {
            noise_level: 5.0,
            sharpness: -1.0,
            orientation: SensorRotation::None,
        }
        .clamped();
        assert_eq!(prep.noise_level, depth_consts::MAX_NOISE_LEVEL);
        assert_eq!(prep.sharpness, 0.0);
    }
}
