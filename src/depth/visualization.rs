// SPDX-License-Identifier: GPL-3.0-only

//! Grayscale views of depth maps and masks
//!
//! Depth is disparity after normalization, so larger values are nearer:
//! near = bright, far = dark. Mask weight 1 is white.

use super::mask::DepthMask;
use crate::backends::capture::{ColorFrame, DepthFrame, PixelFormat};
use image::{GrayImage, ImageBuffer, Luma};
use std::sync::Arc;

#[inline]
fn to_gray(v: f32) -> u8 {
    if v.is_finite() {
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    } else {
        0
    }
}

/// Expand unit-range values to an opaque gray frame
fn plane_to_frame(values: impl Iterator<Item = f32>, width: u32, height: u32, format: PixelFormat) -> ColorFrame {
    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for v in values {
        let g = to_gray(v);
        data.extend_from_slice(&[g, g, g, 255]);
    }
    ColorFrame {
        width,
        height,
        stride: width * 4,
        format,
        data: Arc::from(data.into_boxed_slice()),
        sequence: 0,
        presentation_time: Default::default(),
    }
}

/// Render a normalized depth frame as grayscale (near = bright)
pub fn depth_to_frame(depth: &DepthFrame, format: PixelFormat) -> ColorFrame {
    let values = (0..depth.height).flat_map(move |y| (0..depth.width).map(move |x| depth.get(x, y)));
    plane_to_frame(values, depth.width, depth.height, format)
}

/// Render a mask as grayscale (in focus = white)
pub fn mask_to_frame(mask: &DepthMask, format: PixelFormat) -> ColorFrame {
    plane_to_frame(mask.data.iter().copied(), mask.width, mask.height, format)
}

/// 8-bit grayscale image of a mask, for writing to disk
pub fn mask_to_luma8(mask: &DepthMask) -> GrayImage {
    ImageBuffer::from_fn(mask.width, mask.height, |x, y| Luma([to_gray(mask.get(x, y))]))
}

/// Read a grayscale image as a depth frame, scaled to `[0, 1]`
pub fn depth_from_luma8(image: &GrayImage) -> DepthFrame {
    let data = image.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
    DepthFrame {
        data,
        width: image.width(),
        height: image.height(),
        stride: image.width(),
        frame_index: 0,
        source_sequence: 0,
    }
}
