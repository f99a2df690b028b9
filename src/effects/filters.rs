// SPDX-License-Identifier: MPL-2.0

//! CPU implementations of the mask-driven effects
//!
//! Both filters read the mask with clamped coordinates, so a mask that is
//! a pixel or two off the frame size (rounding of the depth scale) still
//! covers every pixel. Inputs are never modified.

use crate::backends::capture::ColorFrame;
use crate::constants::effects::{LUMA_B, LUMA_G, LUMA_R};
use crate::depth::DepthMask;
use std::sync::Arc;

/// Mask weight at a color pixel; an empty mask counts as fully in focus
#[inline]
fn mask_weight(mask: &DepthMask, x: u32, y: u32) -> f32 {
    if mask.width == 0 || mask.height == 0 {
        return 1.0;
    }
    mask.get_clamped(x as i64, y as i64)
}

fn output_frame(source: &ColorFrame, data: Vec<u8>) -> ColorFrame {
    ColorFrame {
        width: source.width,
        height: source.height,
        stride: source.width * 4,
        format: source.format,
        data: Arc::from(data.into_boxed_slice()),
        sequence: source.sequence,
        presentation_time: source.presentation_time,
    }
}

/// Keep color where the mask is 1, fade to the desaturated frame where it is 0.
pub fn color_highlight(image: &ColorFrame, mask: &DepthMask) -> ColorFrame {
    let (ri, gi, bi) = image.format.rgb_offsets();
    let mut out = Vec::with_capacity(image.width as usize * image.height as usize * 4);

    for y in 0..image.height {
        for (x, px) in image.row(y).chunks_exact(4).enumerate() {
            let m = mask_weight(mask, x as u32, y);
            let gray = LUMA_R * px[ri] as f32 + LUMA_G * px[gi] as f32 + LUMA_B * px[bi] as f32;

            let mut blended = [0u8; 4];
            for c in 0..3 {
                let v = gray + (px[c] as f32 - gray) * m;
                blended[c] = v.round().clamp(0.0, 255.0) as u8;
            }
            blended[3] = px[3];
            out.extend_from_slice(&blended);
        }
    }

    output_frame(image, out)
}

/// Per-channel summed-area table with a zero first row and column
struct SummedArea {
    sums: Vec<u64>,
    /// Width of the table (frame width + 1)
    cols: usize,
}

impl SummedArea {
    fn build(image: &ColorFrame) -> Self {
        let width = image.width as usize;
        let height = image.height as usize;
        let cols = width + 1;
        let mut sums = vec![0u64; cols * (height + 1) * 4];

        for y in 0..height {
            let row = image.row(y as u32);
            let mut running = [0u64; 4];
            for x in 0..width {
                for c in 0..4 {
                    running[c] += row[x * 4 + c] as u64;
                    let above = sums[(y * cols + x + 1) * 4 + c];
                    sums[((y + 1) * cols + x + 1) * 4 + c] = above + running[c];
                }
            }
        }

        Self { sums, cols }
    }

    /// Sum of channel `c` over the inclusive rectangle [x0, x1] x [y0, y1]
    #[inline]
    fn rect_sum(&self, x0: usize, y0: usize, x1: usize, y1: usize, c: usize) -> u64 {
        let at = |x: usize, y: usize| self.sums[(y * self.cols + x) * 4 + c];
        at(x1 + 1, y1 + 1) + at(x0, y0) - at(x0, y1 + 1) - at(x1 + 1, y0)
    }
}

/// Variable-radius box blur: radius `max_radius * (1 - mask)`.
///
/// In-focus pixels (mask 1) are copied unchanged. The box is clamped to
/// the frame, and each output averages only the pixels inside it.
pub fn variable_blur(image: &ColorFrame, mask: &DepthMask, max_radius: u32) -> ColorFrame {
    let width = image.width as usize;
    let height = image.height as usize;
    if width == 0 || height == 0 || max_radius == 0 {
        return output_frame(image, image.packed_data());
    }

    let table = SummedArea::build(image);
    let mut out = Vec::with_capacity(width * height * 4);

    for y in 0..height {
        let row = image.row(y as u32);
        for x in 0..width {
            let m = mask_weight(mask, x as u32, y as u32).clamp(0.0, 1.0);
            let radius = (max_radius as f32 * (1.0 - m)).round() as usize;
            if radius == 0 {
                out.extend_from_slice(&row[x * 4..x * 4 + 4]);
                continue;
            }

            let x0 = x.saturating_sub(radius);
            let y0 = y.saturating_sub(radius);
            let x1 = (x + radius).min(width - 1);
            let y1 = (y + radius).min(height - 1);
            let area = ((x1 - x0 + 1) * (y1 - y0 + 1)) as u64;

            for c in 0..4 {
                let sum = table.rect_sum(x0, y0, x1, y1, c);
                out.push(((sum + area / 2) / area) as u8);
            }
        }
    }

    output_frame(image, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::capture::PixelFormat;

    fn mask(width: u32, height: u32, value: f32) -> DepthMask {
        DepthMask {
            width,
            height,
            data: vec![value; (width * height) as usize],
        }
    }

    fn checkerboard(width: u32, height: u32) -> ColorFrame {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        ColorFrame::new(width, height, PixelFormat::Rgba, data).unwrap()
    }

    #[test]
    fn test_color_highlight_extremes() {
        let frame = ColorFrame::filled(2, 2, PixelFormat::Rgba, [200, 40, 10, 128]);

        let kept = color_highlight(&frame, &mask(2, 2, 1.0));
        assert!(kept.same_pixels(&frame));

        let gray = color_highlight(&frame, &mask(2, 2, 0.0));
        let px = gray.pixel(1, 1);
        let expected = (0.299f32 * 200.0 + 0.587 * 40.0 + 0.114 * 10.0).round() as u8;
        assert_eq!(px, [expected, expected, expected, 128]);
    }

    #[test]
    fn test_color_highlight_respects_channel_order() {
        let rgba = ColorFrame::filled(1, 1, PixelFormat::Rgba, [255, 0, 0, 255]);
        let bgra = ColorFrame::filled(1, 1, PixelFormat::Bgra, [0, 0, 255, 255]);
        let m = mask(1, 1, 0.0);
        assert_eq!(color_highlight(&rgba, &m).pixel(0, 0)[0], color_highlight(&bgra, &m).pixel(0, 0)[0]);
    }

    #[test]
    fn test_blur_leaves_in_focus_pixels() {
        let frame = checkerboard(8, 8);
        let out = variable_blur(&frame, &mask(8, 8, 1.0), 15);
        assert!(out.same_pixels(&frame));
    }

    #[test]
    fn test_blur_averages_out_of_focus_pixels() {
        let frame = checkerboard(31, 31);
        let out = variable_blur(&frame, &mask(31, 31, 0.0), 15);
        // radius 15 at the centre covers the whole 31x31 frame
        let centre = out.pixel(15, 15)[0] as i32;
        assert!((centre - 128).abs() <= 1, "centre = {}", centre);
        assert_eq!(out.pixel(15, 15)[3], 255);
    }

    #[test]
    fn test_blur_clamps_box_at_edges() {
        let frame = ColorFrame::filled(5, 5, PixelFormat::Bgra, [10, 20, 30, 255]);
        let out = variable_blur(&frame, &mask(5, 5, 0.0), 15);
        assert!(out.same_pixels(&frame));
    }
}
