// SPDX-License-Identifier: MPL-2.0

//! Per-frame compositor for recorded clips
//!
//! For each rendered frame the compositor finds the depth sample recorded
//! at the same instant, builds the focus mask at the frame's resolution and
//! runs the selected effect. Frames without depth pass through unchanged.

use super::controls::{RenderControls, ViewMode};
use crate::backends::capture::{ColorFrame, DepthFrame, Framerate};
use crate::depth::mask::scaled_dimensions;
use crate::depth::processing::resample_plane;
use crate::depth::visualization::{depth_to_frame, mask_to_frame};
use crate::depth::generate_mask;
use crate::errors::RenderError;
use crate::pipelines::recording::{DepthSequence, RecordedClip};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

pub struct PlaybackCompositor {
    depth: DepthSequence,
    frame_rate: Framerate,
    controls: Arc<RenderControls>,
}

impl PlaybackCompositor {
    pub fn new(clip: &RecordedClip, controls: Arc<RenderControls>) -> Self {
        Self::from_parts(clip.depth.clone(), clip.frame_rate, controls)
    }

    pub fn from_parts(depth: DepthSequence, frame_rate: Framerate, controls: Arc<RenderControls>) -> Self {
        Self {
            depth,
            frame_rate,
            controls,
        }
    }

    pub fn controls(&self) -> &Arc<RenderControls> {
        &self.controls
    }

    pub fn depth_len(&self) -> usize {
        self.depth.len()
    }

    /// Depth index for a composition timestamp
    pub fn frame_index(&self, composition_time: Duration) -> u64 {
        self.frame_rate.frame_index_at(composition_time)
    }

    /// Render one frame, or passthrough on a parameter error
    pub fn render(&self, composition_time: Duration, source: &ColorFrame) -> ColorFrame {
        match self.try_render(composition_time, source) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, time_ms = composition_time.as_millis() as u64, "Render failed, passing source through");
                source.clone()
            }
        }
    }

    /// Render one frame, reporting mask or filter errors
    pub fn try_render(&self, composition_time: Duration, source: &ColorFrame) -> Result<ColorFrame, RenderError> {
        let settings = self.controls.snapshot();
        let index = self.frame_index(composition_time);

        let Some(recorded) = usize::try_from(index).ok().and_then(|i| self.depth.get(i)) else {
            trace!(index, count = self.depth.len(), "No depth for frame, passing through");
            return Ok(source.clone());
        };
        if settings.view_mode == ViewMode::Video {
            return Ok(source.clone());
        }

        if source.width == 0 || source.height == 0 {
            return Err(RenderError::InvalidParameter("empty source frame".into()));
        }
        let depth = settings.preparation.apply(recorded);
        if depth.is_empty() {
            return Err(RenderError::InvalidParameter(format!("empty depth frame at index {}", index)));
        }

        let scale = source.width.max(source.height) as f32 / depth.width.max(depth.height) as f32;
        let params = settings.mask.to_parameters(scale);

        // Depth view bypasses the mask, so only the scale has to be sound
        let rendered = match settings.view_mode {
            ViewMode::Video => source.clone(),
            ViewMode::Depth => depth_to_frame(&scale_depth(&depth, scale)?, source.format),
            ViewMode::Mask => mask_to_frame(&generate_mask(&depth, &params)?, source.format),
            ViewMode::Effect => {
                let mask = generate_mask(&depth, &params)?;
                match settings.filter.apply_with_radius(source, &mask, settings.max_blur_radius) {
                    Some(frame) => frame,
                    None => return Ok(source.clone()),
                }
            }
        };

        Ok(fit_to_extent(&rendered, source))
    }
}

fn scale_depth(depth: &DepthFrame, scale: f32) -> Result<DepthFrame, RenderError> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(RenderError::InvalidParameter(format!("scale must be positive, got {}", scale)));
    }
    let (w, h) = scaled_dimensions(depth.width, depth.height, scale);
    let data = resample_plane(depth.data.clone(), depth.width, depth.height, w, h)
        .ok_or_else(|| RenderError::InvalidParameter("depth buffer size mismatch".into()))?;
    Ok(DepthFrame {
        data,
        width: w,
        height: h,
        stride: w,
        frame_index: depth.frame_index,
        source_sequence: depth.source_sequence,
    })
}

/// Crop or edge-extend `frame` to the source's size, carrying over its timing
fn fit_to_extent(frame: &ColorFrame, source: &ColorFrame) -> ColorFrame {
    let (w, h) = (source.width, source.height);
    let data: Arc<[u8]> = if frame.width == w && frame.height == h && frame.stride == w * 4 {
        Arc::clone(&frame.data)
    } else {
        let mut out = Vec::with_capacity(w as usize * h as usize * 4);
        for y in 0..h {
            let sy = y.min(frame.height.saturating_sub(1));
            let row = frame.row(sy);
            for x in 0..w {
                let sx = x.min(frame.width.saturating_sub(1)) as usize;
                out.extend_from_slice(&row[sx * 4..sx * 4 + 4]);
            }
        }
        Arc::from(out.into_boxed_slice())
    };

    ColorFrame {
        width: w,
        height: h,
        stride: w * 4,
        format: frame.format,
        data,
        sequence: source.sequence,
        presentation_time: source.presentation_time,
    }
}
