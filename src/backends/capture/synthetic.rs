// SPDX-License-Identifier: MPL-2.0

//! Synthetic dual-camera source
//!
//! Renders a tilted ground plane (far at the top, near at the bottom) with
//! a sphere drifting across it, as BGRA color plus disparity. Drops can be
//! scheduled per member to exercise the recording path.

use super::types::{
    CaptureResult, CaptureSource, ColorFrame, DepthBuffer, DepthDataKind, DropReason, Framerate,
    PixelFormat, Synced, SynchronizedSamplePair,
};
use crate::constants::synthetic;
use crate::errors::CaptureError;
use std::collections::HashMap;
use std::sync::Arc;

/// Row padding of the transient depth buffer, in elements
const DEPTH_ROW_PADDING: u32 = 8;

/// Which half of a synchronized pair a scheduled drop applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairMember {
    Color,
    Depth,
}

pub struct SyntheticCaptureSource {
    color_width: u32,
    color_height: u32,
    depth_width: u32,
    depth_height: u32,
    frame_rate: Framerate,
    frame_limit: Option<u64>,
    sequence: u64,
    drops: HashMap<(u64, PairMember), DropReason>,
    configure_error: Option<String>,
    depth_buffer: Vec<f32>,
}

impl Default for SyntheticCaptureSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticCaptureSource {
    pub fn new() -> Self {
        Self {
            color_width: synthetic::COLOR_WIDTH,
            color_height: synthetic::COLOR_HEIGHT,
            depth_width: synthetic::DEPTH_WIDTH,
            depth_height: synthetic::DEPTH_HEIGHT,
            frame_rate: Framerate::default(),
            frame_limit: None,
            sequence: 0,
            drops: HashMap::new(),
            configure_error: None,
            depth_buffer: Vec::new(),
        }
    }

    pub fn with_color_size(mut self, width: u32, height: u32) -> Self {
        self.color_width = width;
        self.color_height = height;
        self
    }

    pub fn with_depth_size(mut self, width: u32, height: u32) -> Self {
        self.depth_width = width;
        self.depth_height = height;
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: Framerate) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Stop after `frames` pairs
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    /// Drop one member of pair `sequence` (0-based)
    pub fn drop_at(mut self, sequence: u64, member: PairMember, reason: DropReason) -> Self {
        self.drops.insert((sequence, member), reason);
        self
    }

    /// Make `configure` fail as a misconfigured device would
    pub fn with_configuration_error(mut self, message: impl Into<String>) -> Self {
        self.configure_error = Some(message.into());
        self
    }

    pub fn color_size(&self) -> (u32, u32) {
        (self.color_width, self.color_height)
    }

    /// Horizontal position of the sphere centre (0..1) at `sequence`
    fn sphere_x(&self, sequence: u64) -> f32 {
        let period = (self.frame_rate.as_f64() * 4.0).max(1.0) as u64;
        let phase = (sequence % period) as f32 / period as f32;
        0.2 + 0.6 * (1.0 - (2.0 * phase - 1.0).abs())
    }

    fn render_color(&self, sequence: u64) -> ColorFrame {
        let (w, h) = (self.color_width, self.color_height);
        let cx = self.sphere_x(sequence);
        let mut data = Vec::with_capacity(w as usize * h as usize * 4);
        for y in 0..h {
            let v = y as f32 / h.max(1) as f32;
            for x in 0..w {
                let u = x as f32 / w.max(1) as f32;
                let in_sphere = (u - cx).powi(2) + (v - 0.55).powi(2) < 0.01;
                let (r, g, b) = if in_sphere {
                    (230, 60, 40)
                } else if ((x / 32) + (y / 32)) % 2 == 0 {
                    (60, (120.0 + 100.0 * v) as u8, 70)
                } else {
                    (90, (80.0 + 100.0 * v) as u8, (200.0 * (1.0 - v)) as u8)
                };
                data.extend_from_slice(&[b, g, r, 255]);
            }
        }
        ColorFrame {
            width: w,
            height: h,
            stride: w * 4,
            format: PixelFormat::Bgra,
            data: Arc::from(data.into_boxed_slice()),
            sequence,
            presentation_time: self.frame_rate.presentation_time(sequence),
        }
    }

    fn render_depth(&mut self, sequence: u64) {
        let (w, h) = (self.depth_width, self.depth_height);
        let stride = (w + DEPTH_ROW_PADDING) as usize;
        let cx = self.sphere_x(sequence);
        self.depth_buffer.clear();
        self.depth_buffer.resize(stride * h as usize, f32::NAN);
        for y in 0..h {
            let v = y as f32 / h.max(1) as f32;
            for x in 0..w {
                let u = x as f32 / w.max(1) as f32;
                // disparity: ground plane nearer towards the bottom
                let mut d = 0.5 + 2.5 * v;
                if (u - cx).powi(2) + (v - 0.55).powi(2) < 0.01 {
                    d = 2.2;
                }
                self.depth_buffer[y as usize * stride + x as usize] = d;
            }
        }
    }
}

impl CaptureSource for SyntheticCaptureSource {
    fn configure(&mut self) -> CaptureResult<()> {
        match &self.configure_error {
            Some(msg) => Err(CaptureError::DeviceConfigurationFailure(msg.clone())),
            None => Ok(()),
        }
    }

    fn frame_rate(&self) -> Framerate {
        self.frame_rate
    }

    fn next_pair(
        &mut self,
        deliver: &mut dyn FnMut(SynchronizedSamplePair<'_>),
    ) -> CaptureResult<bool> {
        let sequence = self.sequence;
        if self.frame_limit.is_some_and(|limit| sequence >= limit) {
            return Ok(false);
        }
        self.sequence += 1;

        let color = match self.drops.get(&(sequence, PairMember::Color)) {
            Some(reason) => Synced::Dropped(*reason),
            None => Synced::Delivered(self.render_color(sequence)),
        };
        let depth_dropped = self.drops.get(&(sequence, PairMember::Depth)).copied();
        if depth_dropped.is_none() {
            self.render_depth(sequence);
        }

        let depth = match depth_dropped {
            Some(reason) => Synced::Dropped(reason),
            None => Synced::Delivered(DepthBuffer {
                data: &self.depth_buffer,
                width: self.depth_width,
                height: self.depth_height,
                stride: self.depth_width + DEPTH_ROW_PADDING,
                kind: DepthDataKind::Disparity,
                sequence,
            }),
        };

        deliver(SynchronizedSamplePair { color, depth });
        Ok(true)
    }
}
