// SPDX-License-Identifier: MPL-2.0

//! Band-pass focus mask from a depth map
//!
//! Two clamped linear ramps bound the in-focus band:
//!
//! ```text
//!   r1(d) = clamp( slope * d - slope * (min_focus - w/2), 0, 1)   rising edge
//!   r2(d) = clamp(-slope * d + slope * (max_focus + w/2), 0, 1)   falling edge
//!   mask  = min(r1, r2)          with w = 2/slope + width
//! ```
//!
//! The mask is computed at depth resolution and resampled to the color
//! frame with Catmull-Rom.

use crate::backends::capture::DepthFrame;
use crate::constants::mask as mask_consts;
use crate::depth::processing::resample_plane;
use crate::errors::RenderError;
use serde::{Deserialize, Serialize};

/// Per-frame mask parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskParameters {
    /// Ramp steepness, must be > 0
    pub slope: f32,
    /// Extra band width in normalized depth units, >= 0
    pub width: f32,
    pub min_focus: f32,
    pub max_focus: f32,
    /// Depth-to-color resampling ratio
    pub scale: f32,
}

impl Default for MaskParameters {
    fn default() -> Self {
        MaskSettings::default().to_parameters(1.0)
    }
}

impl MaskParameters {
    pub fn validate(&self) -> Result<(), RenderError> {
        if !self.slope.is_finite() || self.slope <= 0.0 {
            return Err(RenderError::InvalidParameter(format!(
                "slope must be positive, got {}",
                self.slope
            )));
        }
        if !self.width.is_finite() || self.width < 0.0 {
            return Err(RenderError::InvalidParameter(format!(
                "width must be non-negative, got {}",
                self.width
            )));
        }
        if !self.min_focus.is_finite() || !self.max_focus.is_finite() {
            return Err(RenderError::InvalidParameter("focus bounds must be finite".into()));
        }
        if self.min_focus > self.max_focus {
            return Err(RenderError::InvalidParameter(format!(
                "min_focus {} exceeds max_focus {}",
                self.min_focus, self.max_focus
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(RenderError::InvalidParameter(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        Ok(())
    }

    /// Mask weight for one normalized depth value. Assumes validated parameters.
    #[inline]
    pub fn weight(&self, depth: f32) -> f32 {
        let d = if depth.is_finite() { depth } else { 0.0 };
        let filter_width = 2.0 / self.slope + self.width;
        let b1 = -self.slope * (self.min_focus - filter_width / 2.0);
        let b2 = self.slope * (self.max_focus + filter_width / 2.0);
        let r1 = (self.slope * d + b1).clamp(0.0, 1.0);
        let r2 = (-self.slope * d + b2).clamp(0.0, 1.0);
        r1.min(r2)
    }
}

/// User-facing mask settings (everything but the per-frame scale).
///
/// Persisted as the configured defaults; the render controls hold the
/// live copy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskSettings {
    pub slope: f32,
    pub width: f32,
    pub min_focus: f32,
    pub max_focus: f32,
}

impl Default for MaskSettings {
    fn default() -> Self {
        Self {
            slope: mask_consts::DEFAULT_SLOPE,
            width: mask_consts::DEFAULT_WIDTH,
            min_focus: mask_consts::DEFAULT_MIN_FOCUS,
            max_focus: mask_consts::DEFAULT_MAX_FOCUS,
        }
    }
}

impl MaskSettings {
    /// Map slider positions to settings.
    ///
    /// The slope slider is scaled by 10 and floored at `MIN_SLOPE`; focus
    /// sliders are percentages. Reversed focus sliders are swapped.
    pub fn from_sliders(slope_slider: f32, width_slider: f32, focus_lo_pct: f32, focus_hi_pct: f32) -> Self {
        let slope = (slope_slider * mask_consts::SLOPE_SLIDER_GAIN).max(mask_consts::MIN_SLOPE);
        let slope = if slope.is_finite() { slope } else { mask_consts::MIN_SLOPE };
        let lo = focus_lo_pct / 100.0;
        let hi = focus_hi_pct / 100.0;
        Self {
            slope,
            width: width_slider.max(0.0),
            min_focus: lo.min(hi),
            max_focus: lo.max(hi),
        }
    }

    /// Clamp the slope to the positive floor callers are expected to apply
    pub fn with_slope_floor(mut self) -> Self {
        if self.slope.is_nan() || self.slope < mask_consts::MIN_SLOPE {
            self.slope = mask_consts::MIN_SLOPE;
        }
        self
    }

    pub fn to_parameters(&self, scale: f32) -> MaskParameters {
        MaskParameters {
            slope: self.slope,
            width: self.width,
            min_focus: self.min_focus,
            max_focus: self.max_focus,
            scale,
        }
    }
}

/// Single-channel mask in `[0, 1]`, row-major, tightly packed
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMask {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl DepthMask {
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Sample with coordinates clamped to the mask bounds
    #[inline]
    pub fn get_clamped(&self, x: i64, y: i64) -> f32 {
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let y = y.clamp(0, self.height as i64 - 1) as u32;
        self.get(x, y)
    }
}

/// Output size of a depth map resampled by `scale` (never zero)
pub fn scaled_dimensions(width: u32, height: u32, scale: f32) -> (u32, u32) {
    let w = (width as f32 * scale).round().max(1.0) as u32;
    let h = (height as f32 * scale).round().max(1.0) as u32;
    (w, h)
}

/// Build the focus mask for one depth frame.
///
/// Deterministic: identical inputs give bit-identical output.
pub fn generate_mask(depth: &DepthFrame, params: &MaskParameters) -> Result<DepthMask, RenderError> {
    params.validate()?;
    if depth.is_empty() {
        return Err(RenderError::InvalidParameter(format!(
            "empty depth frame ({}x{})",
            depth.width, depth.height
        )));
    }

    let mut data = Vec::with_capacity(depth.len());
    for y in 0..depth.height {
        for x in 0..depth.width {
            data.push(params.weight(depth.get(x, y)));
        }
    }

    let (out_w, out_h) = scaled_dimensions(depth.width, depth.height, params.scale);
    // Catmull-Rom overshoots near sharp edges; resample_plane clamps back
    let data = resample_plane(data, depth.width, depth.height, out_w, out_h)
        .ok_or_else(|| RenderError::InvalidParameter("mask buffer size mismatch".into()))?;

    Ok(DepthMask {
        width: out_w,
        height: out_h,
        data,
    })
}
