// SPDX-License-Identifier: MPL-2.0

//! Interactive render settings shared between the control surface and
//! the compositor

use crate::constants::effects::MAX_BLUR_RADIUS;
use crate::depth::{DepthPreparation, MaskSettings};
use crate::effects::FilterKind;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// What the compositor shows for each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ViewMode {
    /// Selected filter applied through the mask
    #[default]
    Effect,
    /// Prepared depth map as grayscale
    Depth,
    /// Focus mask as grayscale
    Mask,
    /// Source frame, untouched
    Video,
}

impl ViewMode {
    pub const ALL: [ViewMode; 4] = [ViewMode::Effect, ViewMode::Depth, ViewMode::Mask, ViewMode::Video];

    fn position(&self) -> usize {
        Self::ALL.iter().position(|m| m == self).unwrap_or(0)
    }

    pub fn next(&self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    pub fn previous(&self) -> Self {
        let len = Self::ALL.len();
        Self::ALL[(self.position() + len - 1) % len]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ViewMode::Effect => "Effect",
            ViewMode::Depth => "Depth",
            ViewMode::Mask => "Mask",
            ViewMode::Video => "Video",
        }
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "effect" => Ok(ViewMode::Effect),
            "depth" => Ok(ViewMode::Depth),
            "mask" => Ok(ViewMode::Mask),
            "video" => Ok(ViewMode::Video),
            other => Err(format!(
                "unknown view '{}' (expected effect, depth, mask or video)",
                other
            )),
        }
    }
}

/// One consistent set of render parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub mask: MaskSettings,
    pub filter: FilterKind,
    pub view_mode: ViewMode,
    pub preparation: DepthPreparation,
    pub max_blur_radius: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            mask: MaskSettings::default(),
            filter: FilterKind::default(),
            view_mode: ViewMode::default(),
            preparation: DepthPreparation::default(),
            max_blur_radius: MAX_BLUR_RADIUS,
        }
    }
}

/// Single-writer / multi-reader cell holding the live render settings.
///
/// The compositor takes one [`snapshot`](Self::snapshot) per frame, so a
/// frame never mixes old and new parameters.
#[derive(Debug, Default)]
pub struct RenderControls {
    settings: RwLock<RenderSettings>,
}

impl RenderControls {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RenderSettings> {
        self.settings.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RenderSettings> {
        self.settings.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> RenderSettings {
        *self.read()
    }

    /// Apply several changes atomically
    pub fn update(&self, f: impl FnOnce(&mut RenderSettings)) {
        let mut settings = self.write();
        f(&mut settings);
        settings.mask = settings.mask.with_slope_floor();
    }

    /// Replace the mask settings; the slope is floored at `MIN_SLOPE`
    pub fn set_mask(&self, mask: MaskSettings) {
        self.update(|s| s.mask = mask);
    }

    /// Map slider positions onto the mask settings
    pub fn set_sliders(&self, slope_slider: f32, width_slider: f32, focus_lo_pct: f32, focus_hi_pct: f32) {
        self.set_mask(MaskSettings::from_sliders(
            slope_slider,
            width_slider,
            focus_lo_pct,
            focus_hi_pct,
        ));
    }

    pub fn set_filter(&self, filter: FilterKind) {
        debug!(%filter, "Filter selected");
        self.update(|s| s.filter = filter);
    }

    pub fn next_filter(&self) -> FilterKind {
        let mut settings = self.write();
        settings.filter = settings.filter.next();
        settings.filter
    }

    pub fn previous_filter(&self) -> FilterKind {
        let mut settings = self.write();
        settings.filter = settings.filter.previous();
        settings.filter
    }

    pub fn set_view_mode(&self, view_mode: ViewMode) {
        debug!(%view_mode, "View mode selected");
        self.update(|s| s.view_mode = view_mode);
    }

    pub fn next_view_mode(&self) -> ViewMode {
        let mut settings = self.write();
        settings.view_mode = settings.view_mode.next();
        settings.view_mode
    }

    pub fn previous_view_mode(&self) -> ViewMode {
        let mut settings = self.write();
        settings.view_mode = settings.view_mode.previous();
        settings.view_mode
    }

    pub fn set_preparation(&self, preparation: DepthPreparation) {
        self.update(|s| s.preparation = preparation.clamped());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::mask::MIN_SLOPE;

    #[test]
    fn test_view_mode_cycle() {
        assert_eq!(ViewMode::Effect.next(), ViewMode::Depth);
        assert_eq!(ViewMode::Depth.next(), ViewMode::Mask);
        assert_eq!(ViewMode::Mask.next(), ViewMode::Video);
        assert_eq!(ViewMode::Video.next(), ViewMode::Effect);
        assert_eq!(ViewMode::Effect.previous(), ViewMode::Video);
    }

    #[test]
    fn test_set_mask_floors_slope() {
        let controls = RenderControls::default();
        controls.set_mask(MaskSettings {
            slope: -3.0,
            ..MaskSettings::default()
        });
        assert_eq!(controls.snapshot().mask.slope, MIN_SLOPE);
    }

    #[test]
    fn test_cycling_through_controls() {
        let controls = RenderControls::default();
        assert_eq!(controls.next_filter(), FilterKind::Frozen);
        assert_eq!(controls.next_view_mode(), ViewMode::Depth);
        let snap = controls.snapshot();
        assert_eq!((snap.filter, snap.view_mode), (FilterKind::Frozen, ViewMode::Depth));
    }
}
