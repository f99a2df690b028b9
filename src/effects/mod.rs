// SPDX-License-Identifier: MPL-2.0

//! Mask-driven effect filter bank

pub mod filters;

use crate::backends::capture::ColorFrame;
use crate::constants::effects::MAX_BLUR_RADIUS;
use crate::depth::DepthMask;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Effect applied to the color frame using the focus mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterKind {
    /// Out-of-focus regions blurred, radius growing as the mask falls off
    Blur,
    /// In-focus regions in color over a monochrome background
    #[default]
    ColorHighlight,
    /// No effect; the caller shows the source frame
    Frozen,
}

impl FilterKind {
    /// Cycle order for next/previous
    pub const ALL: [FilterKind; 3] = [FilterKind::Blur, FilterKind::ColorHighlight, FilterKind::Frozen];

    fn position(&self) -> usize {
        Self::ALL.iter().position(|k| k == self).unwrap_or(0)
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
            FilterKind::Blur => "Blur",
            FilterKind::ColorHighlight => "Color",
            FilterKind::Frozen => "Frozen",
        }
    }

    /// Apply with the default maximum blur radius
    pub fn apply(&self, image: &ColorFrame, mask: &DepthMask) -> Option<ColorFrame> {
        self.apply_with_radius(image, mask, MAX_BLUR_RADIUS)
    }

    /// Apply the effect. `None` means "show the source unchanged".
    pub fn apply_with_radius(&self, image: &ColorFrame, mask: &DepthMask, max_blur_radius: u32) -> Option<ColorFrame> {
        match self {
            FilterKind::Blur => Some(filters::variable_blur(image, mask, max_blur_radius)),
            FilterKind::ColorHighlight => Some(filters::color_highlight(image, mask)),
            FilterKind::Frozen => None,
        }
    }
}

impl std::fmt::Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blur" => Ok(FilterKind::Blur),
            "color" | "color-highlight" | "highlight" => Ok(FilterKind::ColorHighlight),
            "frozen" | "none" => Ok(FilterKind::Frozen),
            other => Err(format!("unknown filter '{}' (expected blur, color or frozen)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_wraps_both_ways() {
        assert_eq!(FilterKind::Frozen.next(), FilterKind::Blur);
        assert_eq!(FilterKind::Blur.previous(), FilterKind::Frozen);
        for kind in FilterKind::ALL {
            assert_eq!(kind.next().previous(), kind);
        }
    }

    #[test]
    fn test_default_is_color_highlight() {
        assert_eq!(FilterKind::default(), FilterKind::ColorHighlight);
    }

    #[test]
    fn test_frozen_leaves_source_alone() {
        let image = ColorFrame::filled(4, 2, crate::backends::capture::PixelFormat::Bgra, [10, 20, 30, 255]);
        let mask = DepthMask {
            width: 4,
            height: 2,
            data: vec![0.0; 8],
        };
        assert!(FilterKind::Frozen.apply(&image, &mask).is_none());
        assert!(FilterKind::Frozen.apply_with_radius(&image, &mask, 8).is_none());
        assert!(FilterKind::Blur.apply(&image, &mask).is_some());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Blur".parse::<FilterKind>(), Ok(FilterKind::Blur));
        assert_eq!("color".parse::<FilterKind>(), Ok(FilterKind::ColorHighlight));
        assert!("sepia".parse::<FilterKind>().is_err());
    }
}
