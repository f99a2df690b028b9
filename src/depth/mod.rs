// SPDX-License-Identifier: MPL-2.0

//! Depth map processing: focus masks, preparation and visualization

pub mod mask;
pub mod processing;
pub mod visualization;

pub use mask::{DepthMask, MaskParameters, MaskSettings, generate_mask};
pub use processing::{DepthPreparation, normalize_in_place};
