// SPDX-License-Identifier: MPL-2.0

//! Playback of recorded clips through the depth-driven effect

pub mod compositor;
pub mod controls;
pub mod decoder;
pub mod export;

pub use compositor::PlaybackCompositor;
pub use controls::{RenderControls, RenderSettings, ViewMode};
pub use decoder::ClipDecoder;
pub use export::{ClipExporter, ExportSummary};
