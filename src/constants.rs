// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Application directory name under the user's cache/config dirs
pub const APP_DIR_NAME: &str = "tiltcam";

/// Config file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Clip written by every recording (overwritten each time)
pub const CLIP_FILE_NAME: &str = "video.mov";

/// Rendered output of the exporter
pub const EXPORT_FILE_NAME: &str = "exported-video.mov";

/// Nominal capture rate (frames per second)
pub const NOMINAL_FRAME_RATE: u32 = 30;

/// Mask generation defaults
pub mod mask {
    /// Lower bound callers clamp the ramp slope to
    pub const MIN_SLOPE: f32 = 0.1;
    /// Default ramp steepness
    pub const DEFAULT_SLOPE: f32 = 4.0;
    /// Default extra band width (normalized depth units)
    pub const DEFAULT_WIDTH: f32 = 0.1;
    /// Default in-focus band
    pub const DEFAULT_MIN_FOCUS: f32 = 0.4;
    pub const DEFAULT_MAX_FOCUS: f32 = 0.6;
    /// Slope slider is multiplied by this to get the ramp slope
    pub const SLOPE_SLIDER_GAIN: f32 = 10.0;
}

/// Effect filter constants
pub mod effects {
    /// Blur radius (pixels) applied where the mask is 0
    pub const MAX_BLUR_RADIUS: u32 = 15;

    /// Rec. 601 luma weights used for desaturation
    pub const LUMA_R: f32 = 0.299;
    pub const LUMA_G: f32 = 0.587;
    pub const LUMA_B: f32 = 0.114;
}

/// Depth preparation limits
pub mod depth {
    /// Noise-reduction level range
    pub const MAX_NOISE_LEVEL: f32 = 0.1;
    pub const DEFAULT_NOISE_LEVEL: f32 = 0.02;
    /// Re-sharpening amount range
    pub const MAX_SHARPNESS: f32 = 1.0;
    pub const DEFAULT_SHARPNESS: f32 = 0.4;
}

/// Recording constants
pub mod recording {
    use super::Duration;

    /// Emit a warning summary every N dropped instants
    pub const DROP_WARN_INTERVAL: u64 = 30;

    /// Default encoder bitrate (kbps)
    pub const DEFAULT_BITRATE_KBPS: u32 = 8_000;

    /// Queue limit for the writer's appsrc (bytes). Above this the writer
    /// reports it is not ready and the instant is dropped.
    pub const WRITER_QUEUE_BYTES: u64 = 64 * 1024 * 1024;

    /// How long finalize waits for EOS to reach the muxer
    pub const FINALIZE_TIMEOUT: Duration = Duration::from_secs(10);
}

/// Synthetic capture source defaults
pub mod synthetic {
    pub const COLOR_WIDTH: u32 = 640;
    pub const COLOR_HEIGHT: u32 = 480;
    pub const DEPTH_WIDTH: u32 = 320;
    pub const DEPTH_HEIGHT: u32 = 240;
}
