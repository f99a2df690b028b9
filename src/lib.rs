// SPDX-License-Identifier: MPL-2.0

//! Tiltcam - synchronized color + depth recording with depth-driven re-rendering
//!
//! A capture source delivers color frames paired with depth maps. While a
//! recording session is active, each accepted color frame is written to a clip
//! file and its depth map is kept in memory at the same index. Afterwards the
//! clip is replayed through a compositor that turns the depth at each frame
//! into a focus mask and applies a tilt-shift style effect.
//!
//! # Architecture
//!
//! - [`backends`]: Capture sources and the synchronized capture coordinator
//! - [`depth`]: Depth preparation, focus masks and visualization
//! - [`effects`]: Mask-driven filter bank
//! - [`pipelines`]: Recording session and playback compositor / exporter
//! - [`config`]: User configuration handling
//! - [`storage`]: Clip and export locations
//!
//! # Example
//!
//! ```ignore
//! let session = RecordingSession::new(Arc::new(factory), storage::clip_path(&config));
//! let coordinator = SyncCaptureCoordinator::new(session.handle());
//! let driver = CaptureDriver::start(SyntheticCaptureSource::new(), coordinator, true)?;
//! session.start(driver.context())?;
//! // ...
//! let clip = session.stop()?.blocking_recv()??;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod depth;
pub mod effects;
pub mod errors;
pub mod pipelines;
pub mod storage;

// Re-export commonly used types
pub use backends::capture::{
    CaptureContext, CaptureDriver, CaptureSource, ColorFrame, DepthFrame, Framerate, PixelFormat,
    SyncCaptureCoordinator, SyntheticCaptureSource,
};
pub use config::Config;
pub use depth::{DepthMask, MaskParameters, MaskSettings, generate_mask};
pub use effects::FilterKind;
pub use errors::{AppError, AppResult, CaptureError, RecordingError, RenderError};
pub use pipelines::playback::{ClipExporter, PlaybackCompositor, RenderControls, ViewMode};
pub use pipelines::recording::{RecordedClip, RecordingSession, SessionState};
