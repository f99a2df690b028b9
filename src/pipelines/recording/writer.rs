// SPDX-License-Identifier: MPL-2.0

//! Frame writer sink used by recording sessions

use crate::backends::capture::ColorFrame;
use crate::errors::RecordingError;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Destination for committed color frames.
///
/// All calls come from the capture-delivery thread while the session lock
/// is held, except `finalize`, which runs on a background thread.
pub trait FrameWriter: Send {
    /// Start the writer's timeline at `at`
    fn begin_session(&mut self, at: Duration) -> Result<(), RecordingError>;

    /// Non-blocking backpressure poll
    fn is_ready_for_more_data(&self) -> bool;

    /// Append one frame. `false` means the frame was not written.
    fn append(&mut self, frame: &ColorFrame, presentation_time: Duration) -> bool;

    /// No further frames will be appended
    fn mark_input_finished(&mut self);

    /// Flush and close the file; returns the clip location
    fn finalize(self: Box<Self>) -> Result<PathBuf, RecordingError>;
}

/// Creates a fresh writer for each recording
pub trait WriterFactory: Send + Sync {
    fn create_writer(&self, destination: &Path) -> Result<Box<dyn FrameWriter>, RecordingError>;
}
