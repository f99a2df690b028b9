// SPDX-License-Identifier: MPL-2.0

//! Recording: the session state machine, its writer sink, and the
//! GStreamer clip writer used in production.

pub mod gst_writer;
pub mod session;
pub mod writer;

pub use gst_writer::{GstFrameWriter, GstWriterFactory};
pub use session::{
    ClipReceiver, CommitOutcome, DepthSequence, RecordedClip, RecordingSession, SessionHandle,
    SessionState,
};
pub use writer::{FrameWriter, WriterFactory};
