// SPDX-License-Identifier: MPL-2.0

//! Recording session: owns the frame writer and the in-memory depth sequence
//!
//! State machine:
//!
//! ```text
//! Idle --start--> Starting --writer ready--> Active --stop--> Stopping --finalized--> Idle
//!                    |                                                        ^
//!                    +------------------ writer unavailable ------------------+
//! ```
//!
//! The depth sequence and the clip advance together: a depth frame is kept
//! only if the writer accepted the color frame captured at the same instant.

use super::writer::{FrameWriter, WriterFactory};
use crate::backends::capture::{CaptureContext, ColorFrame, DepthFrame, Framerate};
use crate::errors::RecordingError;
use crate::storage;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, error, info, trace};

/// Lifecycle state of a [`RecordingSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Active,
    Stopping,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Active => "active",
            SessionState::Stopping => "stopping",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Depth frames of a finished recording, indexed like the clip's frames.
///
/// Frozen at finalization; clones share the same storage.
#[derive(Debug, Clone)]
pub struct DepthSequence(Arc<[DepthFrame]>);

impl DepthSequence {
    pub fn new(frames: Vec<DepthFrame>) -> Self {
        Self(Arc::from(frames.into_boxed_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DepthFrame> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DepthFrame> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[DepthFrame] {
        &self.0
    }
}

/// Result of a finished recording, handed to the editing stage
#[derive(Debug, Clone)]
pub struct RecordedClip {
    pub path: PathBuf,
    pub depth: DepthSequence,
    pub frame_rate: Framerate,
}

impl RecordedClip {
    /// Clip length as implied by the depth sequence
    pub fn duration(&self) -> Duration {
        self.frame_rate.presentation_time(self.depth.len() as u64)
    }
}

/// What happened to one synchronized instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Color frame written and depth kept at `index`
    Committed { index: u64 },
    /// Writer reported backpressure
    WriterNotReady,
    /// Writer refused the frame
    WriterRejected,
    /// No active recording
    NotActive,
}

/// Completion message delivered when `stop` finishes
pub type ClipReceiver = oneshot::Receiver<Result<RecordedClip, RecordingError>>;

struct SessionInner {
    state: SessionState,
    writer: Option<Box<dyn FrameWriter>>,
    frame_counter: u64,
    depth: Vec<DepthFrame>,
    frame_rate: Framerate,
}

/// Shared view of a session used by the capture coordinator
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<SessionInner>>,
}

impl SessionHandle {
    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Frames committed to the clip so far in the current recording
    pub fn frames_committed(&self) -> u64 {
        self.lock().frame_counter
    }

    /// Length of the depth sequence being built
    pub fn depth_len(&self) -> usize {
        self.lock().depth.len()
    }

    /// Commit one instant: stage the depth copy, then write the color frame.
    ///
    /// If the writer is not ready or refuses the frame, the staged depth is
    /// popped again so the sequence length keeps matching the clip.
    pub fn commit(&self, color: &ColorFrame, mut depth: DepthFrame) -> CommitOutcome {
        let mut guard = self.lock();
        let inner = &mut *guard;

        if inner.state != SessionState::Active {
            return CommitOutcome::NotActive;
        }
        let Some(writer) = inner.writer.as_mut() else {
            return CommitOutcome::NotActive;
        };

        let index = inner.frame_counter;
        depth.frame_index = index;
        inner.depth.push(depth);

        if !writer.is_ready_for_more_data() {
            inner.depth.pop();
            return CommitOutcome::WriterNotReady;
        }

        let pts = inner.frame_rate.presentation_time(index);
        if !writer.append(color, pts) {
            inner.depth.pop();
            return CommitOutcome::WriterRejected;
        }

        inner.frame_counter += 1;
        trace!(frame = index, pts_ns = pts.as_nanos() as u64, "Committed instant");
        CommitOutcome::Committed { index }
    }
}

/// Owner of one recording at a time
pub struct RecordingSession {
    handle: SessionHandle,
    factory: Arc<dyn WriterFactory>,
    destination: PathBuf,
}

impl RecordingSession {
    pub fn new(factory: Arc<dyn WriterFactory>, destination: impl Into<PathBuf>) -> Self {
        Self {
            handle: SessionHandle {
                inner: Arc::new(Mutex::new(SessionInner {
                    state: SessionState::Idle,
                    writer: None,
                    frame_counter: 0,
                    depth: Vec::new(),
                    frame_rate: Framerate::default(),
                })),
            },
            factory,
            destination: destination.into(),
        }
    }

    /// Handle for the capture coordinator
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> SessionState {
        self.handle.state()
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Begin recording at the clip location.
    ///
    /// Any previous clip is removed first. On failure the session returns
    /// to `Idle` and `start` can be retried.
    pub fn start(&self, capture: &CaptureContext) -> Result<(), RecordingError> {
        {
            let mut inner = self.handle.lock();
            if inner.state != SessionState::Idle {
                return Err(RecordingError::InvalidState {
                    expected: SessionState::Idle.as_str(),
                    actual: inner.state.as_str(),
                });
            }
            if !capture.is_running() {
                return Err(RecordingError::CaptureNotRunning);
            }
            inner.state = SessionState::Starting;
            inner.frame_rate = capture.frame_rate();
        }

        info!(path = %self.destination.display(), rate = %capture.frame_rate(), "Starting recording");

        match self.open_writer() {
            Ok(writer) => {
                let mut inner = self.handle.lock();
                inner.writer = Some(writer);
                inner.frame_counter = 0;
                inner.depth.clear();
                inner.state = SessionState::Active;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Recording could not start");
                self.handle.lock().state = SessionState::Idle;
                Err(e)
            }
        }
    }

    fn open_writer(&self) -> Result<Box<dyn FrameWriter>, RecordingError> {
        storage::remove_existing(&self.destination).map_err(|e| {
            RecordingError::WriterUnavailable(format!(
                "cannot replace {}: {}",
                self.destination.display(),
                e
            ))
        })?;

        let mut writer = self
            .factory
            .create_writer(&self.destination)
            .map_err(into_writer_unavailable)?;
        writer
            .begin_session(Duration::ZERO)
            .map_err(into_writer_unavailable)?;
        Ok(writer)
    }

    /// Stop recording. Samples arriving from now on are refused.
    ///
    /// The writer is finalized on a background thread; the returned
    /// receiver yields the clip once the session is back to `Idle`.
    pub fn stop(&self) -> Result<ClipReceiver, RecordingError> {
        let (writer, depth, frame_rate) = {
            let mut inner = self.handle.lock();
            if inner.state != SessionState::Active {
                return Err(RecordingError::InvalidState {
                    expected: SessionState::Active.as_str(),
                    actual: inner.state.as_str(),
                });
            }
            inner.state = SessionState::Stopping;
            let mut writer = inner.writer.take();
            if let Some(w) = writer.as_mut() {
                w.mark_input_finished();
            }
            info!(frames = inner.frame_counter, "Stopping recording");
            (writer, std::mem::take(&mut inner.depth), inner.frame_rate)
        };

        let (tx, rx) = oneshot::channel();
        let handle = self.handle.clone();
        thread::spawn(move || {
            let started = Instant::now();
            let result = match writer {
                Some(writer) => writer.finalize(),
                None => Err(RecordingError::FinalizeFailed("no writer attached".into())),
            };
            let result = result.map(|path| RecordedClip {
                path,
                depth: DepthSequence::new(depth),
                frame_rate,
            });

            match &result {
                Ok(clip) => info!(
                    path = %clip.path.display(),
                    frames = clip.depth.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Recording finalized"
                ),
                Err(e) => error!(error = %e, "Recording finalization failed"),
            }

            handle.lock().state = SessionState::Idle;
            if tx.send(result).is_err() {
                debug!("Clip receiver dropped before finalization finished");
            }
        });

        Ok(rx)
    }
}

fn into_writer_unavailable(err: RecordingError) -> RecordingError {
    match err {
        RecordingError::WriterUnavailable(_) => err,
        other => RecordingError::WriterUnavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::capture::PixelFormat;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingWriter {
        path: PathBuf,
        appended: Arc<AtomicUsize>,
    }

    impl FrameWriter for CountingWriter {
        fn begin_session(&mut self, _at: Duration) -> Result<(), RecordingError> {
            Ok(())
        }
        fn is_ready_for_more_data(&self) -> bool {
            true
        }
        fn append(&mut self, _frame: &ColorFrame, _pts: Duration) -> bool {
            self.appended.fetch_add(1, Ordering::SeqCst);
            true
        }
        fn mark_input_finished(&mut self) {}
        fn finalize(self: Box<Self>) -> Result<PathBuf, RecordingError> {
            Ok(self.path)
        }
    }

    struct CountingFactory {
        appended: Arc<AtomicUsize>,
        fail: bool,
    }

    impl WriterFactory for CountingFactory {
        fn create_writer(&self, destination: &Path) -> Result<Box<dyn FrameWriter>, RecordingError> {
            if self.fail {
                return Err(RecordingError::WriterUnavailable("disk full".into()));
            }
            Ok(Box::new(CountingWriter {
                path: destination.to_path_buf(),
                appended: Arc::clone(&self.appended),
            }))
        }
    }

    fn session(fail: bool) -> (RecordingSession, Arc<AtomicUsize>) {
        let appended = Arc::new(AtomicUsize::new(0));
        let factory = Arc::new(CountingFactory {
            appended: Arc::clone(&appended),
            fail,
        });
        let dest = std::env::temp_dir().join("tiltcam-session-unit-missing.mov");
        (RecordingSession::new(factory, dest), appended)
    }

    fn depth() -> DepthFrame {
        DepthFrame::new(1, 1, vec![0.5]).unwrap()
    }

    #[test]
    fn test_failed_start_stays_idle() {
        let (session, _) = session(true);
        let capture = CaptureContext::new(Framerate::from_int(30));
        capture.set_running(true);
        assert!(matches!(
            session.start(&capture),
            Err(RecordingError::WriterUnavailable(_))
        ));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_double_start_is_invalid() {
        let (session, _) = session(false);
        let capture = CaptureContext::new(Framerate::from_int(30));
        capture.set_running(true);
        session.start(&capture).unwrap();
        assert!(matches!(
            session.start(&capture),
            Err(RecordingError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_commit_after_stop_is_refused() {
        let (session, appended) = session(false);
        let capture = CaptureContext::new(Framerate::from_int(30));
        capture.set_running(true);
        session.start(&capture).unwrap();

        let handle = session.handle();
        let frame = ColorFrame::filled(1, 1, PixelFormat::Bgra, [0, 0, 0, 255]);
        assert_eq!(handle.commit(&frame, depth()), CommitOutcome::Committed { index: 0 });

        let rx = session.stop().unwrap();
        assert_eq!(handle.commit(&frame, depth()), CommitOutcome::NotActive);

        let clip = rx.blocking_recv().unwrap().unwrap();
        assert_eq!(clip.depth.len(), 1);
        assert_eq!(appended.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_stop_when_idle_is_invalid() {
        let (session, _) = session(false);
        assert!(matches!(
            session.stop(),
            Err(RecordingError::InvalidState { expected: "active", actual: "idle" })
        ));
    }
}
