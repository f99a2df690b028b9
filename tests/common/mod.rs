// SPDX-License-Identifier: MPL-2.0

//! Shared fixtures for integration tests: an in-memory writer with fault
//! injection and small frame builders.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tiltcam::backends::capture::{
    CaptureContext, ColorFrame, DepthBuffer, DepthDataKind, DropReason, Framerate, PixelFormat,
    Synced, SynchronizedSamplePair,
};
use tiltcam::errors::RecordingError;
use tiltcam::pipelines::recording::{FrameWriter, WriterFactory};

/// What the stub writer saw
#[derive(Debug, Default)]
pub struct StubLog {
    /// (color sequence, pts) of every accepted frame
    pub appended: Vec<(u64, Duration)>,
    /// Append calls, accepted or not
    pub attempts: u64,
    pub began_at: Option<Duration>,
    pub input_finished: bool,
    pub finalized: bool,
}

type RejectFn = dyn Fn(u64) -> bool + Send + Sync;

/// Writer factory whose writers keep everything in memory
#[derive(Clone)]
pub struct StubWriterFactory {
    pub log: Arc<Mutex<StubLog>>,
    ready: Arc<AtomicBool>,
    fail_create: Arc<AtomicBool>,
    reject: Arc<RejectFn>,
}

impl StubWriterFactory {
    pub fn new() -> Self {
        Self::rejecting(|_| false)
    }

    /// Reject the append with this 0-based attempt number when `f` says so
    pub fn rejecting(f: impl Fn(u64) -> bool + Send + Sync + 'static) -> Self {
        Self {
            log: Arc::new(Mutex::new(StubLog::default())),
            ready: Arc::new(AtomicBool::new(true)),
            fail_create: Arc::new(AtomicBool::new(false)),
            reject: Arc::new(f),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn appended_sequences(&self) -> Vec<u64> {
        self.log.lock().unwrap().appended.iter().map(|(s, _)| *s).collect()
    }

    pub fn appended_pts(&self) -> Vec<Duration> {
        self.log.lock().unwrap().appended.iter().map(|(_, p)| *p).collect()
    }
}

impl WriterFactory for StubWriterFactory {
    fn create_writer(&self, destination: &Path) -> Result<Box<dyn FrameWriter>, RecordingError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(RecordingError::WriterUnavailable("stub refused to open".into()));
        }
        Ok(Box::new(StubWriter {
            factory: self.clone(),
            destination: destination.to_path_buf(),
        }))
    }
}

struct StubWriter {
    factory: StubWriterFactory,
    destination: PathBuf,
}

impl FrameWriter for StubWriter {
    fn begin_session(&mut self, at: Duration) -> Result<(), RecordingError> {
        self.factory.log.lock().unwrap().began_at = Some(at);
        Ok(())
    }

    fn is_ready_for_more_data(&self) -> bool {
        self.factory.ready.load(Ordering::SeqCst)
    }

    fn append(&mut self, frame: &ColorFrame, pts: Duration) -> bool {
        let mut log = self.factory.log.lock().unwrap();
        let attempt = log.attempts;
        log.attempts += 1;
        if (self.factory.reject)(attempt) {
            return false;
        }
        log.appended.push((frame.sequence, pts));
        true
    }

    fn mark_input_finished(&mut self) {
        self.factory.log.lock().unwrap().input_finished = true;
    }

    fn finalize(self: Box<Self>) -> Result<PathBuf, RecordingError> {
        self.factory.log.lock().unwrap().finalized = true;
        Ok(self.destination)
    }
}

/// Capture context already marked as running
pub fn running_context() -> CaptureContext {
    let context = CaptureContext::new(Framerate::from_int(30));
    context.set_running(true);
    context
}

/// Per-test clip destination in the temp dir
pub fn temp_clip(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join("tiltcam-tests")
        .join(format!("{}.mov", name))
}

pub fn color_frame(sequence: u64) -> ColorFrame {
    ColorFrame::filled(4, 3, PixelFormat::Bgra, [10, 20, 30, 255]).with_sequence(sequence)
}

/// 2x2 disparity values; the first sample encodes `sequence` so depth frames
/// stay distinguishable after normalization
pub fn depth_values(sequence: u64) -> [f32; 4] {
    [sequence as f32, 100.0, 0.0, 50.0]
}

pub fn depth_buffer(data: &[f32], sequence: u64) -> DepthBuffer<'_> {
    DepthBuffer {
        data,
        width: 2,
        height: 2,
        stride: 2,
        kind: DepthDataKind::Disparity,
        sequence,
    }
}

pub fn complete_pair(sequence: u64, depth: &[f32]) -> SynchronizedSamplePair<'_> {
    SynchronizedSamplePair {
        color: Synced::Delivered(color_frame(sequence)),
        depth: Synced::Delivered(depth_buffer(depth, sequence)),
    }
}

pub fn pair_without_color(sequence: u64, depth: &[f32]) -> SynchronizedSamplePair<'_> {
    SynchronizedSamplePair {
        color: Synced::Dropped(DropReason::LateData),
        depth: Synced::Delivered(depth_buffer(depth, sequence)),
    }
}
