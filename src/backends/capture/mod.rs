// SPDX-License-Identifier: MPL-2.0

//! Synchronized color + depth capture
//!
//! A [`CaptureSource`] produces pairs on the capture-delivery thread run by
//! [`CaptureDriver`]; the [`SyncCaptureCoordinator`] routes each pair into
//! the recording session. Recording consults the shared [`CaptureContext`]
//! to find out whether capture is running.

pub mod coordinator;
pub mod frame_loop;
pub mod synthetic;
pub mod types;

pub use coordinator::{SampleOutcome, SyncCaptureCoordinator};
pub use frame_loop::{CaptureLoopController, LoopAction};
pub use synthetic::{PairMember, SyntheticCaptureSource};
pub use types::*;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{info, warn};

/// Running state of the capture pipeline, shared with the recording session
#[derive(Debug, Clone)]
pub struct CaptureContext {
    running: Arc<AtomicBool>,
    frame_rate: Framerate,
}

impl CaptureContext {
    pub fn new(frame_rate: Framerate) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            frame_rate,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn frame_rate(&self) -> Framerate {
        self.frame_rate
    }
}

/// Owns the capture-delivery thread for one source
pub struct CaptureDriver {
    context: CaptureContext,
    controller: CaptureLoopController,
    coordinator: Arc<SyncCaptureCoordinator>,
    delivered: Arc<AtomicU64>,
}

impl CaptureDriver {
    /// Configure `source` and start delivering its pairs to `coordinator`.
    ///
    /// With `realtime` set, pairs are paced at the source's frame rate.
    pub fn start<S>(mut source: S, coordinator: SyncCaptureCoordinator, realtime: bool) -> CaptureResult<Self>
    where
        S: CaptureSource + 'static,
    {
        source.configure()?;

        let context = CaptureContext::new(source.frame_rate());
        let coordinator = Arc::new(coordinator);
        let pace = realtime.then(|| source.frame_rate().frame_duration());

        let loop_context = context.clone();
        let loop_coordinator = Arc::clone(&coordinator);
        let delivered = Arc::new(AtomicU64::new(0));
        let loop_delivered = Arc::clone(&delivered);
        context.set_running(true);
        info!(rate = %context.frame_rate(), realtime, "Capture started");

        let controller = CaptureLoopController::start("synchronized-capture", pace, move || {
            let result = source.next_pair(&mut |pair| {
                loop_delivered.fetch_add(1, Ordering::Relaxed);
                loop_coordinator.on_synchronized_sample(pair);
            });
            match result {
                Ok(true) => LoopAction::Continue,
                Ok(false) => {
                    info!("Capture source exhausted");
                    loop_context.set_running(false);
                    LoopAction::Stop
                }
                Err(e) => {
                    warn!(error = %e, "Capture source failed");
                    loop_context.set_running(false);
                    LoopAction::Stop
                }
            }
        });

        Ok(Self {
            context,
            controller,
            coordinator,
            delivered,
        })
    }

    pub fn context(&self) -> &CaptureContext {
        &self.context
    }

    pub fn coordinator(&self) -> &SyncCaptureCoordinator {
        &self.coordinator
    }

    /// Pairs pulled from the source so far
    pub fn pairs_delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Wait until the source runs dry
    pub fn wait(&mut self) {
        self.controller.join();
        self.context.set_running(false);
    }

    pub fn stop(&mut self) {
        self.controller.stop();
        self.context.set_running(false);
        info!(dropped = self.coordinator.dropped(), "Capture stopped");
    }
}
