// SPDX-License-Identifier: GPL-3.0-only

//! Serial capture-delivery thread
//!
//! Every synchronized pair is delivered from this one thread, in capture
//! order. The loop body is a closure that pulls one pair from the source
//! and hands it to the coordinator.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Action returned by the loop body to control the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Run another iteration
    Continue,
    /// Leave the loop
    Stop,
}

/// Controller for the capture-delivery thread
///
/// ```ignore
/// let mut controller = CaptureLoopController::start("capture", None, move || {
///     match source.next_pair(&mut |pair| coordinator.on_synchronized_sample(pair)) {
///         Ok(true) => LoopAction::Continue,
///         _ => LoopAction::Stop,
///     }
/// });
/// controller.stop();
/// ```
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureLoopController {
    /// Start the loop on a new thread.
    ///
    /// With `pace` set, iterations are spaced at least that far apart
    /// (used to deliver synthetic frames at the nominal frame rate).
    pub fn start<F>(name: &str, pace: Option<Duration>, mut loop_fn: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        Self::start_with_init(name, pace, || Ok(()), move |_: &mut ()| loop_fn())
    }

    /// Start the loop, running `init_fn` once on the new thread first.
    ///
    /// If initialization fails the thread exits without entering the loop.
    pub fn start_with_init<S, I, F>(
        name: &str,
        pace: Option<Duration>,
        init_fn: I,
        mut loop_fn: F,
    ) -> Self
    where
        S: 'static,
        I: FnOnce() -> Result<S, String> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, pace_ms = ?pace.map(|p| p.as_millis()), "Starting capture loop");

        let thread_handle = thread::spawn(move || {
            let mut state = match init_fn() {
                Ok(s) => s,
                Err(e) => {
                    warn!(name = %thread_name, error = %e, "Capture loop initialization failed");
                    return;
                }
            };

            let mut next_deadline = Instant::now();
            let mut iterations: u64 = 0;
            while !thread_stop.load(Ordering::SeqCst) {
                if let Some(interval) = pace {
                    let now = Instant::now();
                    if next_deadline > now {
                        thread::sleep(next_deadline - now);
                    }
                    next_deadline = next_deadline.max(now) + interval;
                }

                let action = loop_fn(&mut state);
                iterations += 1;
                if action == LoopAction::Stop {
                    debug!(name = %thread_name, "Loop requested stop");
                    break;
                }
            }

            info!(
                name = %thread_name,
                iterations,
                "Capture loop thread exiting"
            );
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop thread is still alive
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting capture loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Signal the loop to stop and wait for the thread
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish (e.g. after the loop returned `Stop`)
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take()
            && let Err(e) = handle.join()
        {
            warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureLoopController dropped, stopping loop");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_loop_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = CaptureLoopController::start("test-loop", None, move || {
            if counter_clone.fetch_add(1, Ordering::SeqCst) >= 9 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        });
        controller.join();

        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_stop_signal() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);
        let mut controller = CaptureLoopController::start("test-loop", None, move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            LoopAction::Continue
        });
        thread::sleep(Duration::from_millis(30));
        controller.stop();
        assert!(!controller.is_running());
        assert!(counter.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_pacing_spaces_iterations() {
        let started = Instant::now();
        let mut controller = CaptureLoopController::start(
            "test-paced",
            Some(Duration::from_millis(10)),
            {
                let mut n = 0;
                move || {
                    n += 1;
                    if n == 5 { LoopAction::Stop } else { LoopAction::Continue }
                }
            },
        );
        controller.join();
        // first iteration runs immediately, the remaining four wait
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_init_failure_skips_loop() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);

        let mut controller = CaptureLoopController::start_with_init(
            "test-fail-init",
            None,
            || Err::<(), _>("no device".to_string()),
            move |_: &mut ()| {
                ran_clone.store(true, Ordering::SeqCst);
                LoopAction::Stop
            },
        );
        controller.join();
        assert!(!ran.load(Ordering::SeqCst));
    }
}
