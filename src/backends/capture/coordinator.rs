// SPDX-License-Identifier: MPL-2.0

//! Pairs synchronized color/depth samples into the active recording

use super::types::{DepthFrame, Synced, SynchronizedSamplePair};
use crate::constants::recording::DROP_WARN_INTERVAL;
use crate::depth::normalize_in_place;
use crate::pipelines::recording::{CommitOutcome, SessionHandle};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// What the coordinator did with one synchronized instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// No recording in progress
    Ignored,
    /// One member of the pair was dropped by the source
    Dropped,
    /// Depth buffer could not be copied
    Invalid,
    /// Writer refused the color frame; the depth copy was rolled back
    Rejected,
    /// Color written and depth appended at this index
    Committed(u64),
}

/// Delivers synchronized pairs to a recording session.
///
/// Called from the single capture-delivery thread, in capture order.
pub struct SyncCaptureCoordinator {
    session: SessionHandle,
    dropped: AtomicU64,
}

impl SyncCaptureCoordinator {
    pub fn new(session: SessionHandle) -> Self {
        Self {
            session,
            dropped: AtomicU64::new(0),
        }
    }

    /// Instants discarded so far (source drops and writer rejections)
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn count_drop(&self) {
        let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        if total % DROP_WARN_INTERVAL == 0 {
            warn!(dropped = total, "Synchronized capture is dropping instants");
        }
    }

    pub fn on_synchronized_sample(&self, pair: SynchronizedSamplePair<'_>) -> SampleOutcome {
        if !self.session.is_active() {
            return SampleOutcome::Ignored;
        }

        let (color, depth) = match (&pair.color, &pair.depth) {
            (Synced::Delivered(color), Synced::Delivered(depth)) => (color, depth),
            (color, depth) => {
                debug!(
                    color_reason = ?color.dropped_reason(),
                    depth_reason = ?depth.dropped_reason(),
                    "Dropping incomplete synchronized pair"
                );
                self.count_drop();
                return SampleOutcome::Dropped;
            }
        };

        let mut depth_frame = match DepthFrame::copy_from(depth) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(
                    error = %e,
                    sequence = depth.sequence,
                    width = depth.width,
                    height = depth.height,
                    stride = depth.stride,
                    len = depth.data.len(),
                    "Discarding unreadable depth buffer"
                );
                self.count_drop();
                return SampleOutcome::Invalid;
            }
        };
        normalize_in_place(&mut depth_frame);

        match self.session.commit(color, depth_frame) {
            CommitOutcome::Committed { index } => SampleOutcome::Committed(index),
            CommitOutcome::NotActive => SampleOutcome::Ignored,
            outcome => {
                debug!(?outcome, sequence = color.sequence, "Writer did not take frame");
                self.count_drop();
                SampleOutcome::Rejected
            }
        }
    }
}
