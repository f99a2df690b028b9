// SPDX-License-Identifier: MPL-2.0

//! Offline export of a recorded clip through the compositor

use super::compositor::PlaybackCompositor;
use super::decoder::ClipDecoder;
use crate::backends::capture::Framerate;
use crate::errors::RenderError;
use crate::pipelines::recording::{FrameWriter, GstWriterFactory, WriterFactory};
use crate::storage;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Upper bound on waiting for the writer to drain during export
const BACKPRESSURE_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of a finished export
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub frames: u64,
    pub elapsed: Duration,
}

/// Renders every frame of a clip through the compositor into a new file
pub struct ClipExporter {
    compositor: PlaybackCompositor,
    destination: PathBuf,
    frame_rate: Framerate,
    bitrate_kbps: u32,
}

fn export_err(msg: impl Into<String>) -> RenderError {
    RenderError::ExportFailed(msg.into())
}

impl ClipExporter {
    pub fn new(
        compositor: PlaybackCompositor,
        destination: impl Into<PathBuf>,
        frame_rate: Framerate,
        bitrate_kbps: u32,
    ) -> Self {
        Self {
            compositor,
            destination: destination.into(),
            frame_rate,
            bitrate_kbps,
        }
    }

    /// Export on a blocking worker and report the result once
    pub async fn run(self, clip: PathBuf) -> Result<ExportSummary, RenderError> {
        tokio::task::spawn_blocking(move || self.export(&clip))
            .await
            .map_err(|e| export_err(format!("export task failed: {}", e)))?
    }

    /// Decode `clip`, render each frame at its presentation time and write
    /// the result. Any previous export is replaced.
    pub fn export(&self, clip: &Path) -> Result<ExportSummary, RenderError> {
        let started = Instant::now();
        info!(
            clip = %clip.display(),
            output = %self.destination.display(),
            "Exporting clip"
        );

        storage::remove_existing(&self.destination)
            .map_err(|e| export_err(format!("cannot replace {}: {}", self.destination.display(), e)))?;

        let mut decoder = ClipDecoder::open(clip)?;
        let Some(first) = decoder.next_frame()? else {
            return Err(export_err("clip contains no frames"));
        };

        let factory = GstWriterFactory {
            width: first.width,
            height: first.height,
            format: first.format,
            frame_rate: self.frame_rate,
            bitrate_kbps: self.bitrate_kbps,
        };
        let mut writer = factory
            .create_writer(&self.destination)
            .map_err(|e| export_err(e.to_string()))?;
        writer
            .begin_session(Duration::ZERO)
            .map_err(|e| export_err(e.to_string()))?;

        let mut frames = 0u64;
        let mut next = Some(first);
        while let Some(frame) = next {
            let rendered = self.compositor.render(frame.presentation_time, &frame);
            wait_until_ready(writer.as_ref())?;
            if !writer.append(&rendered, frame.presentation_time) {
                return Err(export_err(format!("writer rejected frame {}", frames)));
            }
            frames += 1;
            next = decoder.next_frame()?;
        }

        writer.mark_input_finished();
        let path = writer.finalize().map_err(|e| export_err(e.to_string()))?;

        let summary = ExportSummary {
            path,
            frames,
            elapsed: started.elapsed(),
        };
        info!(
            path = %summary.path.display(),
            frames,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Export finished"
        );
        Ok(summary)
    }
}

/// Offline export can afford to wait for the encoder instead of dropping
fn wait_until_ready(writer: &dyn FrameWriter) -> Result<(), RenderError> {
    let deadline = Instant::now() + BACKPRESSURE_TIMEOUT;
    while !writer.is_ready_for_more_data() {
        if Instant::now() >= deadline {
            warn!("Export writer stayed busy");
            return Err(export_err("writer did not accept more data"));
        }
        thread::sleep(Duration::from_millis(5));
    }
    Ok(())
}
