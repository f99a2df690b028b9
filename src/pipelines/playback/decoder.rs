// SPDX-License-Identifier: MPL-2.0

//! Sequential frame decoder for recorded clips

use crate::backends::capture::{ColorFrame, PixelFormat};
use crate::errors::RenderError;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// How long to wait for the next decoded frame
const FRAME_TIMEOUT_SECS: u64 = 5;

fn decode_err(msg: impl Into<String>) -> RenderError {
    RenderError::DecodeFailed(msg.into())
}

/// Decodes a clip to BGRA frames in presentation order
pub struct ClipDecoder {
    pipeline: gst::Pipeline,
    appsink: AppSink,
    path: PathBuf,
    frames: u64,
}

impl ClipDecoder {
    pub fn open(path: &Path) -> Result<Self, RenderError> {
        info!(path = %path.display(), "Opening clip for decoding");
        if !path.is_file() {
            return Err(decode_err(format!("clip not found: {}", path.display())));
        }
        gst::init().map_err(|e| decode_err(format!("GStreamer init failed: {}", e)))?;

        let pipeline_str = format!(
            "filesrc location=\"{}\" ! decodebin ! videoconvert ! video/x-raw,format=BGRA ! \
             appsink name=sink sync=false max-buffers=4 drop=false",
            path.to_string_lossy()
        );
        let pipeline = gst::parse::launch(&pipeline_str)
            .map_err(|e| decode_err(format!("Failed to create pipeline: {}", e)))?
            .downcast::<gst::Pipeline>()
            .map_err(|_| decode_err("Failed to downcast to Pipeline"))?;
        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| decode_err("Failed to find appsink"))?
            .downcast::<AppSink>()
            .map_err(|_| decode_err("Failed to downcast to AppSink"))?;

        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| decode_err(format!("Failed to start pipeline: {:?}", e)))?;

        Ok(Self {
            pipeline,
            appsink,
            path: path.to_path_buf(),
            frames: 0,
        })
    }

    /// Next frame, or `None` at end of stream
    pub fn next_frame(&mut self) -> Result<Option<ColorFrame>, RenderError> {
        let sample = match self
            .appsink
            .try_pull_sample(gst::ClockTime::from_seconds(FRAME_TIMEOUT_SECS))
        {
            Some(sample) => sample,
            None if self.appsink.is_eos() => {
                debug!(frames = self.frames, path = %self.path.display(), "Clip fully decoded");
                return Ok(None);
            }
            None => {
                self.check_bus()?;
                return Err(decode_err("Timeout waiting for decoded frame"));
            }
        };

        let frame = sample_to_frame(&sample, self.frames)?;
        self.frames += 1;
        Ok(Some(frame))
    }

    /// Turn a pending pipeline error into a decode error
    fn check_bus(&self) -> Result<(), RenderError> {
        if let Some(bus) = self.pipeline.bus() {
            while let Some(msg) = bus.pop() {
                if let gst::MessageView::Error(err) = msg.view() {
                    return Err(decode_err(format!("Pipeline error: {}", err.error())));
                }
            }
        }
        Ok(())
    }
}

impl Drop for ClipDecoder {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

fn sample_to_frame(sample: &gst::Sample, sequence: u64) -> Result<ColorFrame, RenderError> {
    let caps = sample.caps().ok_or_else(|| decode_err("No caps on sample"))?;
    let video_info =
        VideoInfo::from_caps(caps).map_err(|e| decode_err(format!("Failed to get video info: {}", e)))?;
    let width = video_info.width();
    let height = video_info.height();
    let format = PixelFormat::from_gst_format(video_info.format().to_str().as_str()).unwrap_or(PixelFormat::Bgra);
    let stride = video_info.stride()[0].max(0) as u32;

    let buffer = sample.buffer().ok_or_else(|| decode_err("No buffer in sample"))?;
    let presentation_time = buffer
        .pts()
        .map(|pts| Duration::from_nanos(pts.nseconds()))
        .unwrap_or_default();
    let map = buffer
        .map_readable()
        .map_err(|_| decode_err("Failed to map buffer"))?;

    if stride < width * 4 || map.len() < stride as usize * height as usize {
        return Err(decode_err(format!(
            "buffer of {} bytes too small for {}x{}",
            map.len(),
            width,
            height
        )));
    }

    Ok(ColorFrame {
        width,
        height,
        stride,
        format,
        data: Arc::from(&map.as_slice()[..stride as usize * height as usize]),
        sequence,
        presentation_time,
    })
}
