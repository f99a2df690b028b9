// SPDX-License-Identifier: MPL-2.0

//! GStreamer-backed clip writer
//!
//! ```text
//! appsrc (BGRA/RGBA) -> videoconvert -> x264enc|openh264enc -> h264parse -> qtmux -> filesink
//! ```
//!
//! Frames carry explicit timestamps (`frame_index / frame_rate`), so the
//! appsrc is not live and does not timestamp buffers itself.

use super::writer::{FrameWriter, WriterFactory};
use crate::backends::capture::{ColorFrame, Framerate, PixelFormat};
use crate::constants::recording::{FINALIZE_TIMEOUT, WRITER_QUEUE_BYTES};
use crate::errors::RecordingError;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app::AppSrc;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Software H.264 encoders in preference order
const H264_ENCODERS: [&str; 2] = ["x264enc", "openh264enc"];

/// Geometry and encoding settings for clips produced by [`GstFrameWriter`]
#[derive(Debug, Clone, Copy)]
pub struct GstWriterFactory {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub frame_rate: Framerate,
    pub bitrate_kbps: u32,
}

impl WriterFactory for GstWriterFactory {
    fn create_writer(&self, destination: &Path) -> Result<Box<dyn FrameWriter>, RecordingError> {
        Ok(Box::new(GstFrameWriter::new(destination, *self)?))
    }
}

fn unavailable(msg: impl Into<String>) -> RecordingError {
    RecordingError::WriterUnavailable(msg.into())
}

fn make_element(factory: &str) -> Result<gst::Element, RecordingError> {
    gst::ElementFactory::make(factory)
        .build()
        .map_err(|e| unavailable(format!("Failed to create {}: {}", factory, e)))
}

/// Pick the first installed H.264 encoder and configure its bitrate
fn select_encoder(bitrate_kbps: u32) -> Result<gst::Element, RecordingError> {
    for name in H264_ENCODERS {
        let Ok(encoder) = gst::ElementFactory::make(name).build() else {
            debug!(encoder = name, "Encoder not available");
            continue;
        };

        match name {
            "x264enc" => {
                encoder.set_property_from_str("speed-preset", "veryfast");
                encoder.set_property("bitrate", bitrate_kbps);
            }
            "openh264enc" => {
                encoder.set_property_from_str("rate-control", "bitrate");
                encoder.set_property("bitrate", bitrate_kbps * 1000);
            }
            _ => {}
        }

        info!(encoder = name, bitrate_kbps, "Selected video encoder");
        return Ok(encoder);
    }

    Err(unavailable(
        "No H.264 encoder available. Please install gstreamer1-plugins-ugly (x264enc) or gstreamer1-plugin-openh264",
    ))
}

/// Clip writer feeding an encoding pipeline through appsrc
pub struct GstFrameWriter {
    pipeline: gst::Pipeline,
    appsrc: AppSrc,
    path: PathBuf,
    settings: GstWriterFactory,
    frame_duration: gst::ClockTime,
    input_finished: bool,
}

impl GstFrameWriter {
    pub fn new(destination: &Path, settings: GstWriterFactory) -> Result<Self, RecordingError> {
        info!(
            path = %destination.display(),
            width = settings.width,
            height = settings.height,
            rate = %settings.frame_rate,
            "Creating clip writer pipeline"
        );

        gst::init().map_err(|e| unavailable(format!("GStreamer init failed: {}", e)))?;

        let pipeline = gst::Pipeline::new();
        let appsrc = make_element("appsrc")?
            .downcast::<AppSrc>()
            .map_err(|_| unavailable("Failed to downcast to AppSrc"))?;
        let convert = make_element("videoconvert")?;
        let encoder = select_encoder(settings.bitrate_kbps)?;
        let parser = make_element("h264parse")?;
        let muxer = make_element("qtmux")?;
        let filesink = gst::ElementFactory::make("filesink")
            .property("location", destination.to_string_lossy().to_string())
            .build()
            .map_err(|e| unavailable(format!("Failed to create filesink: {}", e)))?;

        let caps = gst::Caps::builder("video/x-raw")
            .field("format", settings.format.to_gst_format_string())
            .field("width", settings.width as i32)
            .field("height", settings.height as i32)
            .field(
                "framerate",
                gst::Fraction::new(settings.frame_rate.num as i32, settings.frame_rate.denom as i32),
            )
            .build();
        appsrc.set_caps(Some(&caps));
        appsrc.set_format(gst::Format::Time);
        appsrc.set_is_live(false);
        appsrc.set_do_timestamp(false);
        appsrc.set_max_bytes(WRITER_QUEUE_BYTES);

        pipeline
            .add_many([appsrc.upcast_ref(), &convert, &encoder, &parser, &muxer, &filesink])
            .map_err(|e| unavailable(format!("Failed to add elements: {}", e)))?;
        gst::Element::link_many([appsrc.upcast_ref(), &convert, &encoder, &parser, &muxer, &filesink])
            .map_err(|e| unavailable(format!("Failed to link elements: {}", e)))?;

        let frame_duration =
            gst::ClockTime::from_nseconds(settings.frame_rate.frame_duration().as_nanos() as u64);

        Ok(Self {
            pipeline,
            appsrc,
            path: destination.to_path_buf(),
            settings,
            frame_duration,
            input_finished: false,
        })
    }

    /// Drain the bus until EOS or an error
    fn wait_for_eos(&self) -> Result<(), RecordingError> {
        let bus = self
            .pipeline
            .bus()
            .ok_or_else(|| RecordingError::FinalizeFailed("No bus available".into()))?;

        let timeout = gst::ClockTime::from_mseconds(FINALIZE_TIMEOUT.as_millis() as u64);
        match bus.timed_pop_filtered(timeout, &[gst::MessageType::Eos, gst::MessageType::Error]) {
            Some(msg) => match msg.view() {
                gst::MessageView::Eos(_) => Ok(()),
                gst::MessageView::Error(err) => {
                    error!(
                        error = %err.error(),
                        debug = ?err.debug(),
                        source = ?err.src().map(|s| s.name()),
                        "GStreamer error while finalizing clip"
                    );
                    Err(RecordingError::FinalizeFailed(err.error().to_string()))
                }
                _ => Ok(()),
            },
            None => Err(RecordingError::FinalizeFailed(
                "Timed out waiting for end of stream".into(),
            )),
        }
    }
}

impl FrameWriter for GstFrameWriter {
    fn begin_session(&mut self, at: Duration) -> Result<(), RecordingError> {
        self.pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| unavailable(format!("Failed to start pipeline: {}", e)))?;

        // Surface missing plugins / unwritable destinations right away
        let bus = self.pipeline.bus().ok_or_else(|| unavailable("No bus available"))?;
        if let Some(msg) = bus.timed_pop_filtered(
            gst::ClockTime::from_mseconds(100),
            &[gst::MessageType::Error],
        ) && let gst::MessageView::Error(err) = msg.view()
        {
            let _ = self.pipeline.set_state(gst::State::Null);
            return Err(unavailable(format!("Pipeline error: {}", err.error())));
        }

        debug!(start_ns = at.as_nanos() as u64, "Clip writer session started");
        Ok(())
    }

    fn is_ready_for_more_data(&self) -> bool {
        !self.input_finished && self.appsrc.current_level_bytes() < WRITER_QUEUE_BYTES
    }

    fn append(&mut self, frame: &ColorFrame, presentation_time: Duration) -> bool {
        if self.input_finished {
            return false;
        }
        if frame.width != self.settings.width
            || frame.height != self.settings.height
            || frame.format != self.settings.format
        {
            warn!(
                width = frame.width,
                height = frame.height,
                format = ?frame.format,
                "Frame does not match writer caps"
            );
            return false;
        }

        let mut buffer = gst::Buffer::from_mut_slice(frame.packed_data());
        if let Some(buffer_ref) = buffer.get_mut() {
            buffer_ref.set_pts(gst::ClockTime::from_nseconds(presentation_time.as_nanos() as u64));
            buffer_ref.set_duration(self.frame_duration);
        }

        match self.appsrc.push_buffer(buffer) {
            Ok(_) => true,
            Err(e) => {
                warn!(?e, "Failed to push frame to clip writer");
                false
            }
        }
    }

    fn mark_input_finished(&mut self) {
        if self.input_finished {
            return;
        }
        self.input_finished = true;
        if let Err(e) = self.appsrc.end_of_stream() {
            warn!(?e, "Failed to send EOS to clip writer");
        }
    }

    fn finalize(mut self: Box<Self>) -> Result<PathBuf, RecordingError> {
        self.mark_input_finished();
        let result = self.wait_for_eos();

        self.pipeline
            .set_state(gst::State::Null)
            .map_err(|e| RecordingError::FinalizeFailed(format!("Failed to stop pipeline: {}", e)))?;
        result?;

        info!(path = %self.path.display(), "Clip saved");
        Ok(self.path.clone())
    }
}

impl Drop for GstFrameWriter {
    fn drop(&mut self) {
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            error!(?e, "Failed to set clip writer pipeline to Null on drop");
        }
    }
}
