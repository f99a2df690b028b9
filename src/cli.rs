// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Recording a clip from the synthetic capture source
//! - Recording and exporting through the effect in one go
//! - Generating masks and rendering effects on still images

use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tiltcam::backends::capture::{
    CaptureDriver, ColorFrame, PixelFormat, SyncCaptureCoordinator, SyntheticCaptureSource,
};
use tiltcam::depth::visualization::{depth_from_luma8, mask_to_luma8};
use tiltcam::depth::{MaskSettings, generate_mask};
use tiltcam::pipelines::playback::{ClipExporter, PlaybackCompositor, RenderControls, ViewMode};
use tiltcam::pipelines::recording::{DepthSequence, GstWriterFactory, RecordedClip, RecordingSession};
use tiltcam::{Config, FilterKind, storage};

/// Mask overrides shared by the still-image commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct MaskArgs {
    /// Ramp steepness outside the focus band
    #[arg(long)]
    pub slope: Option<f32>,

    /// Extra width added around the focus band
    #[arg(long)]
    pub width: Option<f32>,

    /// Near edge of the focus band (0-1)
    #[arg(long)]
    pub min_focus: Option<f32>,

    /// Far edge of the focus band (0-1)
    #[arg(long)]
    pub max_focus: Option<f32>,
}

impl MaskArgs {
    /// Apply the overrides on top of `base`
    pub fn apply(&self, base: MaskSettings) -> MaskSettings {
        MaskSettings {
            slope: self.slope.unwrap_or(base.slope),
            width: self.width.unwrap_or(base.width),
            min_focus: self.min_focus.unwrap_or(base.min_focus),
            max_focus: self.max_focus.unwrap_or(base.max_focus),
        }
        .with_slope_floor()
    }
}

/// Record from the synthetic source for `duration` seconds or until Ctrl+C
pub fn record(
    config: &Config,
    duration: u64,
    output: Option<PathBuf>,
) -> Result<RecordedClip, Box<dyn std::error::Error>> {
    // Initialize GStreamer
    gstreamer::init()?;

    let source = SyntheticCaptureSource::new().with_frame_rate(config.frame_rate);
    let (width, height) = source.color_size();

    let output_path = output.unwrap_or_else(|| storage::clip_path(config));
    println!(
        "Recording format: {}x{} @ {}fps",
        width, height, config.frame_rate
    );
    println!("Output: {}", output_path.display());
    println!("Duration: {} seconds", duration);

    let factory = GstWriterFactory {
        width,
        height,
        format: PixelFormat::Bgra,
        frame_rate: config.frame_rate,
        bitrate_kbps: config.bitrate_kbps,
    };
    let session = RecordingSession::new(Arc::new(factory), output_path);
    let handle = session.handle();
    let coordinator = SyncCaptureCoordinator::new(session.handle());
    let mut driver = CaptureDriver::start(source, coordinator, true)?;

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    println!();
    println!("Recording... (press Ctrl+C to stop early)");
    session.start(driver.context())?;

    // Wait for duration or Ctrl+C
    let start = Instant::now();
    let target_duration = Duration::from_secs(duration);

    while start.elapsed() < target_duration {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }
        if !driver.context().is_running() {
            println!();
            println!("Capture ended");
            break;
        }

        let elapsed = start.elapsed().as_secs();
        print!(
            "\rRecording: {:02}:{:02}  frames: {}",
            elapsed / 60,
            elapsed % 60,
            handle.frames_committed()
        );
        std::io::Write::flush(&mut std::io::stdout())?;

        std::thread::sleep(Duration::from_millis(100));
    }
    println!();

    let receiver = session.stop()?;
    driver.stop();
    let clip = receiver.blocking_recv()??;

    println!("Video saved: {}", clip.path.display());
    println!(
        "Frames: {} of {} captured ({:.2}s), dropped instants: {}",
        clip.depth.len(),
        driver.pairs_delivered(),
        clip.duration().as_secs_f64(),
        driver.coordinator().dropped()
    );
    Ok(clip)
}

/// Record a clip, then export it through the selected effect
pub fn demo(
    config: &Config,
    duration: u64,
    filter: FilterKind,
    view: ViewMode,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let clip = record(config, duration, None)?;

    let controls = Arc::new(RenderControls::new(config.render_settings()));
    controls.set_filter(filter);
    controls.set_view_mode(view);

    let output_path = output.unwrap_or_else(|| storage::export_path(config));
    println!();
    println!("Exporting with {} ({} view)...", filter, view);

    let compositor = PlaybackCompositor::new(&clip, controls);
    let exporter = ClipExporter::new(compositor, output_path, clip.frame_rate, config.bitrate_kbps);

    let rt = tokio::runtime::Runtime::new()?;
    match rt.block_on(exporter.run(clip.path.clone())) {
        Ok(summary) => {
            println!(
                "Export saved: {} ({} frames in {:.1}s)",
                summary.path.display(),
                summary.frames,
                summary.elapsed.as_secs_f64()
            );
        }
        // The recorded clip stays usable
        Err(e) => eprintln!("Export failed: {}", e),
    }
    Ok(())
}

/// Depth image in, focus mask image out
pub fn mask_image(
    config: &Config,
    depth: PathBuf,
    mask: MaskArgs,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let depth_image = image::open(&depth)?.to_luma8();
    let depth_frame = config.depth.clamped().apply(&depth_from_luma8(&depth_image));

    let settings = mask.apply(config.mask);
    let params = settings.to_parameters(1.0);
    let mask = generate_mask(&depth_frame, &params)?;

    let output_path = output_or_default(output, "mask")?;
    mask_to_luma8(&mask).save(&output_path)?;
    println!("Mask saved: {} ({}x{})", output_path.display(), mask.width, mask.height);
    Ok(())
}

/// Color image plus depth image in, filtered image out
pub fn render_image(
    config: &Config,
    color: PathBuf,
    depth: PathBuf,
    filter: FilterKind,
    mask: MaskArgs,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let rgba = image::open(&color)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    let source = ColorFrame::new(width, height, PixelFormat::Rgba, rgba.into_raw())
        .ok_or("Color image has an unexpected size")?;

    let depth_frame = depth_from_luma8(&image::open(&depth)?.to_luma8());
    println!(
        "Color: {}x{}, depth: {}x{}",
        width, height, depth_frame.width, depth_frame.height
    );

    let controls = Arc::new(RenderControls::new(config.render_settings()));
    controls.set_mask(mask.apply(config.mask));
    controls.set_filter(filter);
    controls.set_view_mode(ViewMode::Effect);

    let compositor = PlaybackCompositor::from_parts(
        DepthSequence::new(vec![depth_frame]),
        config.frame_rate,
        controls,
    );
    let rendered = compositor.try_render(Duration::ZERO, &source)?;

    let output_path = output_or_default(output, "render")?;
    image::RgbaImage::from_raw(rendered.width, rendered.height, rendered.packed_data())
        .ok_or("Rendered frame has an unexpected size")?
        .save(&output_path)?;
    println!("Render saved: {}", output_path.display());
    Ok(())
}

/// Explicit path, or a timestamped PNG in the cache directory
fn output_or_default(output: Option<PathBuf>, prefix: &str) -> std::io::Result<PathBuf> {
    if let Some(path) = output {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            storage::ensure_dir(parent)?;
        }
        return Ok(path);
    }
    let dir = storage::cache_dir();
    storage::ensure_dir(&dir)?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    Ok(dir.join(format!("{}_{}.png", prefix, timestamp)))
}
