// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the playback compositor

use std::sync::Arc;
use std::time::Duration;
use tiltcam::backends::capture::{ColorFrame, DepthFrame, Framerate, PixelFormat};
use tiltcam::depth::DepthPreparation;
use tiltcam::errors::RenderError;
use tiltcam::pipelines::playback::{PlaybackCompositor, RenderControls, RenderSettings, ViewMode};
use tiltcam::pipelines::recording::{DepthSequence, RecordedClip};
use tiltcam::FilterKind;

const RATE: u32 = 30;

/// 8x6 frame with a distinct value per pixel
fn source_frame() -> ColorFrame {
    let mut data = Vec::new();
    for y in 0..6u8 {
        for x in 0..8u8 {
            data.extend_from_slice(&[x * 30, y * 40, x * 10 + y * 5, 255]);
        }
    }
    ColorFrame::new(8, 6, PixelFormat::Bgra, data)
        .unwrap()
        .with_sequence(42)
        .with_presentation_time(Duration::from_millis(10))
}

fn uniform_depth(value: f32) -> DepthFrame {
    DepthFrame::new(4, 3, vec![value; 12]).unwrap()
}

fn compositor(frames: usize, settings: RenderSettings) -> PlaybackCompositor {
    let clip = RecordedClip {
        path: "unused.mov".into(),
        depth: DepthSequence::new(vec![uniform_depth(0.5); frames]),
        frame_rate: Framerate::from_int(RATE),
    };
    PlaybackCompositor::new(&clip, Arc::new(RenderControls::new(settings)))
}

fn at_frame(index: u64) -> Duration {
    Framerate::from_int(RATE).presentation_time(index)
}

#[test]
fn test_frame_beyond_depth_passes_through() {
    let compositor = compositor(3, RenderSettings::default());
    let source = source_frame();

    let rendered = compositor.render(at_frame(3), &source);
    assert!(rendered.same_pixels(&source));
    let rendered = compositor.render(at_frame(500), &source);
    assert!(rendered.same_pixels(&source));
}

#[test]
fn test_frozen_filter_passes_through() {
    let settings = RenderSettings {
        filter: FilterKind::Frozen,
        ..RenderSettings::default()
    };
    let compositor = compositor(3, settings);
    let source = source_frame();

    let rendered = compositor.try_render(at_frame(1), &source).unwrap();
    assert!(rendered.same_pixels(&source));
}

#[test]
fn test_video_view_passes_through() {
    let compositor = compositor(3, RenderSettings::default());
    compositor.controls().set_view_mode(ViewMode::Video);
    let source = source_frame();
    assert!(compositor.render(at_frame(0), &source).same_pixels(&source));
}

#[test]
fn test_in_focus_blur_keeps_source() {
    let settings = RenderSettings {
        filter: FilterKind::Blur,
        ..RenderSettings::default()
    };
    let compositor = compositor(2, settings);
    let source = source_frame();

    let rendered = compositor.try_render(at_frame(0), &source).unwrap();
    assert!(rendered.same_pixels(&source));
    assert_eq!(rendered.sequence, source.sequence);
    assert_eq!(rendered.presentation_time, source.presentation_time);
}

#[test]
fn test_out_of_focus_highlight_is_gray() {
    let compositor = compositor(1, RenderSettings::default());
    compositor.controls().set_mask(tiltcam::MaskSettings {
        slope: 40.0,
        width: 0.0,
        min_focus: 0.9,
        max_focus: 1.0,
    });
    let source = source_frame();

    let rendered = compositor.try_render(at_frame(0), &source).unwrap();
    assert_eq!((rendered.width, rendered.height), (8, 6));
    for y in 0..6 {
        for x in 0..8 {
            let [b, g, r, a] = rendered.pixel(x, y);
            assert_eq!((b, g), (g, r), "pixel ({}, {}) not gray", x, y);
            assert_eq!(a, 255);
        }
    }
}

#[test]
fn test_mask_and_depth_views_match_source_size() {
    let compositor = compositor(1, RenderSettings::default());
    let source = source_frame();

    compositor.controls().set_view_mode(ViewMode::Mask);
    let mask_view = compositor.try_render(at_frame(0), &source).unwrap();
    assert_eq!((mask_view.width, mask_view.height), (8, 6));
    assert_eq!(mask_view.pixel(3, 2), [255, 255, 255, 255]);

    compositor.controls().set_view_mode(ViewMode::Depth);
    let depth_view = compositor.try_render(at_frame(0), &source).unwrap();
    assert_eq!((depth_view.width, depth_view.height), (8, 6));
    let [b, g, r, _] = depth_view.pixel(5, 4);
    assert!(b == g && g == r);
    assert!((127..=128).contains(&g));
}

#[test]
fn test_invalid_parameters_fall_back_to_source() {
    let compositor = compositor(2, RenderSettings::default());
    compositor.controls().update(|s| {
        s.mask.min_focus = 0.8;
        s.mask.max_focus = 0.2;
    });
    let source = source_frame();

    assert!(matches!(
        compositor.try_render(at_frame(0), &source),
        Err(RenderError::InvalidParameter(_))
    ));
    assert!(compositor.render(at_frame(0), &source).same_pixels(&source));
}

#[test]
fn test_depth_view_ignores_mask_settings() {
    let compositor = compositor(1, RenderSettings::default());
    compositor.controls().update(|s| {
        s.mask.min_focus = 0.8;
        s.mask.max_focus = 0.2;
    });
    compositor.controls().set_view_mode(ViewMode::Depth);
    let source = source_frame();

    let rendered = compositor.try_render(at_frame(0), &source).unwrap();
    assert_eq!((rendered.width, rendered.height), (8, 6));
    let [b, g, r, _] = rendered.pixel(2, 1);
    assert!(b == g && g == r);
    assert!((127..=128).contains(&g));
    assert!(!compositor.render(at_frame(0), &source).same_pixels(&source));

    // The mask view still reports the reversed band
    compositor.controls().set_view_mode(ViewMode::Mask);
    assert!(matches!(
        compositor.try_render(at_frame(0), &source),
        Err(RenderError::InvalidParameter(_))
    ));
}

#[test]
fn test_rotated_depth_still_fills_frame() {
    let compositor = compositor(1, RenderSettings::default());
    compositor.controls().set_preparation(DepthPreparation {
        orientation: tiltcam::backends::capture::SensorRotation::Rotate90,
        ..DepthPreparation::passthrough()
    });
    compositor.controls().set_view_mode(ViewMode::Mask);
    let source = source_frame();

    let rendered = compositor.try_render(at_frame(0), &source).unwrap();
    assert_eq!((rendered.width, rendered.height), (8, 6));
}

#[test]
fn test_frame_index_uses_clip_rate() {
    let compositor = compositor(10, RenderSettings::default());
    assert_eq!(compositor.frame_index(Duration::ZERO), 0);
    assert_eq!(compositor.frame_index(at_frame(7)), 7);
    assert_eq!(compositor.frame_index(Duration::from_millis(50)), 1);
    assert_eq!(compositor.depth_len(), 10);
}
