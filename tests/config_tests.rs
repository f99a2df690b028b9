// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use std::path::PathBuf;
use tiltcam::backends::capture::{Framerate, SensorRotation};
use tiltcam::{AppError, Config, FilterKind, ViewMode};

fn temp_config(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join("tiltcam-config-tests")
        .join(format!("{}.json", name))
}

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.frame_rate, Framerate::from_int(30));
    assert_eq!(config.clip_file_name, "video.mov");
    assert_eq!(config.export_file_name, "exported-video.mov");
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_file_gives_defaults() {
    let path = temp_config("does-not-exist");
    let _ = std::fs::remove_file(&path);
    assert_eq!(Config::load_from(&path).unwrap(), Config::default());
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let path = temp_config("partial");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        r#"{ "max_blur_radius": 7, "mask": { "slope": 9.0 }, "depth": { "orientation": "Rotate180" } }"#,
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.max_blur_radius, 7);
    assert_eq!(config.mask.slope, 9.0);
    assert_eq!(config.mask.min_focus, Config::default().mask.min_focus);
    assert_eq!(config.depth.orientation, SensorRotation::Rotate180);
    assert_eq!(config.clip_file_name, "video.mov");
}

#[test]
fn test_malformed_file_is_config_error() {
    let path = temp_config("malformed");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(Config::load_from(&path), Err(AppError::Config(_))));
}

#[test]
fn test_save_then_load() {
    let path = temp_config("saved");
    let mut config = Config::default();
    config.bitrate_kbps = 2_500;
    config.frame_rate = Framerate::new(60000, 1001);
    config.save_to(&path).unwrap();

    assert_eq!(Config::load_from(&path).unwrap(), config);
}

#[test]
fn test_invalid_values_are_rejected() {
    let mut config = Config::default();
    config.export_file_name = config.clip_file_name.clone();
    assert!(matches!(config.validate(), Err(AppError::Config(_))));

    let mut config = Config::default();
    config.frame_rate.num = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_render_settings_from_config() {
    let mut config = Config::default();
    config.mask.slope = -2.0;
    config.max_blur_radius = 4;

    let settings = config.render_settings();
    assert_eq!(settings.mask.slope, tiltcam::constants::mask::MIN_SLOPE);
    assert_eq!(settings.max_blur_radius, 4);
    assert_eq!(settings.filter, FilterKind::ColorHighlight);
    assert_eq!(settings.view_mode, ViewMode::Effect);
}
