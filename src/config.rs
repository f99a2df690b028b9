// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::capture::Framerate;
use crate::constants::effects::MAX_BLUR_RADIUS;
use crate::constants::recording::DEFAULT_BITRATE_KBPS;
use crate::constants::{APP_DIR_NAME, CLIP_FILE_NAME, CONFIG_FILE_NAME, EXPORT_FILE_NAME};
use crate::depth::{DepthPreparation, MaskSettings};
use crate::errors::{AppError, AppResult};
use crate::pipelines::playback::RenderSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Persisted user settings. Missing keys fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Nominal capture rate; also drives depth lookup during playback
    pub frame_rate: Framerate,
    /// File name of the recorded clip inside the cache directory
    pub clip_file_name: String,
    /// File name of the exported clip inside the cache directory
    pub export_file_name: String,
    /// Initial mask settings
    pub mask: MaskSettings,
    /// Blur radius where the mask is 0
    pub max_blur_radius: u32,
    /// Depth noise reduction and orientation
    pub depth: DepthPreparation,
    /// Encoder bitrate in kbps
    pub bitrate_kbps: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame_rate: Framerate::default(),
            clip_file_name: CLIP_FILE_NAME.to_string(),
            export_file_name: EXPORT_FILE_NAME.to_string(),
            mask: MaskSettings::default(),
            max_blur_radius: MAX_BLUR_RADIUS,
            depth: DepthPreparation::default(),
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
        }
    }
}

impl Config {
    /// `$XDG_CONFIG_HOME/tiltcam/config.json`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from the default location
    pub fn load() -> AppResult<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from `path`. A missing file yields the defaults; a malformed one
    /// is an error.
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: Self = serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn save(&self) -> AppResult<()> {
        let path = Self::config_path()
            .ok_or_else(|| AppError::Config("no config directory available".into()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> AppResult<()> {
        if self.frame_rate.num == 0 || self.frame_rate.denom == 0 {
            return Err(AppError::Config(format!("invalid frame rate {}", self.frame_rate)));
        }
        if self.clip_file_name.is_empty() || self.export_file_name.is_empty() {
            return Err(AppError::Config("file names must not be empty".into()));
        }
        if self.clip_file_name == self.export_file_name {
            return Err(AppError::Config("clip and export file names must differ".into()));
        }
        Ok(())
    }

    /// Initial render settings for the compositor
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            mask: self.mask.with_slope_floor(),
            preparation: self.depth.clamped(),
            max_blur_radius: self.max_blur_radius,
            ..RenderSettings::default()
        }
    }
}
