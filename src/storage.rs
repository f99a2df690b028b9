// SPDX-License-Identifier: MPL-2.0

//! Storage locations for the recorded clip and its export

use crate::config::Config;
use crate::constants::APP_DIR_NAME;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application cache directory (`~/.cache/tiltcam` on Linux)
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

/// Where every recording is written; overwritten on each recording
pub fn clip_path(config: &Config) -> PathBuf {
    cache_dir().join(&config.clip_file_name)
}

/// Where the exporter writes the rendered clip
pub fn export_path(config: &Config) -> PathBuf {
    cache_dir().join(&config.export_file_name)
}

/// Create `dir` and its parents if missing
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Remove a previous file at `path`. A missing file is not an error, and
/// the parent directory is created so a writer can open `path` next.
pub fn remove_existing(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_dir(parent)?;
    }

    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed previous file");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_existing_missing_is_ok() {
        let path = std::env::temp_dir().join("tiltcam-storage-missing").join("clip.mov");
        let _ = std::fs::remove_file(&path);
        assert!(remove_existing(&path).is_ok());
        assert!(path.parent().is_some_and(|p| p.is_dir()));
    }

    #[test]
    fn test_remove_existing_deletes_file() {
        let dir = std::env::temp_dir().join("tiltcam-storage-existing");
        ensure_dir(&dir).unwrap();
        let path = dir.join("clip.mov");
        std::fs::write(&path, b"old clip").unwrap();
        remove_existing(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_paths_use_config_names() {
        let config = Config::default();
        assert!(clip_path(&config).ends_with("tiltcam/video.mov"));
        assert!(export_path(&config).ends_with("tiltcam/exported-video.mov"));
    }
}
