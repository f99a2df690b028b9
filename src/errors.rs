// SPDX-License-Identifier: MPL-2.0

//! Error types for capture, recording and rendering

use crate::backends::capture::DropReason;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Capture-related errors
    Capture(CaptureError),
    /// Recording session errors
    Recording(RecordingError),
    /// Mask, filter and export errors
    Render(RenderError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Capture-side errors
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// One member of a synchronized pair was dropped by the source
    FrameDropped(DropReason),
    /// Device setup failed (surfaced from the capture backend unchanged)
    DeviceConfigurationFailure(String),
}

/// Recording session lifecycle errors
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingError {
    /// Writer could not be created or could not begin its session
    WriterUnavailable(String),
    /// Operation not valid in the session's current state
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
    /// Recording was requested while the capture context is stopped
    CaptureNotRunning,
    /// Writer failed while finishing the clip
    FinalizeFailed(String),
}

/// Rendering errors, reported per frame
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Mask parameters or frame geometry rejected
    InvalidParameter(String),
    /// Recorded clip could not be decoded
    DecodeFailed(String),
    /// Export pipeline failed
    ExportFailed(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Recording(e) => write!(f, "Recording error: {}", e),
            AppError::Render(e) => write!(f, "Render error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::FrameDropped(reason) => write!(f, "Frame dropped ({})", reason),
            CaptureError::DeviceConfigurationFailure(msg) => {
                write!(f, "Device configuration failed: {}", msg)
            }
        }
    }
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingError::WriterUnavailable(msg) => write!(f, "Writer unavailable: {}", msg),
            RecordingError::InvalidState { expected, actual } => write!(
                f,
                "Recording session is {} (operation requires {})",
                actual, expected
            ),
            RecordingError::CaptureNotRunning => {
                write!(f, "Cannot record while depth/video capture is stopped")
            }
            RecordingError::FinalizeFailed(msg) => write!(f, "Failed to finalize clip: {}", msg),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            RenderError::DecodeFailed(msg) => write!(f, "Decode failed: {}", msg),
            RenderError::ExportFailed(msg) => write!(f, "Export failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for RecordingError {}
impl std::error::Error for RenderError {}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<RecordingError> for AppError {
    fn from(err: RecordingError) -> Self {
        AppError::Recording(err)
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        AppError::Render(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_reason() {
        let err = AppError::from(CaptureError::FrameDropped(DropReason::LateData));
        assert_eq!(err.to_string(), "Capture error: Frame dropped (late data)");
    }

    #[test]
    fn test_invalid_state_message() {
        let err = RecordingError::InvalidState {
            expected: "idle",
            actual: "active",
        };
        assert!(err.to_string().contains("requires idle"));
    }
}
