// SPDX-License-Identifier: MPL-2.0

//! Capture backends
//!
//! ```text
//! ┌───────────────────┐  pairs  ┌────────────────────────┐  commit  ┌────────────────────┐
//! │ CaptureSource     │ ──────▶ │ SyncCaptureCoordinator │ ───────▶ │ RecordingSession   │
//! │ (device/synthetic)│         │ (capture thread)       │          │ writer + depth seq │
//! └───────────────────┘         └────────────────────────┘          └────────────────────┘
//! ```
//!
//! - [`capture`]: sample types, the capture-delivery loop, the coordinator
//!   and the synthetic source

pub mod capture;
