// SPDX-License-Identifier: MPL-2.0

//! Recording and playback pipelines
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────────────┐
//! │ Sample pairs │ ──▶ │ Recording session │ ──▶ │ video.mov + depth seq │
//! └──────────────┘     └───────────────────┘     └──────────┬───────────┘
//!                                                           │
//! ┌──────────────┐     ┌───────────────────┐                │
//! │ Output frame │ ◀── │ Playback compositor│ ◀─────────────┘
//! └──────────────┘     │ mask + filter bank │
//!                      └───────────────────┘
//! ```
//!
//! - [`recording`]: session state machine and clip writers
//! - [`playback`]: render controls, compositor, clip decoding and export

pub mod playback;
pub mod recording;
