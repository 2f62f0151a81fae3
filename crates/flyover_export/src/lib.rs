// SPDX-License-Identifier: MIT OR Apache-2.0
//! Video export for Flyover camera paths.
//!
//! Two pipelines share one exporting flag and one event stream:
//! - client capture: every frame is rendered locally, uploaded and encoded
//!   by the backend
//! - server render: the path is submitted once and the backend is polled
//!   until the video is ready
//!
//! [`Studio`] ties the timeline, the playback clock, the renderer and the
//! [`Exporter`] together so playback and export never touch the camera at
//! the same time.

pub mod backend;
mod capture;
pub mod error;
pub mod exporter;
pub mod http;
mod remote;
pub mod renderer;
pub mod session;
pub mod studio;

#[cfg(test)]
mod testing;

pub use backend::{
    CaptureBackend, FinishSessionRequest, JobState, JobStatus, RemoteJobRequest,
    RemoteRenderBackend,
    Resolution, SessionStarted, StartSessionRequest,
};
pub use error::{CaptureError, ExportError, Result};
pub use exporter::{Exporter, DEFAULT_POLL_INTERVAL};
pub use http::HttpBackend;
pub use renderer::{FrameRenderer, SurfaceGuard};
pub use session::{
    ExportEvent, ExportHandle, ExportMode, ExportOutcome, ExportSettings, ExportedVideo,
    CAPTURE_PROGRESS_SHARE,
};
pub use studio::Studio;
