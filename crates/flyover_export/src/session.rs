// SPDX-License-Identifier: MIT OR Apache-2.0
//! Export settings, progress events and the shared export state.

use crate::error::{ExportError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Share of the progress bar used by frame capture in client-capture mode
pub const CAPTURE_PROGRESS_SHARE: f64 = 80.0;

/// How the video gets rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportMode {
    /// Render locally, upload every frame, encode on the server
    #[default]
    ClientCapture,
    /// Submit the path and let the server render everything
    ServerRender,
}

impl ExportMode {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            ExportMode::ClientCapture => "client capture",
            ExportMode::ServerRender => "server render",
        }
    }
}

/// Output parameters chosen by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Encoder quality, 1-100, passed through to the backend
    pub quality: u8,
}

impl ExportSettings {
    /// Reject settings no backend can honor
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ExportError::InvalidSettings(format!(
                "resolution {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(ExportError::InvalidSettings(format!(
                "quality {} must be between 1 and 100",
                self.quality
            )));
        }
        Ok(())
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            quality: 90,
        }
    }
}

/// Finished video ready to hand to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedVideo {
    /// Suggested file name
    pub file_name: String,
    /// Encoded video
    pub bytes: Vec<u8>,
}

impl ExportedVideo {
    /// Name the video after the session. The id comes from the server, so
    /// anything outside `[A-Za-z0-9_-]` becomes `_`.
    pub(crate) fn new(session_id: &str, bytes: Vec<u8>) -> Self {
        let stem: String = session_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Self {
            file_name: format!("flyover-{stem}.mp4"),
            bytes,
        }
    }
}

/// Result of asking for an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The video was produced
    Completed(ExportedVideo),
    /// Another export was already running; nothing happened
    AlreadyRunning,
}

/// Status updates published while an export runs
#[derive(Debug, Clone, PartialEq)]
pub enum ExportEvent {
    /// Export began; UI controls should lock
    Started(ExportMode),
    /// Progress in percent with a status line
    Progress {
        /// 0-100
        percent: f64,
        /// Status text
        message: String,
        /// True while the backend gives no measurable progress
        indeterminate: bool,
    },
    /// Video delivered
    Completed {
        /// Suggested file name of the video
        file_name: String,
    },
    /// Export failed; progress is back at zero
    Failed {
        /// User-facing error text
        message: String,
    },
    /// The user aborted the export
    Cancelled,
    /// Always the last event of an export; UI controls should unlock
    Ended(ExportMode),
}

#[derive(Debug, Default)]
struct ExportFlags {
    exporting: AtomicBool,
    cancel_requested: AtomicBool,
}

/// Cloneable view of the export state for other tasks.
///
/// Lets a signal handler or UI thread cancel the running export and ask
/// whether one is active.
#[derive(Debug, Clone, Default)]
pub struct ExportHandle {
    flags: Arc<ExportFlags>,
}

impl ExportHandle {
    /// Create an idle handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next checkpoint.
    pub fn cancel(&self) {
        if self.is_exporting() {
            tracing::info!("Export cancellation requested");
            self.flags.cancel_requested.store(true, Ordering::SeqCst);
        }
    }

    /// True while an export is in flight
    pub fn is_exporting(&self) -> bool {
        self.flags.exporting.load(Ordering::SeqCst)
    }

    /// True once cancellation has been requested for the running export
    pub fn is_cancel_requested(&self) -> bool {
        self.flags.cancel_requested.load(Ordering::SeqCst)
    }

    /// Claim the exporting flag. `None` if an export is already running.
    pub(crate) fn begin(&self) -> Option<ExportGuard> {
        self.flags
            .exporting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        Some(ExportGuard {
            flags: self.flags.clone(),
        })
    }

    /// Error out if cancellation was requested
    pub(crate) fn checkpoint(&self) -> Result<()> {
        if self.is_cancel_requested() {
            Err(ExportError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Holds the exporting flag; releases it on drop
#[derive(Debug)]
pub(crate) struct ExportGuard {
    flags: Arc<ExportFlags>,
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.flags.cancel_requested.store(false, Ordering::SeqCst);
        self.flags.exporting.store(false, Ordering::SeqCst);
    }
}
