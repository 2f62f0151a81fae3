// SPDX-License-Identifier: MIT OR Apache-2.0
//! Export pipeline errors.

use thiserror::Error;

/// The renderer could not produce a frame image
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("frame capture failed: {0}")]
pub struct CaptureError(pub String);

/// Errors that abort an export
#[derive(Debug, Error)]
pub enum ExportError {
    /// A backend request failed in transit or returned an error status
    #[error("{operation} failed: {reason}")]
    Connectivity {
        /// Backend operation, e.g. `upload frame 12`
        operation: String,
        /// Transport error or HTTP status
        reason: String,
    },

    /// The renderer failed to capture a frame
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// The user aborted the export
    #[error("export cancelled")]
    Cancelled,

    /// The backend reported that rendering failed, with its reason verbatim
    #[error("{0}")]
    ServerProcessing(String),

    /// Export settings rejected before any request was made
    #[error("invalid export settings: {0}")]
    InvalidSettings(String),
}

/// Result type for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

impl ExportError {
    /// Build a connectivity error for a backend operation
    pub fn connectivity(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connectivity {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// True for user-triggered aborts, which are not failures
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
