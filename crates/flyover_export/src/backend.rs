// SPDX-License-Identifier: MIT OR Apache-2.0
//! Render/encode backend protocol.
//!
//! Two independent protocols:
//! - [`CaptureBackend`]: the client uploads every frame, the backend encodes
//! - [`RemoteRenderBackend`]: the backend renders the whole path itself and
//!   is polled for status

use crate::error::Result;
use flyover_sequencer::KeyframeRecord;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Opens a client-capture session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frames per second
    pub fps: f64,
    /// Encoder quality, 1-100
    pub quality: u8,
    /// Frames that will be uploaded
    pub total_frames: u64,
}

/// Server reply carrying the new session id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStarted {
    /// Opaque server-issued id
    pub session_id: String,
}

/// Asks the backend to encode the uploaded frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishSessionRequest {
    /// Session being finished
    pub session_id: String,
    /// Frames per second
    pub fps: f64,
    /// Encoder quality, 1-100
    pub quality: u8,
}

/// Output resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Pixels
    pub width: u32,
    /// Pixels
    pub height: u32,
}

/// Snapshot submitted for a server-side render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteJobRequest {
    /// The whole camera path
    pub keyframes: Vec<KeyframeRecord>,
    /// Clip length in seconds
    pub duration: f64,
    /// Frames per second
    pub fps: f64,
    /// Output size
    pub resolution: Resolution,
    /// Encoder quality, 1-100
    pub quality: u8,
}

/// Server-side job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Waiting for a render slot
    Queued,
    /// Rendering or encoding
    Processing,
    /// Video ready for download
    Completed,
    /// Rendering failed
    Failed,
    /// Anything this client does not know; treated as still running
    #[serde(other)]
    Unknown,
}

impl JobState {
    /// No further polling needed
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Reply to a status poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    /// Job state
    pub status: JobState,
    /// Percent complete, 0-100
    #[serde(default)]
    pub progress: f64,
    /// Human-readable progress text
    #[serde(default)]
    pub message: String,
    /// Failure description when `status` is failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Backend for client-capture exports
pub trait CaptureBackend {
    /// Open a session and return its id
    fn start_session(
        &self,
        request: &StartSessionRequest,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Upload one encoded frame
    fn upload_frame(
        &self,
        session_id: &str,
        frame_index: u64,
        image: Vec<u8>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Encode the uploaded frames and return the video
    fn finish_session(
        &self,
        request: &FinishSessionRequest,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Backend for server-render exports
pub trait RemoteRenderBackend {
    /// Submit the snapshot and return the job's session id
    fn start_job(&self, request: &RemoteJobRequest) -> impl Future<Output = Result<String>> + Send;

    /// Fetch the job's current status
    fn job_status(&self, session_id: &str) -> impl Future<Output = Result<JobStatus>> + Send;

    /// Download the finished video
    fn download_result(&self, session_id: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Tell the backend the client gave up on the job. Best effort.
    fn cancel_job(&self, session_id: &str) -> impl Future<Output = Result<()>> + Send;
}
