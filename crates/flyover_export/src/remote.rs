// SPDX-License-Identifier: MIT OR Apache-2.0
//! Server-render export: submit the path once, then poll until the job ends.

use crate::backend::{JobState, JobStatus, RemoteJobRequest, RemoteRenderBackend, Resolution};
use crate::error::{ExportError, Result};
use crate::session::{ExportEvent, ExportHandle, ExportSettings, ExportedVideo};
use flyover_sequencer::{KeyframeRecord, PlaybackClock, Subject, Timeline};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Snapshot the timeline and clip settings for submission
pub(crate) fn job_request(
    timeline: &Timeline,
    clock: &PlaybackClock,
    settings: &ExportSettings,
) -> RemoteJobRequest {
    RemoteJobRequest {
        keyframes: timeline.keyframes().iter().map(KeyframeRecord::from).collect(),
        duration: clock.duration(),
        fps: clock.fps(),
        resolution: Resolution {
            width: settings.width,
            height: settings.height,
        },
        quality: settings.quality,
    }
}

pub(crate) async fn run<B: RemoteRenderBackend>(
    request: RemoteJobRequest,
    backend: &B,
    poll_interval: Duration,
    handle: &ExportHandle,
    events: &mut Subject<ExportEvent>,
) -> Result<ExportedVideo> {
    let session_id = backend.start_job(&request).await?;
    tracing::info!(%session_id, keyframes = request.keyframes.len(), "Remote render job submitted");
    events.emit(&ExportEvent::Progress {
        percent: 0.0,
        message: "Waiting for server...".to_owned(),
        indeterminate: true,
    });

    poll_until_done(backend, &session_id, poll_interval, handle, events).await?;

    let bytes = backend.download_result(&session_id).await?;
    Ok(ExportedVideo::new(&session_id, bytes))
}

/// Poll on a fixed cadence until the job reaches a terminal state.
///
/// The first poll happens one interval after submission. Cancellation is
/// checked at the top of every poll.
async fn poll_until_done<B: RemoteRenderBackend>(
    backend: &B,
    session_id: &str,
    poll_interval: Duration,
    handle: &ExportHandle,
    events: &mut Subject<ExportEvent>,
) -> Result<()> {
    let start = tokio::time::Instant::now() + poll_interval;
    let mut ticker = tokio::time::interval_at(start, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_state = None;

    loop {
        ticker.tick().await;

        if handle.is_cancel_requested() {
            // the job's fate belongs to the backend; this is only a notice
            if let Err(e) = backend.cancel_job(session_id).await {
                tracing::warn!(%session_id, "Failed to notify backend of cancellation: {e}");
            }
            return Err(ExportError::Cancelled);
        }

        let JobStatus {
            status,
            progress,
            message,
            error,
        } = backend.job_status(session_id).await?;

        if last_state != Some(status) {
            tracing::info!(%session_id, ?status, progress, "Remote render status");
            last_state = Some(status);
        }

        match status {
            JobState::Completed => return Ok(()),
            JobState::Failed => {
                let reason = error
                    .filter(|e| !e.is_empty())
                    .unwrap_or(message);
                return Err(ExportError::ServerProcessing(reason));
            }
            JobState::Queued | JobState::Processing | JobState::Unknown => {
                events.emit(&ExportEvent::Progress {
                    percent: progress.clamp(0.0, 100.0),
                    message,
                    indeterminate: false,
                });
            }
        }
    }
}
