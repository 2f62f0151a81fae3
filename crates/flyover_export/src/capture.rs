// SPDX-License-Identifier: MIT OR Apache-2.0
//! Client-capture export: render every frame locally, upload, encode remotely.

use crate::backend::{CaptureBackend, FinishSessionRequest, StartSessionRequest};
use crate::error::Result;
use crate::renderer::{FrameRenderer, SurfaceGuard};
use crate::session::{
    ExportEvent, ExportHandle, ExportSettings, ExportedVideo, CAPTURE_PROGRESS_SHARE,
};
use flyover_sequencer::{total_frames, PlaybackClock, Subject, Timeline};
use std::time::Instant;

/// Playhead state to put back after capture
#[derive(Debug, Clone, Copy)]
struct ClockSnapshot {
    time: f64,
    was_playing: bool,
}

impl ClockSnapshot {
    fn take(clock: &PlaybackClock) -> Self {
        Self {
            time: clock.current_time(),
            was_playing: clock.is_playing(),
        }
    }

    fn restore<R: FrameRenderer>(
        self,
        clock: &mut PlaybackClock,
        timeline: &Timeline,
        renderer: &mut R,
    ) {
        clock.seek(self.time, timeline, renderer);
        if self.was_playing {
            clock.play(Instant::now(), renderer);
        } else {
            renderer.enable_interactive_control(true);
        }
    }
}

pub(crate) async fn run<R, B>(
    timeline: &Timeline,
    clock: &mut PlaybackClock,
    renderer: &mut R,
    backend: &B,
    settings: &ExportSettings,
    handle: &ExportHandle,
    events: &mut Subject<ExportEvent>,
) -> Result<ExportedVideo>
where
    R: FrameRenderer,
    B: CaptureBackend,
{
    let fps = clock.fps();
    let frame_count = total_frames(clock.duration(), fps);

    let session_id = backend
        .start_session(&StartSessionRequest {
            width: settings.width,
            height: settings.height,
            fps,
            quality: settings.quality,
            total_frames: frame_count,
        })
        .await?;
    tracing::info!(%session_id, frame_count, "Capture session started");

    let snapshot = ClockSnapshot::take(clock);
    clock.pause(renderer);
    renderer.enable_interactive_control(false);

    let captured = {
        let mut surface = SurfaceGuard::resize(renderer, settings.width, settings.height);
        capture_frames(
            timeline,
            &mut *surface,
            backend,
            &session_id,
            frame_count,
            fps,
            handle,
            events,
        )
        .await
    };
    snapshot.restore(clock, timeline, renderer);
    captured?;

    events.emit(&ExportEvent::Progress {
        percent: CAPTURE_PROGRESS_SHARE,
        message: "Encoding video...".to_owned(),
        indeterminate: true,
    });
    tracing::info!(%session_id, "Frames uploaded, encoding");

    let bytes = backend
        .finish_session(&FinishSessionRequest {
            session_id: session_id.clone(),
            fps,
            quality: settings.quality,
        })
        .await?;

    Ok(ExportedVideo::new(&session_id, bytes))
}

/// Sample, render, capture and upload every frame in order
async fn capture_frames<R, B>(
    timeline: &Timeline,
    renderer: &mut R,
    backend: &B,
    session_id: &str,
    frame_count: u64,
    fps: f64,
    handle: &ExportHandle,
    events: &mut Subject<ExportEvent>,
) -> Result<()>
where
    R: FrameRenderer,
    B: CaptureBackend,
{
    for frame in 0..frame_count {
        handle.checkpoint()?;

        let frame_time = frame as f64 / fps;
        renderer.apply_pose(&timeline.sample(frame_time));

        let image = renderer.render_and_capture().await?;
        tracing::trace!(frame, bytes = image.len(), "Captured frame");
        backend.upload_frame(session_id, frame, image).await?;

        let done = (frame + 1) as f64 / frame_count as f64;
        events.emit(&ExportEvent::Progress {
            percent: done * CAPTURE_PROGRESS_SHARE,
            message: format!("Capturing frame {}/{}", frame + 1, frame_count),
            indeterminate: false,
        });
    }
    Ok(())
}
