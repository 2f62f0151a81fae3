// SPDX-License-Identifier: MIT OR Apache-2.0
//! Export entry points shared by both modes.
//!
//! Every export runs under the single exporting flag, publishes `Started`
//! first and `Ended` last, and turns any error into a user-facing status
//! event before handing it back to the caller.

use crate::backend::{CaptureBackend, RemoteRenderBackend};
use crate::error::{ExportError, Result};
use crate::renderer::FrameRenderer;
use crate::session::{
    ExportEvent, ExportGuard, ExportHandle, ExportMode, ExportOutcome, ExportSettings,
    ExportedVideo,
};
use crate::{capture, remote};
use flyover_sequencer::{PlaybackClock, Subject, SubscriptionId, Timeline};
use std::time::Duration;

/// Default spacing between server-render status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Runs exports and publishes their progress
#[derive(Debug)]
pub struct Exporter {
    handle: ExportHandle,
    events: Subject<ExportEvent>,
    poll_interval: Duration,
}

impl Exporter {
    /// Create an idle exporter
    pub fn new() -> Self {
        Self {
            handle: ExportHandle::new(),
            events: Subject::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the server-render poll cadence
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Handle for cancelling from elsewhere
    pub fn handle(&self) -> ExportHandle {
        self.handle.clone()
    }

    /// Register a listener for export events
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&ExportEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    /// Remove a listener
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Render every frame locally and have the backend encode them.
    ///
    /// The clock is paused for the duration and the render surface resized
    /// to the export resolution; both are restored on every exit path.
    pub async fn export_client_capture<R, B>(
        &mut self,
        timeline: &Timeline,
        clock: &mut PlaybackClock,
        renderer: &mut R,
        backend: &B,
        settings: &ExportSettings,
    ) -> Result<ExportOutcome>
    where
        R: FrameRenderer,
        B: CaptureBackend,
    {
        let mode = ExportMode::ClientCapture;
        let Some(guard) = self.begin(mode) else {
            return Ok(ExportOutcome::AlreadyRunning);
        };

        let result = match settings.validate() {
            Ok(()) => {
                capture::run(
                    timeline,
                    clock,
                    renderer,
                    backend,
                    settings,
                    &self.handle,
                    &mut self.events,
                )
                .await
            }
            Err(e) => Err(e),
        };
        self.finish(mode, guard, result)
    }

    /// Submit the path to the backend and poll until the video is ready
    pub async fn export_server_render<B>(
        &mut self,
        timeline: &Timeline,
        clock: &PlaybackClock,
        backend: &B,
        settings: &ExportSettings,
    ) -> Result<ExportOutcome>
    where
        B: RemoteRenderBackend,
    {
        let mode = ExportMode::ServerRender;
        let Some(guard) = self.begin(mode) else {
            return Ok(ExportOutcome::AlreadyRunning);
        };

        let result = match settings.validate() {
            Ok(()) => {
                let request = remote::job_request(timeline, clock, settings);
                remote::run(
                    request,
                    backend,
                    self.poll_interval,
                    &self.handle,
                    &mut self.events,
                )
                .await
            }
            Err(e) => Err(e),
        };
        self.finish(mode, guard, result)
    }

    fn begin(&mut self, mode: ExportMode) -> Option<ExportGuard> {
        let Some(guard) = self.handle.begin() else {
            tracing::warn!("Export already in progress, ignoring {} request", mode.name());
            return None;
        };
        tracing::info!("Starting {} export", mode.name());
        self.events.emit(&ExportEvent::Started(mode));
        Some(guard)
    }

    /// Publish the outcome, release the exporting flag, then publish `Ended`
    fn finish(
        &mut self,
        mode: ExportMode,
        guard: ExportGuard,
        result: Result<ExportedVideo>,
    ) -> Result<ExportOutcome> {
        let outcome = match result {
            Ok(video) => {
                tracing::info!(
                    file = %video.file_name,
                    bytes = video.bytes.len(),
                    "{} export complete",
                    mode.name()
                );
                self.events.emit(&ExportEvent::Progress {
                    percent: 100.0,
                    message: "Export complete".to_owned(),
                    indeterminate: false,
                });
                self.events.emit(&ExportEvent::Completed {
                    file_name: video.file_name.clone(),
                });
                Ok(ExportOutcome::Completed(video))
            }
            Err(ExportError::Cancelled) => {
                tracing::info!("{} export cancelled", mode.name());
                self.events.emit(&ExportEvent::Progress {
                    percent: 0.0,
                    message: "Export cancelled".to_owned(),
                    indeterminate: false,
                });
                self.events.emit(&ExportEvent::Cancelled);
                Err(ExportError::Cancelled)
            }
            Err(e) => {
                tracing::error!("{} export failed: {e}", mode.name());
                let message = e.to_string();
                self.events.emit(&ExportEvent::Progress {
                    percent: 0.0,
                    message: message.clone(),
                    indeterminate: false,
                });
                self.events.emit(&ExportEvent::Failed { message });
                Err(e)
            }
        };

        drop(guard);
        self.events.emit(&ExportEvent::Ended(mode));
        outcome
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::JobState;
    use crate::testing::{
        call_log, event_log, status, uploads, Call, MockCaptureBackend, MockRemoteBackend,
        MockRenderer,
    };
    use flyover_sequencer::{CameraPose, Keyframe};

    fn path() -> Timeline {
        Timeline::from_keyframes([
            Keyframe::new(0.0, CameraPose::at(10.0, 20.0, 1000.0)),
            Keyframe::new(
                1.0,
                CameraPose::at(20.0, 40.0, 3000.0).with_orientation(90.0, -45.0, 0.0),
            ),
        ])
    }

    #[tokio::test]
    async fn test_client_capture_uploads_every_frame_in_order() {
        let log = call_log();
        let timeline = path();
        let mut clock = PlaybackClock::new(1.0, 10.0).unwrap();
        let mut renderer = MockRenderer::new(log.clone(), 800, 600);
        let backend = MockCaptureBackend::new(log.clone());
        let mut exporter = Exporter::new();

        let outcome = exporter
            .export_client_capture(
                &timeline,
                &mut clock,
                &mut renderer,
                &backend,
                &ExportSettings::default(),
            )
            .await
            .unwrap();
        let ExportOutcome::Completed(video) = outcome else {
            panic!("expected a video");
        };
        assert_eq!(video.file_name, "flyover-session-1.mp4");
        assert_eq!(video.bytes, b"video".to_vec());
        assert_eq!(uploads(&log), (0..10).collect::<Vec<u64>>());

        // every upload is preceded by the pose sampled at its frame time
        let calls = log.lock().clone();
        let mut last_pose = None;
        let mut frame = 0u64;
        for call in &calls {
            match call {
                Call::Pose(pose) => last_pose = Some(*pose),
                Call::Upload(session, index) => {
                    assert_eq!(session, "session-1");
                    assert_eq!(*index, frame);
                    assert_eq!(last_pose, Some(timeline.sample(frame as f64 / 10.0)));
                    frame += 1;
                }
                _ => {}
            }
        }

        assert!(matches!(
            calls.first(),
            Some(Call::StartSession(r))
                if r.total_frames == 10 && r.width == 1920 && r.height == 1080
        ));
        assert!(matches!(calls.last(), Some(Call::Finish(r)) if r.session_id == "session-1"));
        assert!(calls.contains(&Call::Resize(1920, 1080)));
        assert_eq!(renderer.size, (800, 600));
        assert!(!exporter.handle().is_exporting());
    }

    #[tokio::test]
    async fn test_client_capture_progress_sequence() {
        let log = call_log();
        let timeline = path();
        let mut clock = PlaybackClock::new(1.0, 4.0).unwrap();
        let mut renderer = MockRenderer::new(log.clone(), 800, 600);
        let backend = MockCaptureBackend::new(log);
        let mut exporter = Exporter::new();
        let (events, sink) = event_log();
        exporter.subscribe(sink);

        exporter
            .export_client_capture(
                &timeline,
                &mut clock,
                &mut renderer,
                &backend,
                &ExportSettings::default(),
            )
            .await
            .unwrap();

        let events = events.lock().clone();
        assert_eq!(events.first(), Some(&ExportEvent::Started(ExportMode::ClientCapture)));
        assert_eq!(events.last(), Some(&ExportEvent::Ended(ExportMode::ClientCapture)));

        let percents: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                ExportEvent::Progress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect();
        assert_eq!(percents, vec![20.0, 40.0, 60.0, 80.0, 80.0, 100.0]);
        assert!(events.contains(&ExportEvent::Progress {
            percent: 80.0,
            message: "Encoding video...".to_owned(),
            indeterminate: true,
        }));
        assert!(events.contains(&ExportEvent::Completed {
            file_name: "flyover-session-1.mp4".to_owned()
        }));
    }

    #[tokio::test]
    async fn test_cancel_stops_uploads_and_restores_surface() {
        let log = call_log();
        let timeline = path();
        let mut clock = PlaybackClock::new(1.0, 10.0).unwrap();
        let mut renderer = MockRenderer::new(log.clone(), 800, 600);
        let mut exporter = Exporter::new();
        let mut backend = MockCaptureBackend::new(log.clone());
        backend.cancel_during_upload = Some((3, exporter.handle()));
        let (events, sink) = event_log();
        exporter.subscribe(sink);

        let result = exporter
            .export_client_capture(
                &timeline,
                &mut clock,
                &mut renderer,
                &backend,
                &ExportSettings::default(),
            )
            .await;

        assert!(matches!(result, Err(ExportError::Cancelled)));
        assert_eq!(uploads(&log), vec![0, 1, 2, 3]);
        assert!(!log.lock().iter().any(|c| matches!(c, Call::Finish(_))));
        assert_eq!(renderer.size, (800, 600));
        assert!(!exporter.handle().is_exporting());
        assert!(!exporter.handle().is_cancel_requested());

        let events = events.lock().clone();
        assert!(events.contains(&ExportEvent::Cancelled));
        assert!(!events.iter().any(|e| matches!(e, ExportEvent::Failed { .. })));
        assert_eq!(events.last(), Some(&ExportEvent::Ended(ExportMode::ClientCapture)));
    }

    #[tokio::test]
    async fn test_capture_failure_restores_clock_and_reports() {
        let log = call_log();
        let timeline = path();
        let mut clock = PlaybackClock::new(1.0, 10.0).unwrap();
        let mut renderer = MockRenderer::new(log.clone(), 800, 600);
        renderer.fail_capture_at = Some(2);
        clock.seek(0.5, &timeline, &mut renderer);
        clock.play(std::time::Instant::now(), &mut renderer);
        let backend = MockCaptureBackend::new(log.clone());
        let mut exporter = Exporter::new();
        let (events, sink) = event_log();
        exporter.subscribe(sink);

        let result = exporter
            .export_client_capture(
                &timeline,
                &mut clock,
                &mut renderer,
                &backend,
                &ExportSettings::default(),
            )
            .await;

        assert!(matches!(result, Err(ExportError::Capture(_))));
        assert_eq!(uploads(&log), vec![0, 1]);
        assert!(clock.is_playing());
        assert_eq!(clock.current_time(), 0.5);
        assert_eq!(renderer.size, (800, 600));

        let events = events.lock().clone();
        assert!(events.contains(&ExportEvent::Failed {
            message: "frame capture failed: surface lost".to_owned()
        }));
        assert!(events.contains(&ExportEvent::Progress {
            percent: 0.0,
            message: "frame capture failed: surface lost".to_owned(),
            indeterminate: false,
        }));
    }

    #[tokio::test]
    async fn test_start_failure_leaves_renderer_untouched() {
        let log = call_log();
        let timeline = path();
        let mut clock = PlaybackClock::new(1.0, 10.0).unwrap();
        let mut renderer = MockRenderer::new(log.clone(), 800, 600);
        let mut backend = MockCaptureBackend::new(log.clone());
        backend.fail_start = true;
        let mut exporter = Exporter::new();

        let result = exporter
            .export_client_capture(
                &timeline,
                &mut clock,
                &mut renderer,
                &backend,
                &ExportSettings::default(),
            )
            .await;

        assert!(matches!(result, Err(ExportError::Connectivity { .. })));
        assert_eq!(log.lock().len(), 1);
        assert_eq!(clock.current_time(), 0.0);
        assert!(!exporter.handle().is_exporting());
    }

    #[tokio::test]
    async fn test_upload_failure_aborts() {
        let log = call_log();
        let timeline = path();
        let mut clock = PlaybackClock::new(1.0, 10.0).unwrap();
        let mut renderer = MockRenderer::new(log.clone(), 800, 600);
        let mut backend = MockCaptureBackend::new(log.clone());
        backend.fail_upload_at = Some(5);
        let mut exporter = Exporter::new();

        let result = exporter
            .export_client_capture(
                &timeline,
                &mut clock,
                &mut renderer,
                &backend,
                &ExportSettings::default(),
            )
            .await;

        let Err(ExportError::Connectivity { operation, .. }) = result else {
            panic!("expected a connectivity error");
        };
        assert_eq!(operation, "upload frame 5");
        assert_eq!(uploads(&log), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(renderer.size, (800, 600));
    }

    #[tokio::test]
    async fn test_second_export_is_ignored_while_running() {
        let log = call_log();
        let timeline = path();
        let mut clock = PlaybackClock::new(1.0, 10.0).unwrap();
        let mut renderer = MockRenderer::new(log.clone(), 800, 600);
        let backend = MockCaptureBackend::new(log.clone());
        let mut exporter = Exporter::new();
        let (events, sink) = event_log();
        exporter.subscribe(sink);

        let running = exporter.handle().begin().unwrap();
        let outcome = exporter
            .export_client_capture(
                &timeline,
                &mut clock,
                &mut renderer,
                &backend,
                &ExportSettings::default(),
            )
            .await
            .unwrap();

        assert_eq!(outcome, ExportOutcome::AlreadyRunning);
        assert!(log.lock().is_empty());
        assert!(events.lock().is_empty());
        assert!(exporter.handle().is_exporting());
        drop(running);
    }

    #[tokio::test]
    async fn test_invalid_settings_fail_before_any_request() {
        let log = call_log();
        let timeline = path();
        let mut clock = PlaybackClock::new(1.0, 10.0).unwrap();
        let mut renderer = MockRenderer::new(log.clone(), 800, 600);
        let backend = MockCaptureBackend::new(log.clone());
        let mut exporter = Exporter::new();
        let settings = ExportSettings {
            quality: 0,
            ..ExportSettings::default()
        };

        let result = exporter
            .export_client_capture(&timeline, &mut clock, &mut renderer, &backend, &settings)
            .await;

        assert!(matches!(result, Err(ExportError::InvalidSettings(_))));
        assert!(log.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_render_polls_until_complete() {
        let timeline = path();
        let clock = PlaybackClock::new(1.0, 30.0).unwrap();
        let backend = MockRemoteBackend::new([
            status(JobState::Queued, 0.0, "Queued"),
            status(JobState::Processing, 50.0, "Rendering frame 15/30"),
            status(JobState::Completed, 100.0, "Done"),
        ]);
        let mut exporter = Exporter::new();
        let (events, sink) = event_log();
        exporter.subscribe(sink);

        let started = tokio::time::Instant::now();
        let outcome = exporter
            .export_server_render(&timeline, &clock, &backend, &ExportSettings::default())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ExportOutcome::Completed(ExportedVideo {
                file_name: "flyover-job-7.mp4".to_owned(),
                bytes: b"remote-video".to_vec(),
            })
        );
        assert_eq!(*backend.polls.lock(), 3);
        assert_eq!(*backend.downloads.lock(), 1);
        assert!(started.elapsed() >= DEFAULT_POLL_INTERVAL * 3);

        let submitted = backend.submitted.lock().clone().unwrap();
        assert_eq!(submitted.keyframes.len(), 2);
        assert_eq!(submitted.fps, 30.0);
        assert_eq!(submitted.resolution.width, 1920);

        let events = events.lock().clone();
        assert!(events.contains(&ExportEvent::Progress {
            percent: 50.0,
            message: "Rendering frame 15/30".to_owned(),
            indeterminate: false,
        }));
        assert_eq!(events.last(), Some(&ExportEvent::Ended(ExportMode::ServerRender)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_failure_surfaces_message() {
        let timeline = path();
        let clock = PlaybackClock::new(1.0, 30.0).unwrap();
        let mut failed = status(JobState::Failed, 10.0, "Rendering");
        failed.error = Some("GPU out of memory".to_owned());
        let backend =
            MockRemoteBackend::new([status(JobState::Processing, 10.0, "Rendering"), failed]);
        let mut exporter = Exporter::new();
        let (events, sink) = event_log();
        exporter.subscribe(sink);

        let result = exporter
            .export_server_render(&timeline, &clock, &backend, &ExportSettings::default())
            .await;

        let Err(ExportError::ServerProcessing(reason)) = result else {
            panic!("expected a server failure");
        };
        assert_eq!(reason, "GPU out of memory");
        assert_eq!(*backend.downloads.lock(), 0);
        assert!(events.lock().contains(&ExportEvent::Failed {
            message: "GPU out of memory".to_owned(),
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_render_cancel_notifies_backend() {
        let timeline = path();
        let clock = PlaybackClock::new(1.0, 30.0).unwrap();
        let mut exporter = Exporter::new().with_poll_interval(Duration::from_millis(250));
        let mut backend = MockRemoteBackend::new([status(JobState::Processing, 5.0, "Rendering")]);
        backend.cancel_on_poll = Some((2, exporter.handle()));

        let result = exporter
            .export_server_render(&timeline, &clock, &backend, &ExportSettings::default())
            .await;

        assert!(matches!(result, Err(ExportError::Cancelled)));
        assert_eq!(*backend.polls.lock(), 2);
        assert!(*backend.cancelled.lock());
        assert_eq!(*backend.downloads.lock(), 0);
        assert!(!exporter.handle().is_exporting());
    }
}
