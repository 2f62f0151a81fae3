// SPDX-License-Identifier: MIT OR Apache-2.0
//! The controller that owns the camera path, the clock, the renderer and the
//! exporter.
//!
//! Everything that writes the playhead or the camera goes through `&mut
//! Studio`, so the playback tick and an export's frame loop can never run at
//! the same time.

use crate::backend::{CaptureBackend, RemoteRenderBackend};
use crate::error::Result;
use crate::exporter::Exporter;
use crate::renderer::FrameRenderer;
use crate::session::{ExportEvent, ExportHandle, ExportOutcome, ExportSettings};
use flyover_sequencer::{
    ClockError, DocumentError, PlaybackClock, PlaybackEvent, ProjectDocument, SubscriptionId,
    Timeline,
};
use std::time::Instant;

/// Camera path editor and exporter state
#[derive(Debug)]
pub struct Studio<R> {
    timeline: Timeline,
    clock: PlaybackClock,
    renderer: R,
    exporter: Exporter,
}

impl<R: FrameRenderer> Studio<R> {
    /// Create a studio with an empty path
    pub fn new(renderer: R, duration: f64, fps: f64) -> std::result::Result<Self, ClockError> {
        Ok(Self {
            timeline: Timeline::new(),
            clock: PlaybackClock::new(duration, fps)?,
            renderer,
            exporter: Exporter::new(),
        })
    }

    /// Replace the exporter, e.g. to change the poll interval
    pub fn with_exporter(mut self, exporter: Exporter) -> Self {
        self.exporter = exporter;
        self
    }

    /// Camera path
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Camera path for editing
    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    /// Playback clock
    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    /// Renderer
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Renderer for direct manipulation
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Register a listener for playback events
    pub fn on_playback(
        &mut self,
        listener: impl FnMut(&PlaybackEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.clock.subscribe(listener)
    }

    /// Register a listener for export events
    pub fn on_export(
        &mut self,
        listener: impl FnMut(&ExportEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.exporter.subscribe(listener)
    }

    /// Handle for cancelling an export from another task
    pub fn export_handle(&self) -> ExportHandle {
        self.exporter.handle()
    }

    /// Start playback
    pub fn play(&mut self) -> bool {
        self.clock.play(Instant::now(), &mut self.renderer)
    }

    /// Pause playback
    pub fn pause(&mut self) -> bool {
        self.clock.pause(&mut self.renderer)
    }

    /// Toggle play/pause
    pub fn toggle_playback(&mut self) -> bool {
        self.clock.toggle(Instant::now(), &mut self.renderer)
    }

    /// Pause and rewind
    pub fn stop(&mut self) {
        self.clock.stop(&self.timeline, &mut self.renderer);
    }

    /// Move the playhead
    pub fn seek(&mut self, time: f64) {
        self.clock.seek(time, &self.timeline, &mut self.renderer);
    }

    /// One frame forward
    pub fn step_forward(&mut self) {
        self.clock.step_forward(&self.timeline, &mut self.renderer);
    }

    /// One frame back
    pub fn step_backward(&mut self) {
        self.clock.step_backward(&self.timeline, &mut self.renderer);
    }

    /// Advance playback; call from the host frame loop
    pub fn tick(&mut self, now: Instant) -> bool {
        self.clock.tick(now, &self.timeline, &mut self.renderer)
    }

    /// Change the frame rate
    pub fn set_fps(&mut self, fps: f64) -> std::result::Result<(), ClockError> {
        self.clock.set_fps(fps)
    }

    /// Change the clip length
    pub fn set_duration(&mut self, duration: f64) -> std::result::Result<(), ClockError> {
        self.clock.set_duration(duration)
    }

    /// Enable or disable looping
    pub fn set_loop(&mut self, looping: bool) {
        self.clock.set_loop(looping);
    }

    /// Load a project document, replacing the current path.
    ///
    /// The document is fully parsed and validated before anything changes;
    /// on error the studio is untouched.
    pub fn import_document(&mut self, json: &str) -> std::result::Result<(), DocumentError> {
        let document = ProjectDocument::from_json(json)?;
        let keyframes = document.to_keyframes()?;

        self.clock.pause(&mut self.renderer);
        self.clock
            .set_duration(document.duration)
            .and_then(|()| self.clock.set_fps(document.fps))
            .map_err(|e| DocumentError::Invalid {
                field: "clip".to_owned(),
                reason: e.to_string(),
            })?;
        self.timeline.replace_all(keyframes);
        self.clock.seek(0.0, &self.timeline, &mut self.renderer);

        tracing::info!(
            keyframes = self.timeline.len(),
            duration = document.duration,
            fps = document.fps,
            "Imported project document"
        );
        Ok(())
    }

    /// Snapshot the path and clip settings as a project document
    pub fn to_document(&self) -> ProjectDocument {
        ProjectDocument::from_keyframes(
            self.clock.duration(),
            self.clock.fps(),
            self.timeline.keyframes(),
        )
    }

    /// Serialize the project as JSON
    pub fn export_document(&self) -> std::result::Result<String, DocumentError> {
        self.to_document().to_json()
    }

    /// Client-capture export through `backend`
    pub async fn export_client_capture<B: CaptureBackend>(
        &mut self,
        backend: &B,
        settings: &ExportSettings,
    ) -> Result<ExportOutcome> {
        self.exporter
            .export_client_capture(
                &self.timeline,
                &mut self.clock,
                &mut self.renderer,
                backend,
                settings,
            )
            .await
    }

    /// Server-render export through `backend`
    pub async fn export_server_render<B: RemoteRenderBackend>(
        &mut self,
        backend: &B,
        settings: &ExportSettings,
    ) -> Result<ExportOutcome> {
        self.exporter
            .export_server_render(&self.timeline, &self.clock, backend, settings)
            .await
    }
}
