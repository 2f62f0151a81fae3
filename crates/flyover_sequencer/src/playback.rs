// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback clock.
//!
//! The clock owns the current time and the play/pause/loop state. The host
//! calls [`PlaybackClock::tick`] from its frame loop; while playing, each tick
//! that covers at least one frame interval advances time by exactly one frame
//! and carries the leftover wall time into the next tick, so reported time
//! moves in whole frames no matter how irregular the render cadence is.

use crate::events::{Subject, SubscriptionId};
use crate::timeline::Timeline;
use crate::viewport::Viewport;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Slack when comparing the advanced time against the duration
const END_EPSILON: f64 = 1e-9;

/// Invalid clock configuration
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ClockError {
    /// Frame rate must be positive and finite
    #[error("invalid frame rate: {0}")]
    InvalidFps(f64),
    /// Duration must be positive and finite
    #[error("invalid duration: {0}")]
    InvalidDuration(f64),
}

/// Notification emitted by a [`PlaybackClock`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    /// Playback started
    Play,
    /// Playback paused
    Pause,
    /// Playback stopped and rewound
    Stop,
    /// Current time changed (seconds)
    TimeUpdate(f64),
    /// Frame index after a tick
    FrameUpdate(u64),
    /// Reached the end without looping
    Finished,
}

/// Play state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    /// Not advancing
    #[default]
    Paused,
    /// Advancing on every tick
    Playing,
}

/// Frame-accurate playback clock
#[derive(Debug)]
pub struct PlaybackClock {
    current_time: f64,
    duration: f64,
    fps: f64,
    state: PlayState,
    looping: bool,
    /// Wall time the last frame was accounted to
    last_tick: Option<Instant>,
    events: Subject<PlaybackEvent>,
}

impl PlaybackClock {
    /// Create a paused clock at time zero
    pub fn new(duration: f64, fps: f64) -> Result<Self, ClockError> {
        validate_duration(duration)?;
        validate_fps(fps)?;
        Ok(Self {
            current_time: 0.0,
            duration,
            fps,
            state: PlayState::Paused,
            looping: false,
            last_tick: None,
            events: Subject::new(),
        })
    }

    /// Register a listener for playback events
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&PlaybackEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    /// Remove a listener
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Start playing from the current position.
    ///
    /// Returns false if already playing.
    pub fn play(&mut self, now: Instant, viewport: &mut impl Viewport) -> bool {
        if self.is_playing() {
            return false;
        }
        self.state = PlayState::Playing;
        self.last_tick = Some(now);
        viewport.enable_interactive_control(false);
        tracing::info!(time = self.current_time, "Playback started");
        self.events.emit(&PlaybackEvent::Play);
        true
    }

    /// Pause playback. Returns false if not playing.
    pub fn pause(&mut self, viewport: &mut impl Viewport) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.halt(viewport);
        tracing::info!(time = self.current_time, "Playback paused");
        self.events.emit(&PlaybackEvent::Pause);
        true
    }

    /// Toggle play/pause
    pub fn toggle(&mut self, now: Instant, viewport: &mut impl Viewport) -> bool {
        if self.is_playing() {
            self.pause(viewport)
        } else {
            self.play(now, viewport)
        }
    }

    /// Pause and rewind to the start
    pub fn stop(&mut self, timeline: &Timeline, viewport: &mut impl Viewport) {
        self.pause(viewport);
        self.seek(0.0, timeline, viewport);
        tracing::info!("Playback stopped");
        self.events.emit(&PlaybackEvent::Stop);
    }

    /// Jump to `time`, clamped to the clip, and show the pose there
    pub fn seek(&mut self, time: f64, timeline: &Timeline, viewport: &mut impl Viewport) {
        let time = if time.is_nan() { 0.0 } else { time };
        self.current_time = time.clamp(0.0, self.duration);
        viewport.apply_pose(&timeline.sample(self.current_time));
        self.events.emit(&PlaybackEvent::TimeUpdate(self.current_time));
    }

    /// Seek one frame later
    pub fn step_forward(&mut self, timeline: &Timeline, viewport: &mut impl Viewport) {
        self.seek(self.current_time + 1.0 / self.fps, timeline, viewport);
    }

    /// Seek one frame earlier
    pub fn step_backward(&mut self, timeline: &Timeline, viewport: &mut impl Viewport) {
        self.seek(self.current_time - 1.0 / self.fps, timeline, viewport);
    }

    /// Advance the clock from the host frame loop.
    ///
    /// Returns true when the tick advanced time.
    pub fn tick(
        &mut self,
        now: Instant,
        timeline: &Timeline,
        viewport: &mut impl Viewport,
    ) -> bool {
        if !self.is_playing() {
            return false;
        }
        let Some(last) = self.last_tick else {
            self.last_tick = Some(now);
            return false;
        };

        let interval = self.frame_interval();
        let elapsed = now.saturating_duration_since(last);
        if elapsed < interval {
            return false;
        }

        let remainder = elapsed.as_nanos() % interval.as_nanos().max(1);
        self.last_tick = Some(now - Duration::from_nanos(remainder as u64));

        self.current_time += 1.0 / self.fps;
        if self.current_time >= self.duration - END_EPSILON {
            if self.looping {
                tracing::debug!("Playback wrapped to start");
                self.current_time = 0.0;
            } else {
                self.current_time = self.duration;
                self.halt(viewport);
                viewport.apply_pose(&timeline.sample(self.current_time));
                tracing::info!(duration = self.duration, "Playback finished");
                self.events.emit(&PlaybackEvent::TimeUpdate(self.current_time));
                self.events.emit(&PlaybackEvent::Finished);
                return true;
            }
        }

        viewport.apply_pose(&timeline.sample(self.current_time));
        self.events.emit(&PlaybackEvent::TimeUpdate(self.current_time));
        self.events.emit(&PlaybackEvent::FrameUpdate(self.current_frame()));
        true
    }

    /// Change the frame rate without moving the playhead
    pub fn set_fps(&mut self, fps: f64) -> Result<(), ClockError> {
        validate_fps(fps)?;
        self.fps = fps;
        Ok(())
    }

    /// Change the clip length without resetting the playhead.
    ///
    /// The playhead is only pulled back when it would lie past the new end.
    pub fn set_duration(&mut self, duration: f64) -> Result<(), ClockError> {
        validate_duration(duration)?;
        self.duration = duration;
        self.current_time = self.current_time.min(duration);
        Ok(())
    }

    /// Enable or disable looping
    pub fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Current time in seconds
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Clip length in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Frames per second
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Whether playback wraps at the end
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Current play state
    pub fn state(&self) -> PlayState {
        self.state
    }

    /// True while playing
    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    /// Wall time of one frame
    pub fn frame_interval(&self) -> Duration {
        frame_interval(self.fps).unwrap_or(Duration::MAX)
    }

    /// Frame index of the current time
    pub fn current_frame(&self) -> u64 {
        (self.current_time * self.fps + END_EPSILON).floor() as u64
    }

    /// Frames needed to cover the whole clip
    pub fn total_frames(&self) -> u64 {
        total_frames(self.duration, self.fps)
    }

    fn halt(&mut self, viewport: &mut impl Viewport) {
        self.state = PlayState::Paused;
        self.last_tick = None;
        viewport.enable_interactive_control(true);
    }
}

/// `ceil(duration * fps)`, tolerant of float noise in the product
pub fn total_frames(duration: f64, fps: f64) -> u64 {
    (duration * fps - END_EPSILON).ceil().max(0.0) as u64
}

/// Wall time of one frame, `None` unless it is a non-zero `Duration`
fn frame_interval(fps: f64) -> Option<Duration> {
    if !(fps.is_finite() && fps > 0.0) {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / fps)
        .ok()
        .filter(|interval| !interval.is_zero())
}

/// Accept only frame rates whose frame interval is representable
pub(crate) fn validate_fps(fps: f64) -> Result<(), ClockError> {
    match frame_interval(fps) {
        Some(_) => Ok(()),
        None => Err(ClockError::InvalidFps(fps)),
    }
}

fn validate_duration(duration: f64) -> Result<(), ClockError> {
    if duration.is_finite() && duration > 0.0 {
        Ok(())
    } else {
        Err(ClockError::InvalidDuration(duration))
    }
}
