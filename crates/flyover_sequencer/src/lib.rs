// SPDX-License-Identifier: MIT OR Apache-2.0
//! Camera path sequencing for Flyover.
//!
//! This crate turns a sparse set of camera keyframes into a continuous,
//! deterministic function of time and plays it back:
//! - Easing curves and angle-aware interpolation
//! - Keyframe timeline with pose sampling
//! - Frame-accurate playback clock
//! - Project document import/export
//!
//! ## Architecture
//!
//! Playback flows one way: [`PlaybackClock`] → [`Timeline::sample`] →
//! [`Viewport`]. Components publish typed events through [`Subject`].

pub mod document;
pub mod easing;
pub mod events;
pub mod keyframe;
pub mod playback;
pub mod timeline;
pub mod viewport;

pub use document::{DocumentError, KeyframeRecord, ProjectDocument};
pub use easing::{CubicBezier, Easing};
pub use events::{Subject, SubscriptionId};
pub use keyframe::{CameraPose, Keyframe, KeyframeId, KeyframeUpdate, DEFAULT_FOV};
pub use playback::{total_frames, ClockError, PlayState, PlaybackClock, PlaybackEvent};
pub use timeline::{Timeline, TimelineEvent};
pub use viewport::Viewport;
