// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ordered keyframe collection and pose sampling.

use crate::easing::{lerp, lerp_angle_degrees};
use crate::events::{Subject, SubscriptionId};
use crate::keyframe::{CameraPose, Keyframe, KeyframeId, KeyframeUpdate};

/// Notification emitted by a [`Timeline`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEvent {
    /// Follows every mutation of the keyframe set
    Changed,
    /// A keyframe was inserted
    Added(KeyframeId),
    /// A keyframe was deleted
    Removed(KeyframeId),
    /// A keyframe's time, pose or easing was edited
    Updated(KeyframeId),
    /// All keyframes were dropped
    Cleared,
    /// The selection moved
    SelectionChanged(Option<KeyframeId>),
}

/// Camera path: keyframes sorted by time.
///
/// Sorting is stable, so keyframes sharing a time keep the order in which they
/// reached that time (insertion order for adds, previous position for edits).
#[derive(Default)]
pub struct Timeline {
    keyframes: Vec<Keyframe>,
    selected: Option<KeyframeId>,
    events: Subject<TimelineEvent>,
}

impl Timeline {
    /// Create an empty timeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a timeline from keyframes without emitting events
    pub fn from_keyframes(keyframes: impl IntoIterator<Item = Keyframe>) -> Self {
        let mut timeline = Self::new();
        timeline.keyframes.extend(keyframes);
        timeline.clamp_times();
        timeline.sort_keyframes();
        timeline
    }

    /// Register a listener for timeline events
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&TimelineEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    /// Remove a listener
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Add a keyframe; negative times are clamped to zero
    pub fn add(&mut self, mut keyframe: Keyframe) -> KeyframeId {
        keyframe.time = keyframe.time.max(0.0);
        let id = keyframe.id;
        tracing::debug!(time = keyframe.time, "Adding keyframe {:?}", id);
        self.keyframes.push(keyframe);
        self.sort_keyframes();
        self.events.emit(&TimelineEvent::Added(id));
        self.events.emit(&TimelineEvent::Changed);
        id
    }

    /// Remove a keyframe, clearing the selection if it pointed there
    pub fn remove(&mut self, id: KeyframeId) -> Option<Keyframe> {
        let index = self.index_of(id)?;
        let removed = self.keyframes.remove(index);
        tracing::debug!(time = removed.time, "Removed keyframe {:?}", id);

        if self.selected == Some(id) {
            self.selected = None;
            self.events.emit(&TimelineEvent::SelectionChanged(None));
        }
        self.events.emit(&TimelineEvent::Removed(id));
        self.events.emit(&TimelineEvent::Changed);
        Some(removed)
    }

    /// Apply a partial edit. Returns false if the keyframe does not exist.
    pub fn update(&mut self, id: KeyframeId, update: KeyframeUpdate) -> bool {
        let Some(keyframe) = self.keyframes.iter_mut().find(|k| k.id == id) else {
            return false;
        };
        update.apply_to(keyframe);
        self.sort_keyframes();
        self.events.emit(&TimelineEvent::Updated(id));
        self.events.emit(&TimelineEvent::Changed);
        true
    }

    /// Select a keyframe, or clear the selection with `None`.
    ///
    /// Unknown ids clear the selection.
    pub fn select(&mut self, id: Option<KeyframeId>) {
        let id = id.filter(|id| self.index_of(*id).is_some());
        if self.selected != id {
            self.selected = id;
            self.events.emit(&TimelineEvent::SelectionChanged(id));
        }
    }

    /// Currently selected keyframe
    pub fn selected(&self) -> Option<&Keyframe> {
        self.selected.and_then(|id| self.get(id))
    }

    /// Drop every keyframe
    pub fn clear(&mut self) {
        self.keyframes.clear();
        if self.selected.take().is_some() {
            self.events.emit(&TimelineEvent::SelectionChanged(None));
        }
        self.events.emit(&TimelineEvent::Cleared);
        self.events.emit(&TimelineEvent::Changed);
    }

    /// Replace every keyframe in one step
    pub fn replace_all(&mut self, keyframes: Vec<Keyframe>) {
        self.clear();
        self.keyframes = keyframes;
        self.clamp_times();
        self.sort_keyframes();
        self.events.emit(&TimelineEvent::Changed);
    }

    /// Copy of the keyframes in time order
    pub fn all(&self) -> Vec<Keyframe> {
        self.keyframes.clone()
    }

    /// Borrow the keyframes in time order
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Get keyframe by ID
    pub fn get(&self, id: KeyframeId) -> Option<&Keyframe> {
        self.keyframes.iter().find(|k| k.id == id)
    }

    /// First keyframe within `tolerance` seconds of `time`
    pub fn keyframe_at(&self, time: f64, tolerance: f64) -> Option<&Keyframe> {
        self.keyframes.iter().find(|k| (k.time - time).abs() <= tolerance)
    }

    /// Get keyframe count
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    /// True when there are no keyframes
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Time of the last keyframe, zero when empty
    pub fn end_time(&self) -> f64 {
        self.keyframes.last().map_or(0.0, |k| k.time)
    }

    /// Evaluate the camera pose at `time`.
    ///
    /// Outside the keyframe range the nearest end keyframe is held. Between
    /// two keyframes every field is blended with the easing of the earlier
    /// one; orientation angles take the shortest arc.
    pub fn sample(&self, time: f64) -> CameraPose {
        let before = self.keyframes.iter().rposition(|k| k.time <= time);
        let after = self.keyframes.iter().position(|k| k.time >= time);

        let (b, a) = match (before, after) {
            (None, None) => return CameraPose::DEFAULT,
            (None, Some(i)) | (Some(i), None) => return self.keyframes[i].pose,
            (Some(b), Some(a)) if b == a => return self.keyframes[b].pose,
            (Some(b), Some(a)) => (&self.keyframes[b], &self.keyframes[a]),
        };

        let span = a.time - b.time;
        let u = if span == 0.0 { 0.0 } else { (time - b.time) / span };
        let easing = b.easing;
        let (from, to) = (&b.pose, &a.pose);

        CameraPose {
            latitude: lerp(from.latitude, to.latitude, u, easing),
            longitude: lerp(from.longitude, to.longitude, u, easing),
            height: lerp(from.height, to.height, u, easing),
            heading: lerp_angle_degrees(from.heading, to.heading, u, easing),
            pitch: lerp_angle_degrees(from.pitch, to.pitch, u, easing),
            roll: lerp_angle_degrees(from.roll, to.roll, u, easing),
            fov: lerp(from.fov, to.fov, u, easing),
        }
    }

    fn index_of(&self, id: KeyframeId) -> Option<usize> {
        self.keyframes.iter().position(|k| k.id == id)
    }

    fn clamp_times(&mut self) {
        for keyframe in &mut self.keyframes {
            keyframe.time = keyframe.time.max(0.0);
        }
    }

    /// Stable sort by time
    fn sort_keyframes(&mut self) {
        self.keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
    }
}

impl std::fmt::Debug for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeline")
            .field("keyframes", &self.keyframes)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}
