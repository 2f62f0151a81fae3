// SPDX-License-Identifier: MIT OR Apache-2.0
//! Camera poses and the keyframes that pin them to the timeline.

use crate::easing::Easing;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Field of view used when a keyframe does not set one
pub const DEFAULT_FOV: f64 = 60.0;

/// Unique identifier for a keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyframeId(pub Uuid);

impl KeyframeId {
    /// Create a new random keyframe ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for KeyframeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Full camera state over the globe.
///
/// Heading, pitch and roll are unconstrained; they are treated as periodic
/// modulo 360 when interpolated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    /// Degrees north
    pub latitude: f64,
    /// Degrees east
    pub longitude: f64,
    /// Meters above the ellipsoid
    pub height: f64,
    /// Degrees clockwise from north
    pub heading: f64,
    /// Degrees, negative looks down
    pub pitch: f64,
    /// Degrees
    pub roll: f64,
    /// Vertical field of view in degrees
    pub fov: f64,
}

impl CameraPose {
    /// Pose returned when sampling an empty timeline: looking straight down
    /// at (0, 0) from 10 000 km.
    pub const DEFAULT: Self = Self {
        latitude: 0.0,
        longitude: 0.0,
        height: 10_000_000.0,
        heading: 0.0,
        pitch: -90.0,
        roll: 0.0,
        fov: DEFAULT_FOV,
    };

    /// Pose at a position with level orientation and the default field of view
    pub fn at(latitude: f64, longitude: f64, height: f64) -> Self {
        Self {
            latitude,
            longitude,
            height,
            heading: 0.0,
            pitch: 0.0,
            roll: 0.0,
            fov: DEFAULT_FOV,
        }
    }

    /// Set the orientation angles
    pub fn with_orientation(mut self, heading: f64, pitch: f64, roll: f64) -> Self {
        self.heading = heading;
        self.pitch = pitch;
        self.roll = roll;
        self
    }

    /// Set the field of view
    pub fn with_fov(mut self, fov: f64) -> Self {
        self.fov = fov;
        self
    }
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A timestamped camera pose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Unique keyframe ID
    pub id: KeyframeId,
    /// Time in seconds
    pub time: f64,
    /// Camera pose at this time
    pub pose: CameraPose,
    /// Easing for the segment that starts here
    pub easing: Easing,
}

impl Keyframe {
    /// Create a new keyframe with linear easing
    pub fn new(time: f64, pose: CameraPose) -> Self {
        Self {
            id: KeyframeId::new(),
            time,
            pose,
            easing: Easing::Linear,
        }
    }

    /// Set easing
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

/// Partial edit applied by [`Timeline::update`](crate::Timeline::update).
///
/// Unset fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KeyframeUpdate {
    /// New time
    pub time: Option<f64>,
    /// New latitude
    pub latitude: Option<f64>,
    /// New longitude
    pub longitude: Option<f64>,
    /// New height
    pub height: Option<f64>,
    /// New heading
    pub heading: Option<f64>,
    /// New pitch
    pub pitch: Option<f64>,
    /// New roll
    pub roll: Option<f64>,
    /// New field of view
    pub fov: Option<f64>,
    /// New easing
    pub easing: Option<Easing>,
}

impl KeyframeUpdate {
    /// Update that only moves the keyframe in time
    pub fn time(time: f64) -> Self {
        Self {
            time: Some(time),
            ..Self::default()
        }
    }

    /// Update that replaces the whole pose
    pub fn pose(pose: CameraPose) -> Self {
        Self {
            latitude: Some(pose.latitude),
            longitude: Some(pose.longitude),
            height: Some(pose.height),
            heading: Some(pose.heading),
            pitch: Some(pose.pitch),
            roll: Some(pose.roll),
            fov: Some(pose.fov),
            ..Self::default()
        }
    }

    /// Write the set fields into `keyframe`
    pub fn apply_to(&self, keyframe: &mut Keyframe) {
        let pose = &mut keyframe.pose;
        if let Some(time) = self.time {
            keyframe.time = time.max(0.0);
        }
        if let Some(v) = self.latitude {
            pose.latitude = v;
        }
        if let Some(v) = self.longitude {
            pose.longitude = v;
        }
        if let Some(v) = self.height {
            pose.height = v;
        }
        if let Some(v) = self.heading {
            pose.heading = v;
        }
        if let Some(v) = self.pitch {
            pose.pitch = v;
        }
        if let Some(v) = self.roll {
            pose.roll = v;
        }
        if let Some(v) = self.fov {
            pose.fov = v;
        }
        if let Some(easing) = self.easing {
            keyframe.easing = easing;
        }
    }
}
