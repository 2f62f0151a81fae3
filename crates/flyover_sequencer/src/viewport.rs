// SPDX-License-Identifier: MIT OR Apache-2.0
//! Camera-facing side of the globe renderer.

use crate::keyframe::CameraPose;

/// What the playback clock needs from the renderer.
///
/// Implemented by the globe renderer integration; the sequencer only pushes
/// poses into it.
pub trait Viewport {
    /// Move the camera
    fn set_pose(&mut self, pose: &CameraPose);

    /// Change the vertical field of view in degrees
    fn set_field_of_view(&mut self, degrees: f64);

    /// Allow or block mouse/touch camera control
    fn enable_interactive_control(&mut self, enabled: bool);

    /// Push a full pose including its field of view
    fn apply_pose(&mut self, pose: &CameraPose) {
        self.set_pose(pose);
        self.set_field_of_view(pose.fov);
    }
}
