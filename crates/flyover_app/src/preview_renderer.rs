// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless stand-in for the globe renderer.
//!
//! Draws a sky/ground schematic of the camera pose into an RGBA buffer and
//! encodes it as PNG, so previews and client-capture exports run without a
//! GPU. The horizon follows pitch and roll, the ground tint follows the
//! position and the sky darkens with height.

use flyover_export::{CaptureError, FrameRenderer};
use flyover_sequencer::{CameraPose, Viewport};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
use std::io::Cursor;

/// Height at which the sky reaches its darkest shade
const SPACE_HEIGHT: f64 = 100_000.0;

/// CPU renderer producing PNG frames
#[derive(Debug, Clone)]
pub struct PreviewRenderer {
    width: u32,
    height: u32,
    pose: CameraPose,
    interactive: bool,
    frames_rendered: u64,
}

impl PreviewRenderer {
    /// Create a renderer with a `width` x `height` surface
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            pose: CameraPose::DEFAULT,
            interactive: true,
            frames_rendered: 0,
        }
    }

    /// Pose the next frame will show
    pub fn pose(&self) -> &CameraPose {
        &self.pose
    }

    /// Whether user camera control is currently allowed
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Frames captured so far
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Draw the current pose
    pub fn draw(&self) -> ImageBuffer<Rgba<u8>, Vec<u8>> {
        let pose = &self.pose;
        let (w, h) = (f64::from(self.width), f64::from(self.height));

        // Screen-space horizon: pitch moves it vertically, roll tilts it
        let half_fov = (pose.fov.clamp(1.0, 179.0) / 2.0).to_radians();
        let offset = (pose.pitch.to_radians().tan() / half_fov.tan()).clamp(-4.0, 4.0);
        let horizon_y = h / 2.0 * (1.0 + offset);
        let slope = pose.roll.to_radians().tan().clamp(-8.0, 8.0);

        let altitude = (pose.height / SPACE_HEIGHT).clamp(0.0, 1.0);
        let sky_top = shade([90, 150, 230], 1.0 - 0.85 * altitude);
        let sky_bottom = shade([190, 215, 245], 1.0 - 0.6 * altitude);
        let ground = ground_color(pose.latitude, pose.longitude);

        ImageBuffer::from_fn(self.width, self.height, |x, y| {
            let (px, py) = (f64::from(x), f64::from(y));
            let horizon = horizon_y + (px - w / 2.0) * slope;
            if py < horizon {
                let t = (py / horizon.max(1.0)).clamp(0.0, 1.0);
                opaque(mix(sky_top, sky_bottom, t))
            } else {
                let depth = ((py - horizon) / (h - horizon).max(1.0)).clamp(0.0, 1.0);
                opaque(shade(ground, 0.7 + 0.3 * depth))
            }
        })
    }

    /// Draw the current pose and encode it as PNG
    pub fn encode_png(&self) -> Result<Vec<u8>, CaptureError> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(self.draw())
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| CaptureError(e.to_string()))?;
        Ok(bytes)
    }
}

fn ground_color(latitude: f64, longitude: f64) -> [u8; 3] {
    let lat = (latitude.abs() / 90.0).clamp(0.0, 1.0);
    let lon = (longitude.rem_euclid(360.0)) / 360.0;
    // greener towards the equator, whiter towards the poles
    let base = mix([60, 130, 70], [235, 240, 245], lat * lat);
    shade(base, 0.85 + 0.3 * (lon - 0.5).abs())
}

fn mix(a: [u8; 3], b: [u8; 3], t: f64) -> [u8; 3] {
    let channel = |i: usize| (f64::from(a[i]) * (1.0 - t) + f64::from(b[i]) * t).round() as u8;
    [channel(0), channel(1), channel(2)]
}

fn shade(color: [u8; 3], factor: f64) -> [u8; 3] {
    color.map(|v| (f64::from(v) * factor).clamp(0.0, 255.0).round() as u8)
}

fn opaque([r, g, b]: [u8; 3]) -> Rgba<u8> {
    Rgba([r, g, b, 255])
}

impl Viewport for PreviewRenderer {
    fn set_pose(&mut self, pose: &CameraPose) {
        self.pose = CameraPose {
            fov: self.pose.fov,
            ..*pose
        };
    }

    fn set_field_of_view(&mut self, degrees: f64) {
        self.pose.fov = degrees;
    }

    fn enable_interactive_control(&mut self, enabled: bool) {
        self.interactive = enabled;
    }
}

impl FrameRenderer for PreviewRenderer {
    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    async fn render_and_capture(&mut self) -> Result<Vec<u8>, CaptureError> {
        let png = self.encode_png()?;
        self.frames_rendered += 1;
        tracing::trace!(frame = self.frames_rendered, bytes = png.len(), "Rendered preview frame");
        Ok(png)
    }
}
