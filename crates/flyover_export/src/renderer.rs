// SPDX-License-Identifier: MIT OR Apache-2.0
//! Renderer contract for frame capture.

use crate::error::CaptureError;
use flyover_sequencer::Viewport;
use std::future::Future;
use std::ops::{Deref, DerefMut};

/// A globe renderer that can resize its surface and capture frames
pub trait FrameRenderer: Viewport {
    /// Current render surface size in pixels
    fn surface_size(&self) -> (u32, u32);

    /// Resize the render surface
    fn resize(&mut self, width: u32, height: u32);

    /// Render the scene and return the frame as encoded image bytes.
    ///
    /// Must not resolve until the image reflects the most recently applied
    /// pose and field of view; a stale buffer is a contract violation.
    fn render_and_capture(
        &mut self,
    ) -> impl Future<Output = Result<Vec<u8>, CaptureError>> + Send;
}

/// Resizes the surface for the lifetime of the guard.
///
/// The original size comes back on drop, whichever way the export ends.
pub struct SurfaceGuard<'a, R: FrameRenderer> {
    renderer: &'a mut R,
    original: (u32, u32),
}

impl<'a, R: FrameRenderer> SurfaceGuard<'a, R> {
    /// Remember the current size and switch to `width` x `height`
    pub fn resize(renderer: &'a mut R, width: u32, height: u32) -> Self {
        let original = renderer.surface_size();
        renderer.resize(width, height);
        tracing::debug!(?original, width, height, "Resized render surface for export");
        Self { renderer, original }
    }

    /// Size that will be restored
    pub fn original_size(&self) -> (u32, u32) {
        self.original
    }
}

impl<R: FrameRenderer> Deref for SurfaceGuard<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.renderer
    }
}

impl<R: FrameRenderer> DerefMut for SurfaceGuard<'_, R> {
    fn deref_mut(&mut self) -> &mut R {
        self.renderer
    }
}

impl<R: FrameRenderer> Drop for SurfaceGuard<'_, R> {
    fn drop(&mut self) {
        let (width, height) = self.original;
        self.renderer.resize(width, height);
        tracing::debug!(width, height, "Restored render surface");
    }
}
