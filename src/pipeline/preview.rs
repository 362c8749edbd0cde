// SPDX-License-Identifier: GPL-3.0-only

//! Preview surface geometry
//!
//! Keeps a preview surface sized to its host view and rotated to match the
//! device. Hosts call [`PreviewGeometryController::on_layout`] whenever the
//! view is laid out and [`PreviewGeometryController::on_orientation_changed`]
//! for each sensor reading.

use super::orientation::{OrientationCell, OrientationReading, VideoOrientation};
use crate::backends::camera::Resolution;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Axis-aligned rectangle in view coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// How video content is scaled into the preview bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoGravity {
    /// Fit inside the bounds keeping aspect ratio (letterbox)
    ResizeAspect,
    /// Fill the bounds keeping aspect ratio, cropping the overflow
    #[default]
    ResizeAspectFill,
    /// Stretch to the bounds
    Resize,
}

impl VideoGravity {
    /// Where `content` lands when scaled into `bounds`
    ///
    /// With [`VideoGravity::ResizeAspectFill`] the result can extend past
    /// `bounds`; the overflow is what gets cropped.
    pub fn content_rect(&self, content: Resolution, bounds: Rect) -> Rect {
        if bounds.is_empty() || content.width == 0 || content.height == 0 {
            return Rect::new(bounds.x, bounds.y, 0.0, 0.0);
        }

        let content_aspect = content.width as f32 / content.height as f32;
        let bounds_aspect = bounds.width / bounds.height;

        let (width, height) = match self {
            VideoGravity::Resize => return bounds,
            VideoGravity::ResizeAspect => {
                if content_aspect > bounds_aspect {
                    // Content is wider - fit to width
                    (bounds.width, bounds.width / content_aspect)
                } else {
                    (bounds.height * content_aspect, bounds.height)
                }
            }
            VideoGravity::ResizeAspectFill => {
                if content_aspect > bounds_aspect {
                    // Content is wider - fill height, crop sides
                    (bounds.height * content_aspect, bounds.height)
                } else {
                    (bounds.width, bounds.width / content_aspect)
                }
            }
        };

        Rect::new(
            bounds.x + (bounds.width - width) / 2.0,
            bounds.y + (bounds.height - height) / 2.0,
            width,
            height,
        )
    }
}

/// On-screen layer showing the live feed
pub trait PreviewSurface {
    fn set_frame(&mut self, frame: Rect);

    fn set_gravity(&mut self, gravity: VideoGravity);

    /// Whether the surface's connection accepts orientation changes
    fn supports_video_orientation(&self) -> bool;

    fn set_video_orientation(&mut self, orientation: VideoOrientation);
}

/// Drives a [`PreviewSurface`] from layout and orientation events
#[derive(Debug)]
pub struct PreviewGeometryController<S: PreviewSurface> {
    surface: S,
    orientation: OrientationCell,
    gravity: VideoGravity,
    bounds: Rect,
}

impl<S: PreviewSurface> PreviewGeometryController<S> {
    pub fn new(mut surface: S, orientation: OrientationCell, gravity: VideoGravity) -> Self {
        surface.set_gravity(gravity);
        Self {
            surface,
            orientation,
            gravity,
            bounds: Rect::default(),
        }
    }

    /// Host view was laid out with new bounds
    pub fn on_layout(&mut self, bounds: Rect) {
        trace!(?bounds, "Preview layout");
        self.bounds = bounds;
        self.update();
    }

    /// Device orientation sensor reported `reading`
    ///
    /// Updates the shared orientation cell, which also retags frames on
    /// their way to the analyzer.
    pub fn on_orientation_changed(&mut self, reading: OrientationReading) {
        let orientation = self.orientation.apply(reading);
        debug!(?reading, %orientation, "Device orientation changed");
        self.update();
    }

    fn update(&mut self) {
        self.surface.set_frame(self.bounds);
        if self.surface.supports_video_orientation() {
            self.surface.set_video_orientation(self.orientation.load());
        }
    }

    /// Screen area covered by video of `frame_size` in the current orientation
    ///
    /// Portrait orientations show landscape sensor frames rotated, so the
    /// dimensions are swapped before fitting.
    pub fn video_rect(&self, frame_size: Resolution) -> Rect {
        let displayed = if self.orientation.load().is_landscape() == frame_size.is_landscape() {
            frame_size
        } else {
            Resolution::new(frame_size.height, frame_size.width)
        };
        self.gravity.content_rect(displayed, self.bounds)
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn gravity(&self) -> VideoGravity {
        self.gravity
    }

    pub fn orientation(&self) -> VideoOrientation {
        self.orientation.load()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HD: Resolution = Resolution::new(1280, 720);

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 0.01,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn aspect_letterboxes_wide_content() {
        let rect = VideoGravity::ResizeAspect.content_rect(HD, Rect::new(0.0, 0.0, 400.0, 400.0));
        assert_close(rect.width, 400.0);
        assert_close(rect.height, 225.0);
        assert_close(rect.y, 87.5);
    }

    #[test]
    fn aspect_fill_crops_wide_content() {
        let rect =
            VideoGravity::ResizeAspectFill.content_rect(HD, Rect::new(10.0, 0.0, 360.0, 720.0));
        assert_close(rect.height, 720.0);
        assert_close(rect.width, 1280.0);
        assert_close(rect.x, -450.0);
    }

    #[test]
    fn resize_stretches() {
        let bounds = Rect::new(0.0, 0.0, 300.0, 500.0);
        assert_eq!(VideoGravity::Resize.content_rect(HD, bounds), bounds);
    }

    #[test]
    fn empty_bounds_give_empty_rect() {
        let rect = VideoGravity::ResizeAspectFill.content_rect(HD, Rect::default());
        assert!(rect.is_empty());
    }
}
