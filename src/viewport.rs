use log::debug;

use crate::camera::Camera;
use crate::render::Rasterizer;

/// Provides the current output size in pixels.
pub trait ViewportProvider {
    fn viewport_size(&self) -> (u32, u32);

    /// Offset of `(x, y)` from the viewport center, in pixels.
    fn offset_from_center(&self, x: f32, y: f32) -> (f32, f32) {
        let (width, height) = self.viewport_size();
        (x - width as f32 / 2.0, y - height as f32 / 2.0)
    }
}

/// Size of the output surface, mirroring the host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    width: u32,
    height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

}

impl ViewportProvider for Viewport {
    fn viewport_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Applies a host resize notification to the viewport, the camera projection
/// and the rasterizer surface.
///
/// Zero-sized notifications (minimized windows) are ignored and reported by
/// returning `false`.
pub fn handle_resize(
    viewport: &mut Viewport,
    camera: &mut Camera,
    rasterizer: &mut dyn Rasterizer,
    width: u32,
    height: u32,
) -> bool {
    if width == 0 || height == 0 {
        debug!("ignoring zero-sized resize {width}x{height}");
        return false;
    }
    *viewport = Viewport::new(width, height);
    camera.set_aspect(width as f32 / height as f32);
    rasterizer.resize(width, height);
    debug!("viewport resized to {width}x{height}");
    true
}
