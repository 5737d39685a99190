mod gpu;
mod headless;
mod shared;

use thiserror::Error;

use crate::camera::Camera;
use crate::scene::Scene;

pub use gpu::Renderer;
pub use headless::{FrameSummary, HeadlessRasterizer};

/// Anything that can turn a scene seen through a camera into pixels.
pub trait Rasterizer {
    /// Resizes the output surface.
    fn resize(&mut self, width: u32, height: u32);

    /// Draws one full frame.
    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), FrameError>;
}

impl<R: Rasterizer + ?Sized> Rasterizer for Box<R> {
    fn resize(&mut self, width: u32, height: u32) {
        (**self).resize(width, height)
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), FrameError> {
        (**self).render(scene, camera)
    }
}

/// Failure to produce a single frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("output surface was lost")]
    SurfaceLost,
    #[error("output surface is outdated")]
    SurfaceOutdated,
    #[error("timed out waiting for the next surface texture")]
    Timeout,
    #[error("GPU is out of memory")]
    OutOfMemory,
    #[error("render backend error: {0}")]
    Backend(String),
}

impl FrameError {
    /// Fatal errors stop the render loop; everything else skips one frame.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OutOfMemory)
    }
}

impl From<wgpu::SurfaceError> for FrameError {
    fn from(err: wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::Lost => Self::SurfaceLost,
            wgpu::SurfaceError::Outdated => Self::SurfaceOutdated,
            wgpu::SurfaceError::Timeout => Self::Timeout,
            wgpu::SurfaceError::OutOfMemory => Self::OutOfMemory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_out_of_memory_is_fatal() {
        assert!(FrameError::OutOfMemory.is_fatal());
        assert!(!FrameError::SurfaceLost.is_fatal());
        assert!(!FrameError::Timeout.is_fatal());
        assert!(!FrameError::Backend("device hiccup".into()).is_fatal());
    }

    #[test]
    fn surface_errors_map_one_to_one() {
        assert_eq!(
            FrameError::from(wgpu::SurfaceError::Outdated),
            FrameError::SurfaceOutdated
        );
        assert_eq!(
            FrameError::from(wgpu::SurfaceError::OutOfMemory),
            FrameError::OutOfMemory
        );
    }
}
