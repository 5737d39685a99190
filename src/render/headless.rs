use std::collections::VecDeque;
use std::fmt::Write as _;

use glam::{Mat4, Vec3};

use super::{FrameError, Rasterizer};
use crate::camera::Camera;
use crate::scene::Scene;

/// What a headless frame saw.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSummary {
    pub index: u64,
    pub camera_position: Vec3,
    pub view_proj: Mat4,
    pub aspect: f32,
    pub draw_calls: usize,
    pub surface: (u32, u32),
}

/// Rasterizer that draws nothing and records a summary of every frame.
///
/// Used for the headless CLI mode and for exercising the render loop without
/// a GPU. Failures can be scripted with [`HeadlessRasterizer::fail_next`].
#[derive(Debug)]
pub struct HeadlessRasterizer {
    size: (u32, u32),
    frames: u64,
    history: VecDeque<FrameSummary>,
    history_limit: usize,
    scripted_failures: VecDeque<FrameError>,
}

impl HeadlessRasterizer {
    const DEFAULT_HISTORY: usize = 64;

    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            frames: 0,
            history: VecDeque::new(),
            history_limit: Self::DEFAULT_HISTORY,
            scripted_failures: VecDeque::new(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Number of frames rendered successfully.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_frame(&self) -> Option<&FrameSummary> {
        self.history.back()
    }

    pub fn history(&self) -> impl Iterator<Item = &FrameSummary> {
        self.history.iter()
    }

    /// Makes the next `render` call fail with `error`.
    pub fn fail_next(&mut self, error: FrameError) {
        self.scripted_failures.push_back(error);
    }

    /// Human readable dump of a scene as this rasterizer would draw it.
    pub fn describe(scene: &Scene, camera: &Camera) -> String {
        let mut out = String::new();
        let p = camera.position;
        let _ = writeln!(
            out,
            "camera pos=({:.2}, {:.2}, {:.2}) aspect={:.3}",
            p.x,
            p.y,
            p.z,
            camera.aspect()
        );
        for object in scene.objects() {
            let t = &object.transform;
            let _ = writeln!(
                out,
                " - {} pos=({:.2}, {:.2}, {:.2}) rot=({:.2}, {:.2}, {:.2})",
                object.name,
                t.position.x,
                t.position.y,
                t.position.z,
                t.rotation.x,
                t.rotation.y,
                t.rotation.z
            );
        }
        out
    }
}

impl Rasterizer for HeadlessRasterizer {
    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.size = (width, height);
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), FrameError> {
        if let Some(error) = self.scripted_failures.pop_front() {
            return Err(error);
        }
        let summary = FrameSummary {
            index: self.frames,
            camera_position: camera.position,
            view_proj: camera.view_proj(),
            aspect: camera.aspect(),
            draw_calls: scene.draw_list().len(),
            surface: self.size,
        };
        self.frames += 1;
        if self.history.len() == self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(summary);
        Ok(())
    }
}
