use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::Vec3;
use log::{error, info, warn};

use crate::camera::Camera;
use crate::config::DemoConfig;
use crate::input::PointerState;
use crate::render::{FrameError, Rasterizer};
use crate::scene::{ObjectId, Scene};
use crate::stats::FrameStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

/// Cancellation token handed out by [`RenderLoop::start`].
///
/// Triggering it from an event handler stops the loop at the top of the
/// next tick.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Per-tick constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopParams {
    /// Radians added to the x and y rotation of every animated object.
    pub rotation_step: f32,
    /// Fraction of the remaining distance the camera covers per tick.
    pub easing: f32,
}

impl Default for LoopParams {
    fn default() -> Self {
        Self {
            rotation_step: 0.02,
            easing: 0.05,
        }
    }
}

impl From<&DemoConfig> for LoopParams {
    fn from(config: &DemoConfig) -> Self {
        Self {
            rotation_step: config.rotation_step,
            easing: config.camera_easing,
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    /// The rasterizer failed recoverably; state advanced but nothing was
    /// presented.
    Skipped(FrameError),
    /// The loop is stopped. No state was touched and the host should not
    /// schedule another tick.
    Halted,
}

/// Drives the per-frame simulation: spin the animated objects, ease the
/// camera toward the pointer, re-aim it and hand the frame to a rasterizer.
#[derive(Debug)]
pub struct RenderLoop {
    state: LoopState,
    cancel: StopHandle,
    params: LoopParams,
    animated: Vec<ObjectId>,
    ticks: u64,
    skipped: u64,
}

impl RenderLoop {
    pub fn new(params: LoopParams, animated: Vec<ObjectId>) -> Self {
        Self {
            state: LoopState::Stopped,
            cancel: StopHandle::default(),
            params,
            animated,
            ticks: 0,
            skipped: 0,
        }
    }

    /// Enters `Running` and returns a fresh cancellation token.
    ///
    /// Tokens from earlier runs no longer affect the loop.
    pub fn start(&mut self) -> StopHandle {
        if self.state == LoopState::Running && !self.cancel.is_stop_requested() {
            return self.cancel.clone();
        }
        self.cancel = StopHandle::default();
        self.state = LoopState::Running;
        info!("render loop started");
        self.cancel.clone()
    }

    pub fn stop(&mut self) {
        if self.state == LoopState::Running {
            info!("render loop stopped after {} ticks", self.ticks);
        }
        self.cancel.stop();
        self.state = LoopState::Stopped;
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn params(&self) -> LoopParams {
        self.params
    }

    pub fn animated(&self) -> &[ObjectId] {
        &self.animated
    }

    /// Ticks that advanced the simulation, rendered or skipped.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Advances the simulation by one tick without rendering.
    ///
    /// Rotation angles grow without bound and are never wrapped into
    /// `[0, 2π)`; after very long runs `f32` precision makes the spin
    /// visibly uneven.
    pub fn advance(&self, scene: &mut Scene, camera: &mut Camera, pointer: PointerState) {
        let step = self.params.rotation_step;
        for id in &self.animated {
            if let Some(transform) = scene.transform_mut(*id) {
                transform.rotation.x += step;
                transform.rotation.y += step;
            }
        }

        let target = Vec3::new(pointer.offset_x, -pointer.offset_y, camera.position.z);
        camera.position = ease_toward(camera.position, target, self.params.easing);
        camera.look_at(scene.anchor);
    }

    /// Runs one full tick.
    ///
    /// Returns `Err` only for fatal rasterizer failures, after stopping the
    /// loop.
    pub fn tick<R: Rasterizer + ?Sized>(
        &mut self,
        scene: &mut Scene,
        camera: &mut Camera,
        pointer: PointerState,
        rasterizer: &mut R,
        stats: &mut FrameStats,
        now_ms: f64,
    ) -> Result<TickOutcome, FrameError> {
        if self.cancel.is_stop_requested() {
            self.stop();
        }
        if self.state == LoopState::Stopped {
            return Ok(TickOutcome::Halted);
        }

        self.advance(scene, camera, pointer);
        self.ticks += 1;
        camera.update_projection_matrix();

        let outcome = match rasterizer.render(scene, camera) {
            Ok(()) => TickOutcome::Rendered,
            Err(err) if err.is_fatal() => {
                error!("stopping render loop: {err}");
                self.stop();
                return Err(err);
            }
            Err(err) => {
                warn!("skipping frame {}: {err}", self.ticks);
                self.skipped += 1;
                TickOutcome::Skipped(err)
            }
        };
        stats.record(now_ms);
        Ok(outcome)
    }
}

/// Moves `current` a fraction `alpha` of the way toward `target` on x and y.
/// z is left alone.
pub fn ease_toward(current: Vec3, target: Vec3, alpha: f32) -> Vec3 {
    Vec3::new(
        current.x + (target.x - current.x) * alpha,
        current.y + (target.y - current.y) * alpha,
        current.z,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Projection;
    use crate::render::HeadlessRasterizer;
    use crate::scene::Transform;

    struct Fixture {
        scene: Scene,
        camera: Camera,
        cube: ObjectId,
        rasterizer: HeadlessRasterizer,
        stats: FrameStats,
        render_loop: RenderLoop,
    }

    fn fixture() -> Fixture {
        let mut scene = Scene::new();
        let cube = scene.add("cube", Transform::IDENTITY, None);
        scene.add("line", Transform::IDENTITY, None);
        let camera = Camera::new(
            Vec3::new(0.0, 0.0, 10.0),
            Projection {
                fov_y: 40.0,
                aspect: 16.0 / 9.0,
                near: 1.0,
                far: 1000.0,
            },
        );
        Fixture {
            scene,
            camera,
            cube,
            rasterizer: HeadlessRasterizer::new(1280, 720),
            stats: FrameStats::new(),
            render_loop: RenderLoop::new(LoopParams::default(), vec![cube]),
        }
    }

    impl Fixture {
        fn tick(&mut self, pointer: PointerState) -> Result<TickOutcome, FrameError> {
            self.render_loop.tick(
                &mut self.scene,
                &mut self.camera,
                pointer,
                &mut self.rasterizer,
                &mut self.stats,
                0.0,
            )
        }
    }

    #[test]
    fn rotation_accumulates_without_wrapping() {
        let mut f = fixture();
        f.render_loop.start();
        for _ in 0..500 {
            assert_eq!(f.tick(PointerState::default()), Ok(TickOutcome::Rendered));
        }
        let rotation = f.scene.transform(f.cube).unwrap().rotation;
        assert!((rotation.x - 10.0).abs() < 1e-3, "x = {}", rotation.x);
        assert!((rotation.y - 10.0).abs() < 1e-3, "y = {}", rotation.y);
        assert_eq!(rotation.z, 0.0);
        assert!(rotation.x > std::f32::consts::TAU);
        let line = f.scene.find("line").unwrap();
        assert_eq!(line.transform.rotation, Vec3::ZERO);
    }

    #[test]
    fn camera_converges_geometrically() {
        let mut f = fixture();
        f.render_loop.start();
        let pointer = PointerState {
            offset_x: 4.0,
            offset_y: 2.0,
        };
        let alpha = LoopParams::default().easing;
        let mut previous = f.camera.position;
        for n in 1..=100 {
            f.tick(pointer).unwrap();
            let position = f.camera.position;
            let bound_x = 4.0 * (1.0 - alpha).powi(n);
            let bound_y = 2.0 * (1.0 - alpha).powi(n);
            assert!((position.x - 4.0).abs() <= bound_x + 1e-4);
            assert!((position.y + 2.0).abs() <= bound_y + 1e-4);
            assert!((position.x - 4.0).abs() <= (previous.x - 4.0).abs());
            assert!(position.y <= previous.y);
            assert_eq!(position.z, 10.0);
            previous = position;
        }
    }

    #[test]
    fn view_is_aimed_at_the_anchor_every_tick() {
        let mut f = fixture();
        f.render_loop.start();
        let pointer = PointerState {
            offset_x: -30.0,
            offset_y: 12.0,
        };
        for _ in 0..20 {
            f.tick(pointer).unwrap();
            let to_anchor = (f.scene.anchor - f.camera.position).normalize();
            assert!(f.camera.forward().abs_diff_eq(to_anchor, 1e-4));
        }
    }

    #[test]
    fn stopped_loop_leaves_state_untouched() {
        let mut f = fixture();
        assert_eq!(f.render_loop.state(), LoopState::Stopped);
        let pointer = PointerState {
            offset_x: 10.0,
            offset_y: 10.0,
        };
        assert_eq!(f.tick(pointer), Ok(TickOutcome::Halted));

        let handle = f.render_loop.start();
        f.tick(pointer).unwrap();
        let camera = f.camera.clone();
        let rotation = f.scene.transform(f.cube).unwrap().rotation;

        handle.stop();
        assert_eq!(f.tick(pointer), Ok(TickOutcome::Halted));
        assert_eq!(f.render_loop.state(), LoopState::Stopped);
        assert_eq!(f.camera, camera);
        assert_eq!(f.scene.transform(f.cube).unwrap().rotation, rotation);
        assert_eq!(f.rasterizer.frames(), 1);
    }

    #[test]
    fn restart_ignores_stale_handles() {
        let mut f = fixture();
        let old = f.render_loop.start();
        f.render_loop.stop();
        assert!(old.is_stop_requested());
        let fresh = f.render_loop.start();
        assert!(!fresh.is_stop_requested());
        assert_eq!(f.tick(PointerState::default()), Ok(TickOutcome::Rendered));
    }

    #[test]
    fn start_after_external_stop_hands_out_a_live_token() {
        let mut f = fixture();
        let first = f.render_loop.start();
        first.stop();

        let second = f.render_loop.start();
        assert!(!second.is_stop_requested());
        assert_eq!(f.tick(PointerState::default()), Ok(TickOutcome::Rendered));
        assert_eq!(f.render_loop.state(), LoopState::Running);
        assert_eq!(f.rasterizer.frames(), 1);
    }

    #[test]
    fn recoverable_failure_skips_one_frame() {
        let mut f = fixture();
        f.render_loop.start();
        f.rasterizer.fail_next(FrameError::SurfaceLost);
        assert_eq!(
            f.tick(PointerState::default()),
            Ok(TickOutcome::Skipped(FrameError::SurfaceLost))
        );
        assert!(f.render_loop.is_running());
        assert_eq!(f.tick(PointerState::default()), Ok(TickOutcome::Rendered));
        assert_eq!(f.render_loop.skipped(), 1);
        assert_eq!(f.render_loop.ticks(), 2);
    }

    #[test]
    fn fatal_failure_stops_the_loop() {
        let mut f = fixture();
        f.render_loop.start();
        f.rasterizer.fail_next(FrameError::OutOfMemory);
        assert_eq!(f.tick(PointerState::default()), Err(FrameError::OutOfMemory));
        assert_eq!(f.render_loop.state(), LoopState::Stopped);
        assert_eq!(f.tick(PointerState::default()), Ok(TickOutcome::Halted));
    }

    #[test]
    fn ticks_leave_projection_alone_without_resize() {
        let mut f = fixture();
        f.render_loop.start();
        let before = f.camera.projection_matrix();
        for _ in 0..10 {
            f.tick(PointerState::default()).unwrap();
        }
        assert_eq!(f.camera.aspect(), 16.0 / 9.0);
        assert_eq!(f.camera.projection_matrix(), before);
        assert_eq!(f.rasterizer.size(), (1280, 720));
    }

    #[test]
    fn dirty_projection_is_refreshed_before_submission() {
        let mut f = fixture();
        f.render_loop.start();
        f.camera.set_aspect(2.0);
        f.tick(PointerState::default()).unwrap();
        assert!(!f.camera.is_projection_dirty());
        let frame = f.rasterizer.last_frame().unwrap();
        assert_eq!(frame.aspect, 2.0);
        assert_eq!(frame.view_proj, f.camera.view_proj());
    }
}
