use anyhow::Result;
use log::{info, warn};

use crate::camera::Camera;
use crate::config::DemoConfig;
use crate::demo::{build_demo_scene, DemoScene};
use crate::input::PointerTracker;
use crate::render::{FrameError, Rasterizer};
use crate::render_loop::{LoopParams, LoopState, RenderLoop, StopHandle, TickOutcome};
use crate::scene::{Material, ObjectId, Renderable, Scene, Transform};
use crate::stats::FrameStats;
use crate::text::{PendingText, TextLoadError};
use crate::viewport::{handle_resize, Viewport};

/// Where the 3D text is in its lifecycle.
#[derive(Debug)]
pub enum TextStatus {
    /// No load was requested.
    Idle,
    Pending,
    Ready(ObjectId),
    Failed(TextLoadError),
}

impl TextStatus {
    pub fn describe(&self) -> String {
        match self {
            Self::Idle => "text not requested".to_string(),
            Self::Pending => "text still loading".to_string(),
            Self::Ready(id) => format!("text ready as object {id}"),
            Self::Failed(err) => format!("text unavailable: {err}"),
        }
    }
}

/// The whole demo: scene, camera, input and loop state plus the rasterizer
/// frames are submitted to. Hosts forward their events here.
pub struct DemoApp<R: Rasterizer> {
    config: DemoConfig,
    demo: DemoScene,
    camera: Camera,
    viewport: Viewport,
    pointer: PointerTracker,
    render_loop: RenderLoop,
    stats: FrameStats,
    rasterizer: R,
    pending_text: Option<PendingText>,
    text_status: TextStatus,
}

impl<R: Rasterizer> DemoApp<R> {
    pub fn new(config: DemoConfig, rasterizer: R, width: u32, height: u32) -> Result<Self> {
        config.validate()?;
        let demo = build_demo_scene(&config)?;
        let viewport = Viewport::new(width.max(1), height.max(1));
        let mut camera = Camera::new(
            config.camera.position,
            config.camera.projection(viewport.aspect()),
        );
        camera.look_at(demo.scene.anchor);
        let render_loop = RenderLoop::new(LoopParams::from(&config), vec![demo.cube]);
        Ok(Self {
            pointer: PointerTracker::new(config.pointer_sensitivity),
            config,
            demo,
            camera,
            viewport,
            render_loop,
            stats: FrameStats::new(),
            rasterizer,
            pending_text: None,
            text_status: TextStatus::Idle,
        })
    }

    /// Attaches a text load; its result is picked up by [`DemoApp::frame`].
    pub fn request_text(&mut self, pending: PendingText) {
        self.pending_text = Some(pending);
        self.text_status = TextStatus::Pending;
        self.poll_text();
    }

    pub fn on_pointer_move(&mut self, x: f32, y: f32) {
        self.pointer.on_pointer_move(x, y, &self.viewport);
    }

    pub fn on_resize(&mut self, width: u32, height: u32) -> bool {
        handle_resize(
            &mut self.viewport,
            &mut self.camera,
            &mut self.rasterizer,
            width,
            height,
        )
    }

    pub fn start(&mut self) -> StopHandle {
        self.render_loop.start()
    }

    pub fn stop(&mut self) {
        self.render_loop.stop();
    }

    pub fn is_running(&self) -> bool {
        self.render_loop.is_running()
    }

    pub fn state(&self) -> LoopState {
        self.render_loop.state()
    }

    /// One display-refresh callback: pick up finished text, then tick.
    pub fn frame(&mut self, now_ms: f64) -> Result<TickOutcome, FrameError> {
        self.poll_text();
        self.render_loop.tick(
            &mut self.demo.scene,
            &mut self.camera,
            self.pointer.state(),
            &mut self.rasterizer,
            &mut self.stats,
            now_ms,
        )
    }

    fn poll_text(&mut self) {
        let Some(result) = self.pending_text.as_ref().and_then(PendingText::take) else {
            return;
        };
        self.pending_text = None;
        self.text_status = match result {
            Ok(mesh) => {
                let text = &self.config.text;
                let id = self.demo.scene.add(
                    "text",
                    Transform::from_position(text.position),
                    Some(Renderable::new(mesh, Material::unlit(text.color))),
                );
                info!("text {:?} added to the scene", text.content);
                TextStatus::Ready(id)
            }
            Err(err) => {
                warn!("continuing without text: {err}");
                TextStatus::Failed(err)
            }
        };
    }

    pub fn scene(&self) -> &Scene {
        &self.demo.scene
    }

    pub fn demo(&self) -> &DemoScene {
        &self.demo
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn pointer(&self) -> &PointerTracker {
        &self.pointer
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    pub fn rasterizer_mut(&mut self) -> &mut R {
        &mut self.rasterizer
    }

    pub fn config(&self) -> &DemoConfig {
        &self.config
    }

    pub fn text_status(&self) -> &TextStatus {
        &self.text_status
    }
}
