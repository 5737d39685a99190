//! A small real-time 3D scene whose camera drifts toward the pointer.
//!
//! The crate keeps the simulation (scene graph, camera easing, the render
//! loop state machine) separate from the hosts that drive it, so the whole
//! loop runs headless in tests. Rendering goes through the [`Rasterizer`]
//! trait: [`Renderer`] draws with wgpu, [`HeadlessRasterizer`] only records
//! what it was asked to draw.

pub mod app;
pub mod camera;
pub mod config;
pub mod demo;
pub mod geometry;
pub mod input;
pub mod render;
pub mod render_loop;
pub mod scene;
pub mod stats;
pub mod text;
pub mod texture;
pub mod viewport;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use app::{DemoApp, TextStatus};
pub use camera::{Camera, Projection};
pub use config::DemoConfig;
pub use demo::{build_demo_scene, DemoScene};
pub use input::{PointerState, PointerTracker};
pub use render::{FrameError, HeadlessRasterizer, Rasterizer, Renderer};
pub use render_loop::{LoopParams, LoopState, RenderLoop, StopHandle, TickOutcome};
pub use scene::{ObjectId, Scene, SceneObject, Transform};
pub use stats::FrameStats;
pub use text::{load_text, FontSource, PendingText, TextLoadError, TextParams, TextRequest};
pub use viewport::{handle_resize, Viewport, ViewportProvider};
