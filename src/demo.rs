use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use anyhow::{Context, Result};
use glam::Vec3;
use log::debug;

use crate::config::DemoConfig;
use crate::geometry::{cuboid, icosphere, plane, polyline, wireframe};
use crate::scene::{hex_color, DirectionalLight, Material, ObjectId, Renderable, Scene, Transform};
use crate::texture::shadow_texture;

const CUBE_COLOR: u32 = 0xff0ddd;
const LINE_COLOR: u32 = 0x0ffddd;
const SPHERE_RADIUS: f32 = 200.0;
const SPHERE_DETAIL: u32 = 1;

/// The demo scene and handles to its objects.
#[derive(Debug, Clone)]
pub struct DemoScene {
    pub scene: Scene,
    /// The only object the render loop animates.
    pub cube: ObjectId,
    pub line: ObjectId,
    pub shadow: ObjectId,
    pub sphere: ObjectId,
    pub wireframe: ObjectId,
}

/// Builds the static part of the demo. The text arrives later, once its
/// font has loaded.
pub fn build_demo_scene(config: &DemoConfig) -> Result<DemoScene> {
    let mut scene = Scene::new();
    scene.background = Vec3::ZERO;
    scene.anchor = Vec3::ZERO;
    scene.lights.push(DirectionalLight {
        position: Vec3::new(0.0, 0.0, 1.0),
        target: Vec3::ZERO,
        color: Vec3::ONE,
        intensity: 3.0,
    });

    let cube = scene.add(
        "cube",
        Transform::IDENTITY,
        Some(Renderable::new(
            cuboid(1.0, 1.0, 1.0),
            Material::unlit(hex_color(CUBE_COLOR)),
        )),
    );

    let points = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(5.0, 0.0, 0.0),
        Vec3::new(5.0, 5.0, 0.0),
        Vec3::new(-5.0, 5.0, 0.0),
        Vec3::new(-5.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 0.0),
    ];
    let line = scene.add(
        "line",
        Transform::IDENTITY,
        Some(Renderable::new(
            polyline(&points),
            Material::unlit(hex_color(LINE_COLOR)),
        )),
    );

    let shadow_size = config.shadow_texture_size;
    let shadow = scene.add(
        "shadow",
        Transform::from_position(Vec3::new(0.0, -250.0, 0.0))
            .with_rotation(Vec3::new(-FRAC_PI_2, 0.0, 0.0)),
        Some(Renderable::new(
            plane(300.0, 300.0),
            Material::textured(Arc::new(shadow_texture(shadow_size))),
        )),
    );

    let sphere_mesh = Arc::new(icosphere(SPHERE_RADIUS, SPHERE_DETAIL));
    let edges = wireframe(&sphere_mesh);
    let sphere = scene.add(
        "sphere",
        Transform::from_position(Vec3::new(400.0, 0.0, 0.0)),
        Some(Renderable::new(
            sphere_mesh,
            Material::lit(Vec3::ONE, 0.0).with_vertex_colors(),
        )),
    );
    let wireframe = scene
        .add_child(
            sphere,
            "sphere-wireframe",
            Transform::IDENTITY,
            Some(Renderable::new(edges, Material::unlit(Vec3::ZERO))),
        )
        .context("sphere missing from demo scene")?;

    debug!(
        "demo scene built with {} objects, shadow texture {shadow_size}px",
        scene.len()
    );
    Ok(DemoScene {
        scene,
        cube,
        line,
        shadow,
        sphere,
        wireframe,
    })
}
