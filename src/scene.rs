use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::geometry::Mesh;
use crate::texture::Texture;

/// Stable handle to an object stored in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position, Euler rotation (radians, applied X then Y then Z) and scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn matrix(&self) -> Mat4 {
        let rotation = Mat4::from_rotation_x(self.rotation.x)
            * Mat4::from_rotation_y(self.rotation.y)
            * Mat4::from_rotation_z(self.rotation.z);
        Mat4::from_translation(self.position) * rotation * Mat4::from_scale(self.scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shading {
    /// Flat color, unaffected by lights.
    Unlit,
    /// Diffuse + specular response to the scene lights.
    Lit { shininess: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub color: Vec4,
    pub shading: Shading,
    pub vertex_colors: bool,
    pub texture: Option<Arc<Texture>>,
}

impl Material {
    pub fn unlit(color: Vec3) -> Self {
        Self {
            color: color.extend(1.0),
            shading: Shading::Unlit,
            vertex_colors: false,
            texture: None,
        }
    }

    pub fn lit(color: Vec3, shininess: f32) -> Self {
        Self {
            shading: Shading::Lit { shininess },
            ..Self::unlit(color)
        }
    }

    pub fn textured(texture: Arc<Texture>) -> Self {
        Self {
            texture: Some(texture),
            ..Self::unlit(Vec3::ONE)
        }
    }

    pub fn with_vertex_colors(mut self) -> Self {
        self.vertex_colors = true;
        self
    }
}

/// Geometry plus the material used to draw it.
#[derive(Debug, Clone, PartialEq)]
pub struct Renderable {
    pub mesh: Arc<Mesh>,
    pub material: Material,
}

impl Renderable {
    pub fn new(mesh: impl Into<Arc<Mesh>>, material: Material) -> Self {
        Self {
            mesh: mesh.into(),
            material,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub id: ObjectId,
    pub name: String,
    pub transform: Transform,
    pub parent: Option<ObjectId>,
    pub renderable: Option<Renderable>,
}

/// Directional light shining from `position` toward `target`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    pub position: Vec3,
    pub target: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl DirectionalLight {
    /// Unit vector pointing from the lit surface toward the light.
    pub fn direction(&self) -> Vec3 {
        (self.position - self.target).normalize_or_zero()
    }
}

/// Resolved draw entry for one renderable object.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'a> {
    pub id: ObjectId,
    pub world: Mat4,
    pub renderable: &'a Renderable,
}

/// Scene graph: objects with optional parents, lights and a background.
///
/// Parents are always inserted before their children, so resolving world
/// matrices is a single forward pass.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Fixed point the camera is aimed at every frame.
    pub anchor: Vec3,
    pub background: Vec3,
    pub lights: Vec<DirectionalLight>,
    objects: Vec<SceneObject>,
    next_id: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        renderable: Option<Renderable>,
    ) -> ObjectId {
        self.insert(name.into(), transform, None, renderable)
    }

    /// Adds an object whose transform is relative to `parent`.
    ///
    /// Returns `None` when `parent` is not part of this scene.
    pub fn add_child(
        &mut self,
        parent: ObjectId,
        name: impl Into<String>,
        transform: Transform,
        renderable: Option<Renderable>,
    ) -> Option<ObjectId> {
        self.get(parent)?;
        Some(self.insert(name.into(), transform, Some(parent), renderable))
    }

    fn insert(
        &mut self,
        name: String,
        transform: Transform,
        parent: Option<ObjectId>,
        renderable: Option<Renderable>,
    ) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.push(SceneObject {
            id,
            name,
            transform,
            parent,
            renderable,
        });
        id
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    pub fn find(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.name == name)
    }

    pub fn transform(&self, id: ObjectId) -> Option<&Transform> {
        self.get(id).map(|object| &object.transform)
    }

    pub fn transform_mut(&mut self, id: ObjectId) -> Option<&mut Transform> {
        self.objects
            .iter_mut()
            .find(|object| object.id == id)
            .map(|object| &mut object.transform)
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// World matrix of every object, parents composed in.
    pub fn world_matrices(&self) -> HashMap<ObjectId, Mat4> {
        let mut worlds = HashMap::with_capacity(self.objects.len());
        for object in &self.objects {
            let local = object.transform.matrix();
            let world = object
                .parent
                .and_then(|parent| worlds.get(&parent))
                .map(|parent_world: &Mat4| *parent_world * local)
                .unwrap_or(local);
            worlds.insert(object.id, world);
        }
        worlds
    }

    /// Renderable objects with their resolved world matrices, in insertion
    /// order.
    pub fn draw_list(&self) -> Vec<DrawItem<'_>> {
        let worlds = self.world_matrices();
        self.objects
            .iter()
            .filter_map(|object| {
                let renderable = object.renderable.as_ref()?;
                Some(DrawItem {
                    id: object.id,
                    world: worlds.get(&object.id).copied().unwrap_or(Mat4::IDENTITY),
                    renderable,
                })
            })
            .collect()
    }
}

/// Converts a `0xRRGGBB` literal into unit RGB components.
pub fn hex_color(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry;

    #[test]
    fn ids_are_unique_and_lookup_works() {
        let mut scene = Scene::new();
        let a = scene.add("a", Transform::IDENTITY, None);
        let b = scene.add("b", Transform::IDENTITY, None);
        assert_ne!(a, b);
        assert_eq!(scene.get(b).map(|o| o.name.as_str()), Some("b"));
        assert_eq!(scene.find("a").map(|o| o.id), Some(a));
    }

    #[test]
    fn child_inherits_parent_transform() {
        let mut scene = Scene::new();
        let parent = scene.add(
            "parent",
            Transform::from_position(Vec3::new(400.0, 0.0, 0.0)),
            None,
        );
        let child = scene
            .add_child(
                parent,
                "child",
                Transform::from_position(Vec3::Y),
                Some(Renderable::new(
                    geometry::cuboid(1.0, 1.0, 1.0),
                    Material::unlit(Vec3::ONE),
                )),
            )
            .unwrap();
        let worlds = scene.world_matrices();
        let origin = worlds[&child].transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(400.0, 1.0, 0.0), 1e-4));
        assert_eq!(scene.draw_list().len(), 1);
    }

    #[test]
    fn add_child_rejects_unknown_parent() {
        let mut other = Scene::new();
        let foreign = other.add("x", Transform::IDENTITY, None);
        let mut scene = Scene::new();
        assert!(scene
            .add_child(foreign, "child", Transform::IDENTITY, None)
            .is_none());
        assert!(scene.is_empty());
    }

    #[test]
    fn rotation_applies_x_then_y() {
        let transform = Transform::IDENTITY.with_rotation(Vec3::new(
            -std::f32::consts::FRAC_PI_2,
            0.0,
            0.0,
        ));
        // plane normal +Z turns to face +Y
        let normal = transform.matrix().transform_vector3(Vec3::Z);
        assert!(normal.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn hex_color_unpacks_channels() {
        assert_eq!(hex_color(0xff0000), Vec3::X);
        assert!(hex_color(0x0ffddd).abs_diff_eq(Vec3::new(15.0, 253.0, 221.0) / 255.0, 1e-6));
    }
}
