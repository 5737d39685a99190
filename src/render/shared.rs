use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};

use crate::camera::Camera;
use crate::scene::{DirectionalLight, Material, Shading};

pub(crate) const SHADER: &str = r#"
struct GlobalUniform {
    view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
    light_direction: vec4<f32>,
    light_color: vec4<f32>,
}

struct ObjectUniform {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
    color: vec4<f32>,
    // x: lit, y: vertex colors, z: textured, w: shininess
    flags: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: GlobalUniform;

@group(1) @binding(0)
var<uniform> object: ObjectUniform;

@group(2) @binding(0)
var base_texture: texture_2d<f32>;
@group(2) @binding(1)
var base_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec3<f32>,
    @location(3) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec3<f32>,
    @location(3) uv: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_position = object.model * vec4<f32>(input.position, 1.0);
    out.position = globals.view_proj * world_position;
    out.world_pos = world_position.xyz;

    let world_normal = mat3x3<f32>(
        object.normal[0].xyz,
        object.normal[1].xyz,
        object.normal[2].xyz
    ) * input.normal;

    out.normal = world_normal;
    out.color = input.color;
    out.uv = input.uv;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    var base = object.color;
    if object.flags.y > 0.5 {
        base = vec4<f32>(base.rgb * input.color, base.a);
    }
    // sample unconditionally; uniform control flow is required for sampling
    let texel = textureSample(base_texture, base_sampler, input.uv);
    if object.flags.z > 0.5 {
        base = base * texel;
    }
    if object.flags.x < 0.5 {
        return base;
    }

    let normal = normalize(input.normal);
    let light_dir = normalize(globals.light_direction.xyz);
    let diffuse = max(dot(normal, light_dir), 0.0);
    let view_dir = normalize(globals.camera_position.xyz - input.world_pos);
    let half_dir = normalize(light_dir + view_dir);
    // shininess 0 turns highlights off
    let specular_strength = select(0.0, 0.2, object.flags.w > 0.0);
    let specular = pow(max(dot(normal, half_dir), 0.0), max(object.flags.w, 1.0)) * specular_strength;
    let ambient = 0.15;
    let intensity = globals.light_color.w;
    let light_color = globals.light_color.xyz;
    let lit_color = (ambient + diffuse * intensity) * base.rgb * light_color
        + specular * intensity * light_color;
    return vec4<f32>(lit_color, base.a);
}
"#;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(crate) struct GlobalUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub light_direction: [f32; 4],
    pub light_color: [f32; 4],
}

impl GlobalUniform {
    /// Packs the camera and the first light. Without a light the scene is
    /// drawn with ambient light only.
    pub fn new(camera: &Camera, light: Option<&DirectionalLight>) -> Self {
        let (direction, color) = match light {
            Some(light) => (light.direction(), light.color.extend(light.intensity)),
            None => (Vec3::Z, Vec3::ONE.extend(0.0)),
        };
        Self {
            view_proj: camera.view_proj().to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).into(),
            light_direction: direction.extend(0.0).into(),
            light_color: color.into(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(crate) struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
    pub color: [f32; 4],
    pub flags: [f32; 4],
}

impl ObjectUniform {
    pub fn new(world: Mat4, material: &Material) -> Self {
        let normal = Mat3::from_mat4(world).inverse().transpose();
        let (lit, shininess) = match material.shading {
            Shading::Unlit => (0.0, 0.0),
            Shading::Lit { shininess } => (1.0, shininess),
        };
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        Self {
            model: world.to_cols_array_2d(),
            normal: mat3_to_3x4(normal),
            color: material.color.into(),
            flags: [
                lit,
                flag(material.vertex_colors),
                flag(material.texture.is_some()),
                shininess,
            ],
        }
    }
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Projection;
    use glam::Vec4;

    #[test]
    fn uniform_sizes_match_the_shader_layout() {
        assert_eq!(std::mem::size_of::<GlobalUniform>(), 112);
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 144);
    }

    #[test]
    fn material_flags_are_packed() {
        let material = Material::lit(Vec3::ONE, 30.0).with_vertex_colors();
        let uniform = ObjectUniform::new(Mat4::IDENTITY, &material);
        assert_eq!(uniform.flags, [1.0, 1.0, 0.0, 30.0]);

        let unlit = ObjectUniform::new(Mat4::IDENTITY, &Material::unlit(Vec3::new(1.0, 1.0, 0.0)));
        assert_eq!(unlit.flags, [0.0, 0.0, 0.0, 0.0]);
        assert_eq!(Vec4::from(unlit.color), Vec4::new(1.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn light_direction_points_at_the_light() {
        let camera = Camera::new(
            Vec3::new(0.0, 0.0, 10.0),
            Projection {
                fov_y: 40.0,
                aspect: 1.0,
                near: 1.0,
                far: 1000.0,
            },
        );
        let light = DirectionalLight {
            position: Vec3::new(0.0, 0.0, 1.0),
            target: Vec3::ZERO,
            color: Vec3::ONE,
            intensity: 3.0,
        };
        let uniform = GlobalUniform::new(&camera, Some(&light));
        assert_eq!(uniform.light_direction, [0.0, 0.0, 1.0, 0.0]);
        assert_eq!(uniform.light_color, [1.0, 1.0, 1.0, 3.0]);
        assert_eq!(uniform.camera_position, [0.0, 0.0, 10.0, 1.0]);
    }
}
