use std::collections::HashSet;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Interleaved vertex layout shared by every mesh the renderer uploads.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            color: [1.0; 3],
            uv: uv.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

/// How the index buffer of a [`Mesh`] is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    /// Index pairs, one segment each.
    Lines,
}

/// CPU-side geometry ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => self.indices.len() / 3,
            Topology::Lines => 0,
        }
    }

    pub fn segment_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => 0,
            Topology::Lines => self.indices.len() / 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Axis aligned box centered on the origin.
pub fn cuboid(width: f32, height: f32, depth: f32) -> Mesh {
    let half = Vec3::new(width, height, depth) * 0.5;
    // (normal, u axis, v axis) per face
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u_axis, v_axis) in faces {
        let base = vertices.len() as u32;
        for (u, v) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = (normal + u_axis * u + v_axis * v) * half;
            let uv = Vec2::new((u + 1.0) * 0.5, (1.0 - v) * 0.5);
            vertices.push(Vertex::new(position, normal, uv));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Mesh {
        vertices,
        indices,
        topology: Topology::Triangles,
    }
}

/// Connected line strip through `points`, emitted as a segment list.
pub fn polyline(points: &[Vec3]) -> Mesh {
    let vertices = points
        .iter()
        .map(|point| Vertex::new(*point, Vec3::Z, Vec2::ZERO))
        .collect();
    let indices = (1..points.len() as u32)
        .flat_map(|i| [i - 1, i])
        .collect();
    Mesh {
        vertices,
        indices,
        topology: Topology::Lines,
    }
}

/// Rectangle in the XY plane facing +Z.
pub fn plane(width: f32, height: f32) -> Mesh {
    let hw = width * 0.5;
    let hh = height * 0.5;
    let corners = [
        (Vec3::new(-hw, hh, 0.0), Vec2::new(0.0, 0.0)),
        (Vec3::new(hw, hh, 0.0), Vec2::new(1.0, 0.0)),
        (Vec3::new(-hw, -hh, 0.0), Vec2::new(0.0, 1.0)),
        (Vec3::new(hw, -hh, 0.0), Vec2::new(1.0, 1.0)),
    ];
    let vertices = corners
        .iter()
        .map(|(position, uv)| Vertex::new(*position, Vec3::Z, *uv))
        .collect();
    Mesh {
        vertices,
        indices: vec![0, 2, 1, 2, 3, 1],
        topology: Topology::Triangles,
    }
}

const ICOSAHEDRON_INDICES: [usize; 60] = [
    0, 11, 5, 0, 5, 1, 0, 1, 7, 0, 7, 10, 0, 10, 11, 1, 5, 9, 5, 11, 4, 11, 10, 2, 10, 7, 6, 7,
    1, 8, 3, 9, 4, 3, 4, 2, 3, 2, 6, 3, 6, 8, 3, 8, 9, 4, 9, 5, 2, 4, 11, 6, 2, 10, 8, 6, 7, 9,
    8, 1,
];

fn icosahedron_corners() -> [Vec3; 12] {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    [
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ]
}

/// Faceted sphere: an icosahedron whose faces are split `detail` times and
/// pushed out to `radius`.
///
/// Every triangle owns its three vertices so normals stay flat. Vertex colors
/// run through the hue circle from the bottom of the sphere to the top.
pub fn icosphere(radius: f32, detail: u32) -> Mesh {
    let corners = icosahedron_corners();
    let mut positions = Vec::new();
    for face in ICOSAHEDRON_INDICES.chunks_exact(3) {
        subdivide_face(
            corners[face[0]],
            corners[face[1]],
            corners[face[2]],
            detail,
            &mut positions,
        );
    }

    let mut vertices: Vec<Vertex> = positions
        .iter()
        .map(|position| {
            let position = position.normalize() * radius;
            let mut vertex = Vertex::new(position, Vec3::ZERO, spherical_uv(position));
            let hue = (position.y / radius + 1.0) * 0.5;
            vertex.color = hsl_to_rgb(hue, 1.0, 0.5).to_array();
            vertex
        })
        .collect();
    apply_flat_normals(&mut vertices);

    let indices = (0..vertices.len() as u32).collect();
    Mesh {
        vertices,
        indices,
        topology: Topology::Triangles,
    }
}

fn subdivide_face(a: Vec3, b: Vec3, c: Vec3, detail: u32, out: &mut Vec<Vec3>) {
    let cols = detail + 1;
    let mut grid: Vec<Vec<Vec3>> = Vec::with_capacity(cols as usize + 1);
    for i in 0..=cols {
        let t = i as f32 / cols as f32;
        let aj = a.lerp(c, t);
        let bj = b.lerp(c, t);
        let rows = cols - i;
        let row = (0..=rows)
            .map(|j| {
                if rows == 0 {
                    aj
                } else {
                    aj.lerp(bj, j as f32 / rows as f32)
                }
            })
            .collect();
        grid.push(row);
    }

    for i in 0..cols as usize {
        let strip = 2 * (cols as usize - i) - 1;
        for j in 0..strip {
            let k = j / 2;
            if j % 2 == 0 {
                out.extend_from_slice(&[grid[i][k + 1], grid[i + 1][k], grid[i][k]]);
            } else {
                out.extend_from_slice(&[grid[i][k + 1], grid[i + 1][k + 1], grid[i + 1][k]]);
            }
        }
    }
}

fn spherical_uv(position: Vec3) -> Vec2 {
    let direction = position.normalize_or_zero();
    let u = direction.z.atan2(-direction.x) / std::f32::consts::TAU + 0.5;
    let v = direction.y.clamp(-1.0, 1.0).asin() / std::f32::consts::PI + 0.5;
    Vec2::new(u, v)
}

/// Converts HSL (all components in `0..=1`) to linear RGB components.
pub fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> Vec3 {
    let hue = hue.rem_euclid(1.0);
    if saturation <= 0.0 {
        return Vec3::splat(lightness);
    }
    let q = if lightness <= 0.5 {
        lightness * (1.0 + saturation)
    } else {
        lightness + saturation - lightness * saturation
    };
    let p = 2.0 * lightness - q;
    Vec3::new(
        hue_channel(p, q, hue + 1.0 / 3.0),
        hue_channel(p, q, hue),
        hue_channel(p, q, hue - 1.0 / 3.0),
    )
}

fn hue_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

/// Sets every vertex normal of a non-indexed triangle list to its face normal.
pub fn apply_flat_normals(vertices: &mut [Vertex]) {
    for triangle in vertices.chunks_exact_mut(3) {
        let p0 = triangle[0].position();
        let p1 = triangle[1].position();
        let p2 = triangle[2].position();
        let normal = (p1 - p0).cross(p2 - p0).normalize_or_zero();
        for vertex in triangle.iter_mut() {
            vertex.normal = normal.to_array();
        }
    }
}

/// Extracts the unique edges of a triangle mesh as a line mesh.
///
/// Vertices are welded by position first so that shared edges of a
/// non-indexed mesh are only emitted once.
pub fn wireframe(mesh: &Mesh) -> Mesh {
    let mut welded: Vec<Vec3> = Vec::new();
    let mut remap = Vec::with_capacity(mesh.vertices.len());
    for vertex in &mesh.vertices {
        let position = vertex.position();
        let index = welded
            .iter()
            .position(|existing| existing.distance_squared(position) <= WELD_EPSILON)
            .unwrap_or_else(|| {
                welded.push(position);
                welded.len() - 1
            });
        remap.push(index as u32);
    }

    let mut seen = HashSet::new();
    let mut indices = Vec::new();
    if mesh.topology == Topology::Triangles {
        for triangle in mesh.indices.chunks_exact(3) {
            for (a, b) in [
                (triangle[0], triangle[1]),
                (triangle[1], triangle[2]),
                (triangle[2], triangle[0]),
            ] {
                let a = remap[a as usize];
                let b = remap[b as usize];
                if a == b {
                    continue;
                }
                if seen.insert((a.min(b), a.max(b))) {
                    indices.extend_from_slice(&[a, b]);
                }
            }
        }
    }

    let vertices = welded
        .into_iter()
        .map(|position| Vertex::new(position, position.normalize_or_zero(), Vec2::ZERO))
        .collect();
    Mesh {
        vertices,
        indices,
        topology: Topology::Lines,
    }
}

const WELD_EPSILON: f32 = 1e-6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_has_six_quads() {
        let mesh = cuboid(1.0, 1.0, 1.0);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        for vertex in &mesh.vertices {
            let p = vertex.position();
            assert!((p.abs().max_element() - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn polyline_connects_consecutive_points() {
        let mesh = polyline(&[Vec3::ZERO, Vec3::X, Vec3::Y]);
        assert_eq!(mesh.topology, Topology::Lines);
        assert_eq!(mesh.indices, vec![0, 1, 1, 2]);
    }

    #[test]
    fn icosphere_detail_one_has_eighty_faces_on_the_sphere() {
        let mesh = icosphere(200.0, 1);
        assert_eq!(mesh.triangle_count(), 80);
        for vertex in &mesh.vertices {
            assert!((vertex.position().length() - 200.0).abs() < 1e-2);
            assert!((Vec3::from_array(vertex.normal).length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn icosphere_normals_point_outward() {
        let mesh = icosphere(1.0, 1);
        for triangle in mesh.vertices.chunks_exact(3) {
            let centroid =
                (triangle[0].position() + triangle[1].position() + triangle[2].position()) / 3.0;
            assert!(Vec3::from_array(triangle[0].normal).dot(centroid) > 0.0);
        }
    }

    #[test]
    fn wireframe_of_icosphere_follows_euler() {
        let sphere = icosphere(1.0, 1);
        let lines = wireframe(&sphere);
        // V - E + F = 2 for a closed polyhedron
        let v = lines.vertices.len() as i64;
        let e = lines.segment_count() as i64;
        let f = sphere.triangle_count() as i64;
        assert_eq!(v - e + f, 2);
        assert_eq!(e, 120);
    }

    #[test]
    fn hsl_primary_colors() {
        assert!(hsl_to_rgb(0.0, 1.0, 0.5).abs_diff_eq(Vec3::X, 1e-6));
        assert!(hsl_to_rgb(1.0 / 3.0, 1.0, 0.5).abs_diff_eq(Vec3::Y, 1e-6));
        assert!(hsl_to_rgb(0.5, 0.0, 0.25).abs_diff_eq(Vec3::splat(0.25), 1e-6));
    }
}
