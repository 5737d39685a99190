use std::f32::consts::FRAC_PI_2;

use glam::{Vec2, Vec3};

use super::triangulate::{triangulate, Shape};
use super::TextParams;
use crate::geometry::{apply_flat_normals, Mesh, Topology, Vertex};

/// Longest miter allowed at sharp corners, as a multiple of the offset.
const MITER_LIMIT: f32 = 4.0;

/// Cross-section of the extrusion: the contour pushed outward by `expand`
/// at depth `z`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Ring {
    z: f32,
    expand: f32,
}

/// Extrudes flat shapes along +Z into a closed, flat-shaded triangle mesh.
///
/// With bevels enabled the solid spans `-bevel_thickness` to
/// `depth + bevel_thickness`, and the walls bulge out by `bevel_size`
/// between the two caps.
pub fn extrude(shapes: &[Shape], params: &TextParams) -> Mesh {
    let rings = rings(params);
    let (Some(back), Some(front)) = (rings.first().copied(), rings.last().copied()) else {
        return empty();
    };

    let mut vertices = Vec::new();
    for shape in shapes {
        let triangles = triangulate(shape);
        for [a, b, c] in &triangles {
            // back face looks down -Z, so its winding flips
            push_triangle(&mut vertices, [*a, *c, *b], back.z);
            push_triangle(&mut vertices, [*a, *b, *c], front.z);
        }
        for contour in shape.contours() {
            extrude_walls(&mut vertices, contour, &rings);
        }
    }
    apply_flat_normals(&mut vertices);

    let indices = (0..vertices.len() as u32).collect();
    Mesh {
        vertices,
        indices,
        topology: Topology::Triangles,
    }
}

fn empty() -> Mesh {
    Mesh {
        vertices: Vec::new(),
        indices: Vec::new(),
        topology: Topology::Triangles,
    }
}

fn rings(params: &TextParams) -> Vec<Ring> {
    let depth = params.depth.max(0.0);
    if !params.bevel_enabled || params.bevel_segments == 0 {
        return vec![
            Ring { z: 0.0, expand: 0.0 },
            Ring {
                z: depth,
                expand: 0.0,
            },
        ];
    }

    let segments = params.bevel_segments;
    let thickness = params.bevel_thickness;
    let size = params.bevel_size;
    let profile = |step: u32| {
        let angle = step as f32 / segments as f32 * FRAC_PI_2;
        (thickness * angle.cos(), size * angle.sin())
    };

    let back = (0..=segments).map(|step| {
        let (dz, expand) = profile(step);
        Ring { z: -dz, expand }
    });
    let front = (0..=segments).rev().map(|step| {
        let (dz, expand) = profile(step);
        Ring {
            z: depth + dz,
            expand,
        }
    });
    back.chain(front).collect()
}

fn push_triangle(vertices: &mut Vec<Vertex>, points: [Vec2; 3], z: f32) {
    for point in points {
        vertices.push(Vertex::new(point.extend(z), Vec3::ZERO, point));
    }
}

fn extrude_walls(vertices: &mut Vec<Vertex>, contour: &[Vec2], rings: &[Ring]) {
    let n = contour.len();
    if n < 2 {
        return;
    }
    let offsets = miter_offsets(contour);
    let at = |index: usize, ring: Ring| -> Vec3 {
        (contour[index] + offsets[index] * ring.expand).extend(ring.z)
    };

    for pair in rings.windows(2) {
        let (near, far) = (pair[0], pair[1]);
        for i in 0..n {
            let j = (i + 1) % n;
            let a0 = at(i, near);
            let b0 = at(j, near);
            let a1 = at(i, far);
            let b1 = at(j, far);
            let u = i as f32 / n as f32;
            for (position, v) in [
                (a0, near.z),
                (b0, near.z),
                (b1, far.z),
                (a0, near.z),
                (b1, far.z),
                (a1, far.z),
            ] {
                vertices.push(Vertex::new(position, Vec3::ZERO, Vec2::new(u, v)));
            }
        }
    }
}

/// Per-vertex outward offset directions. Counter-clockwise outers and
/// clockwise holes both have their solid on the left, so the outward side
/// of every edge is its right-hand normal.
fn miter_offsets(contour: &[Vec2]) -> Vec<Vec2> {
    let n = contour.len();
    let edge_normal = |from: Vec2, to: Vec2| {
        let d = (to - from).normalize_or_zero();
        Vec2::new(d.y, -d.x)
    };
    (0..n)
        .map(|i| {
            let prev = contour[(i + n - 1) % n];
            let current = contour[i];
            let next = contour[(i + 1) % n];
            let n_in = edge_normal(prev, current);
            let n_out = edge_normal(current, next);
            let bisector = (n_in + n_out).normalize_or_zero();
            if bisector == Vec2::ZERO {
                return n_in;
            }
            let cos = bisector.dot(n_in);
            if cos <= 1.0 / MITER_LIMIT {
                bisector * MITER_LIMIT
            } else {
                bisector / cos
            }
        })
        .collect()
}
