//! Ear-clipping triangulation for glyph outlines with holes.

use glam::Vec2;
use log::warn;

const EPSILON: f32 = 1e-9;

/// Filled region: one counter-clockwise outer contour and the clockwise
/// contours cut out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub outer: Vec<Vec2>,
    pub holes: Vec<Vec<Vec2>>,
}

impl Shape {
    pub fn contours(&self) -> impl Iterator<Item = &[Vec2]> {
        std::iter::once(self.outer.as_slice()).chain(self.holes.iter().map(Vec::as_slice))
    }
}

/// Shoelace area, positive for counter-clockwise contours.
pub fn signed_area(contour: &[Vec2]) -> f32 {
    let n = contour.len();
    (0..n)
        .map(|i| contour[i].perp_dot(contour[(i + 1) % n]))
        .sum::<f32>()
        * 0.5
}

pub fn point_in_polygon(point: Vec2, polygon: &[Vec2]) -> bool {
    let n = polygon.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[j];
        if (a.y > point.y) != (b.y > point.y) {
            let x = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Sorts raw contours into outer boundaries and holes.
///
/// The contour with the largest area decides which winding marks an outer
/// boundary; fonts disagree on this. Holes are attached to the smallest
/// outer contour that contains them. Output contours are normalized to
/// counter-clockwise outers and clockwise holes.
pub fn group_contours(contours: Vec<Vec<Vec2>>) -> Vec<Shape> {
    let Some(outer_sign) = contours
        .iter()
        .map(|c| signed_area(c))
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .map(f32::signum)
    else {
        return Vec::new();
    };

    let mut shapes: Vec<Shape> = Vec::new();
    let mut holes = Vec::new();
    for mut contour in contours {
        let area = signed_area(&contour);
        if area.abs() <= EPSILON {
            continue;
        }
        if area.signum() == outer_sign {
            if area < 0.0 {
                contour.reverse();
            }
            shapes.push(Shape {
                outer: contour,
                holes: Vec::new(),
            });
        } else {
            if area > 0.0 {
                contour.reverse();
            }
            holes.push(contour);
        }
    }

    for hole in holes {
        let probe = hole[0];
        let owner = shapes
            .iter_mut()
            .filter(|shape| point_in_polygon(probe, &shape.outer))
            .min_by(|a, b| signed_area(&a.outer).total_cmp(&signed_area(&b.outer)));
        match owner {
            Some(shape) => shape.holes.push(hole),
            None => {
                // stray hole with no enclosing boundary: draw it filled
                let mut outer = hole;
                outer.reverse();
                shapes.push(Shape {
                    outer,
                    holes: Vec::new(),
                });
            }
        }
    }
    shapes
}

/// Triangulates a shape, returning triangles as point triples in
/// counter-clockwise order.
pub fn triangulate(shape: &Shape) -> Vec<[Vec2; 3]> {
    let polygon = bridge_holes(&shape.outer, &shape.holes);
    ear_clip(&polygon)
        .into_iter()
        .map(|[a, b, c]| [polygon[a], polygon[b], polygon[c]])
        .collect()
}

/// Splices every hole into the outer contour through a bridge edge, giving
/// one weakly simple polygon.
fn bridge_holes(outer: &[Vec2], holes: &[Vec<Vec2>]) -> Vec<Vec2> {
    let mut polygon = outer.to_vec();
    let mut pending: Vec<&Vec<Vec2>> = holes.iter().filter(|h| h.len() >= 3).collect();
    pending.sort_by(|a, b| max_x(b).total_cmp(&max_x(a)));

    for (index, hole) in pending.iter().enumerate() {
        let (hole_index, anchor) = hole
            .iter()
            .copied()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.x.total_cmp(&b.x))
            .unwrap_or((0, hole[0]));
        let others = &pending[index + 1..];
        let Some(target) = visible_vertex(&polygon, hole, others, anchor) else {
            warn!("could not bridge a glyph hole; leaving it filled");
            continue;
        };

        let mut merged = Vec::with_capacity(polygon.len() + hole.len() + 2);
        merged.extend_from_slice(&polygon[..=target]);
        merged.extend_from_slice(&hole[hole_index..]);
        merged.extend_from_slice(&hole[..=hole_index]);
        merged.extend_from_slice(&polygon[target..]);
        polygon = merged;
    }
    polygon
}

fn max_x(contour: &[Vec2]) -> f32 {
    contour.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max)
}

/// Closest polygon vertex that `anchor` can see without crossing any edge.
fn visible_vertex(
    polygon: &[Vec2],
    hole: &[Vec2],
    others: &[&Vec<Vec2>],
    anchor: Vec2,
) -> Option<usize> {
    let mut candidates: Vec<usize> = (0..polygon.len()).collect();
    candidates.sort_by(|&a, &b| {
        polygon[a]
            .distance_squared(anchor)
            .total_cmp(&polygon[b].distance_squared(anchor))
    });

    candidates.into_iter().find(|&index| {
        let target = polygon[index];
        let midpoint = (anchor + target) * 0.5;
        point_in_polygon(midpoint, polygon)
            && !point_in_polygon(midpoint, hole)
            && !crosses_any(anchor, target, polygon)
            && !crosses_any(anchor, target, hole)
            && others.iter().all(|other| !crosses_any(anchor, target, other))
    })
}

fn crosses_any(a: Vec2, b: Vec2, contour: &[Vec2]) -> bool {
    let n = contour.len();
    (0..n).any(|i| {
        let c = contour[i];
        let d = contour[(i + 1) % n];
        segments_cross(a, b, c, d)
    })
}

/// Proper intersection test; segments that only share an endpoint do not
/// cross.
fn segments_cross(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    if a == c || a == d || b == c || b == d {
        return false;
    }
    let d1 = (b - a).perp_dot(c - a);
    let d2 = (b - a).perp_dot(d - a);
    let d3 = (d - c).perp_dot(a - c);
    let d4 = (d - c).perp_dot(b - c);
    ((d1 > EPSILON && d2 < -EPSILON) || (d1 < -EPSILON && d2 > EPSILON))
        && ((d3 > EPSILON && d4 < -EPSILON) || (d3 < -EPSILON && d4 > EPSILON))
}

/// Ear clipping over a counter-clockwise polygon. Returns index triples.
pub fn ear_clip(polygon: &[Vec2]) -> Vec<[usize; 3]> {
    let mut remaining: Vec<usize> = (0..polygon.len()).collect();
    let mut triangles = Vec::with_capacity(polygon.len().saturating_sub(2));

    while remaining.len() > 3 {
        let m = remaining.len();
        let ear = (0..m).find(|&i| {
            let prev = remaining[(i + m - 1) % m];
            let next = remaining[(i + 1) % m];
            is_ear(polygon, &remaining, prev, remaining[i], next)
        });
        // No ear means the outline touches itself; clipping anyway keeps
        // the loop finite at the cost of a stray triangle.
        let i = ear.unwrap_or(0);
        let prev = remaining[(i + m - 1) % m];
        let next = remaining[(i + 1) % m];
        triangles.push([prev, remaining[i], next]);
        remaining.remove(i);
    }
    if let [a, b, c] = remaining[..] {
        triangles.push([a, b, c]);
    }
    triangles
}

fn is_ear(polygon: &[Vec2], remaining: &[usize], prev: usize, current: usize, next: usize) -> bool {
    let a = polygon[prev];
    let b = polygon[current];
    let c = polygon[next];
    if (b - a).perp_dot(c - b) <= EPSILON {
        return false;
    }
    remaining.iter().all(|&index| {
        if index == prev || index == current || index == next {
            return true;
        }
        let p = polygon[index];
        // bridge vertices are duplicated; a copy of a corner is not "inside"
        if p == a || p == b || p == c {
            return true;
        }
        !point_in_triangle(p, a, b, c)
    })
}

fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    let ab = (b - a).perp_dot(p - a);
    let bc = (c - b).perp_dot(p - b);
    let ca = (a - c).perp_dot(p - c);
    ab >= -EPSILON && bc >= -EPSILON && ca >= -EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f32, max: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(min, min),
            Vec2::new(max, min),
            Vec2::new(max, max),
            Vec2::new(min, max),
        ]
    }

    fn total_area(triangles: &[[Vec2; 3]]) -> f32 {
        triangles.iter().map(|t| signed_area(t)).sum()
    }

    #[test]
    fn convex_polygon_fans_out() {
        let shape = Shape {
            outer: square(0.0, 2.0),
            holes: Vec::new(),
        };
        let triangles = triangulate(&shape);
        assert_eq!(triangles.len(), 2);
        assert!((total_area(&triangles) - 4.0).abs() < 1e-5);
    }

    #[test]
    fn concave_polygon_keeps_its_notch() {
        // "L" shape
        let outer = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(3.0, 0.0),
            Vec2::new(3.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 3.0),
            Vec2::new(0.0, 3.0),
        ];
        let triangles = triangulate(&Shape {
            outer,
            holes: Vec::new(),
        });
        assert_eq!(triangles.len(), 4);
        assert!((total_area(&triangles) - 5.0).abs() < 1e-5);
        assert!(triangles.iter().all(|t| signed_area(t) > 0.0));
    }

    #[test]
    fn hole_is_cut_out() {
        let mut hole = square(1.0, 3.0);
        hole.reverse();
        let shape = Shape {
            outer: square(0.0, 4.0),
            holes: vec![hole],
        };
        let triangles = triangulate(&shape);
        assert_eq!(triangles.len(), 8);
        assert!((total_area(&triangles) - 12.0).abs() < 1e-4);
    }

    #[test]
    fn grouping_follows_the_largest_contour() {
        // clockwise outer (TrueType style) with a counter-clockwise hole
        let mut outer = square(0.0, 4.0);
        outer.reverse();
        let hole = square(1.0, 3.0);
        let shapes = group_contours(vec![hole, outer]);
        assert_eq!(shapes.len(), 1);
        assert!(signed_area(&shapes[0].outer) > 0.0);
        assert_eq!(shapes[0].holes.len(), 1);
        assert!(signed_area(&shapes[0].holes[0]) < 0.0);
    }

    #[test]
    fn separate_outlines_stay_separate() {
        let shapes = group_contours(vec![square(0.0, 1.0), square(2.0, 3.0)]);
        assert_eq!(shapes.len(), 2);
        assert!(shapes.iter().all(|s| s.holes.is_empty()));
    }

    #[test]
    fn crossing_detection_ignores_shared_endpoints() {
        let a = Vec2::ZERO;
        let b = Vec2::new(2.0, 2.0);
        assert!(segments_cross(a, b, Vec2::new(0.0, 2.0), Vec2::new(2.0, 0.0)));
        assert!(!segments_cross(a, b, b, Vec2::new(3.0, 0.0)));
        assert!(!segments_cross(a, b, Vec2::new(3.0, 0.0), Vec2::new(4.0, 0.0)));
    }
}
