//! Geometric primitives and small numeric helpers.

use cgmath::prelude::*;
use cgmath::{Point2, Vector2};

/// A 2D point
pub type Point2d = Point2<f64>;

/// A 2D vector
pub type Vector2d = Vector2<f64>;

/// Computes the corners of a rectangle centred at `centre`, with `length`
/// extending along the heading `angle` and `width` across it.
pub fn rect_corners(centre: Point2d, length: f64, width: f64, angle: f64) -> [Point2d; 4] {
    let (sin, cos) = angle.sin_cos();
    let forward = Vector2d::new(cos, sin) * (0.5 * length);
    let side = Vector2d::new(-sin, cos) * (0.5 * width);
    [
        centre + forward + side,
        centre + forward - side,
        centre - forward - side,
        centre - forward + side,
    ]
}

/// Returns true if the point lies strictly inside the axis-aligned rectangle.
pub fn point_in_rect(point: Point2d, min: Point2d, max: Point2d) -> bool {
    point.x > min.x && point.x < max.x && point.y > min.y && point.y < max.y
}

/// Tests two convex polygons for overlap using the separating axis theorem.
pub fn polygons_intersect(a: &[Point2d], b: &[Point2d]) -> bool {
    for polygon in [a, b] {
        for i in 0..polygon.len() {
            let p1 = polygon[i];
            let p2 = polygon[(i + 1) % polygon.len()];
            let normal = Vector2d::new(p2.y - p1.y, p1.x - p2.x);
            let (min_a, max_a) = project_extent(a, normal);
            let (min_b, max_b) = project_extent(b, normal);
            if max_a < min_b || max_b < min_a {
                return false;
            }
        }
    }
    true
}

/// Projects a polygon onto an axis and returns the extent of its shadow.
fn project_extent(polygon: &[Point2d], axis: Vector2d) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for point in polygon {
        let projection = axis.dot(point.to_vec());
        min = min.min(projection);
        max = max.max(projection);
    }
    (min, max)
}

/// Returns the index of the largest value. Ties resolve to the earliest
/// index, so callers get a stable pick from equal scores.
pub fn argmax(values: &[f64]) -> usize {
    debug_assert!(!values.is_empty());
    let mut best = 0;
    for (i, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = i;
        }
    }
    best
}
