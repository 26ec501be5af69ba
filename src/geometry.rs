use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Below this length a vector is treated as zero and never normalised.
pub const GEOMETRY_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Point) -> f64 {
        (other - self).length()
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector.
    pub fn normalized(self) -> Option<Point> {
        let length = self.length();
        if length <= GEOMETRY_EPSILON || !length.is_finite() {
            return None;
        }
        Some(Point::new(self.x / length, self.y / length))
    }

    pub fn lerp(self, other: Point, t: f64) -> Point {
        self + (other - self) * t
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Closest point to `point` on the segment `a`-`b`, clamped to the segment.
pub fn closest_point_on_segment(point: Point, a: Point, b: Point) -> Point {
    let ab = b - a;
    let length_sq = ab.x * ab.x + ab.y * ab.y;
    if length_sq <= GEOMETRY_EPSILON {
        return a;
    }
    let ap = point - a;
    let t = ((ap.x * ab.x + ap.y * ab.y) / length_sq).clamp(0.0, 1.0);
    a.lerp(b, t)
}

pub fn point_segment_distance(point: Point, a: Point, b: Point) -> f64 {
    point.distance(closest_point_on_segment(point, a, b))
}

/// Pulls `candidate` back toward `origin` when it strays past `max_distance`,
/// scaling the offset by `max_distance / distance`.
pub fn elastic_constrain(origin: Point, candidate: Point, max_distance: f64) -> Point {
    let offset = candidate - origin;
    let distance = offset.length();
    if distance <= max_distance || distance <= GEOMETRY_EPSILON {
        return candidate;
    }
    let resistance = max_distance / distance;
    origin + offset * resistance
}

/// Trims a center-to-center segment so it starts and ends on each node's
/// spacing circle. Returns `None` when the circles touch or overlap.
pub fn anchor_segment(from: Point, from_radius: f64, to: Point, to_radius: f64) -> Option<(Point, Point)> {
    let direction = (to - from).normalized()?;
    if from.distance(to) <= from_radius + to_radius {
        return None;
    }
    Some((from + direction * from_radius, to - direction * to_radius))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_eq!(point_segment_distance(Point::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(point_segment_distance(Point::new(13.0, 4.0), a, b), 5.0);
    }

    #[test]
    fn degenerate_segment_measures_to_start() {
        let a = Point::new(2.0, 2.0);
        let distance = point_segment_distance(Point::new(5.0, 6.0), a, a);
        assert!((distance - 5.0).abs() < 1e-9);
    }

    #[test]
    fn elastic_constraint_caps_at_max_distance() {
        let origin = Point::new(100.0, 100.0);
        let constrained = elastic_constrain(origin, Point::new(600.0, 100.0), 100.0);
        assert!((constrained.distance(origin) - 100.0).abs() < 1e-9);

        let inside = elastic_constrain(origin, Point::new(130.0, 140.0), 100.0);
        assert_eq!(inside, Point::new(130.0, 140.0));
    }

    #[test]
    fn zero_vector_does_not_normalize() {
        assert!(Point::new(0.0, 0.0).normalized().is_none());
        assert!(anchor_segment(Point::default(), 10.0, Point::default(), 10.0).is_none());
    }
}
