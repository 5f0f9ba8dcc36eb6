//! Planar keypoint geometry.
//!
//! Points live in image orientation: `x` grows to the right and `y` grows
//! downward, so "up" is `(0, -1)`.

use nalgebra::{Point2, Vector2};

/// 2D keypoint position.
pub type Point = Point2<f64>;

/// Vectors shorter than this are treated as degenerate.
const DEGENERATE_LEN: f64 = 1e-12;

/// Angle ABC in degrees with `b` as the vertex, in `[0, 180]`.
///
/// Returns `None` when either arm has zero length, since the angle is
/// undefined there.
///
/// # Example
///
/// ```
/// use movement_metrics::math::geometry::{angle_at_vertex, Point};
///
/// let a = Point::new(1.0, 0.0);
/// let b = Point::new(0.0, 0.0);
/// let c = Point::new(0.0, 1.0);
/// let angle = angle_at_vertex(&a, &b, &c).unwrap();
/// assert!((angle - 90.0).abs() < 1e-9);
/// ```
#[must_use]
pub fn angle_at_vertex(a: &Point, b: &Point, c: &Point) -> Option<f64> {
    angle_between(&(a - b), &(c - b))
}

/// Unsigned angle between two vectors in degrees, in `[0, 180]`.
#[must_use]
pub fn angle_between(u: &Vector2<f64>, v: &Vector2<f64>) -> Option<f64> {
    let nu = u.norm();
    let nv = v.norm();
    if nu < DEGENERATE_LEN || nv < DEGENERATE_LEN {
        return None;
    }
    let cos = (u.dot(v) / (nu * nv)).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// Inclination of the vector `from -> to` relative to straight up, in degrees.
///
/// 0° means `to` is directly above `from`; 90° is horizontal; 180° is
/// straight down.
#[must_use]
pub fn inclination_from_vertical(from: &Point, to: &Point) -> Option<f64> {
    angle_between(&(to - from), &Vector2::new(0.0, -1.0))
}

/// Midpoint of two points.
#[must_use]
pub fn midpoint(a: &Point, b: &Point) -> Point {
    nalgebra::center(a, b)
}

/// Midpoint of an optional pair, falling back to whichever side is present.
#[must_use]
pub fn pair_center(a: Option<Point>, b: Option<Point>) -> Option<Point> {
    match (a, b) {
        (Some(a), Some(b)) => Some(midpoint(&a, &b)),
        (a, b) => a.or(b),
    }
}

/// Horizontal distance between two points.
#[must_use]
pub fn horizontal_spacing(a: &Point, b: &Point) -> f64 {
    (a.x - b.x).abs()
}

/// Signed distance of `p` from the line through `a` and `b`.
///
/// Positive means `p` lies below the line in image orientation, whichever
/// way the line runs. For a vertical line, positive is to the right.
/// Returns `None` when `a` and `b` coincide.
#[must_use]
pub fn offset_from_line(p: &Point, a: &Point, b: &Point) -> Option<f64> {
    let dir = b - a;
    let len = dir.norm();
    if len < DEGENERATE_LEN {
        return None;
    }
    let normal = Vector2::new(-dir.y, dir.x) / len;
    let flip = if normal.y.abs() > DEGENERATE_LEN {
        normal.y < 0.0
    } else {
        normal.x < 0.0
    };
    let normal = if flip { -normal } else { normal };
    Some((p - a).dot(&normal))
}

/// Mean squared distance of the points from their centroid.
///
/// Returns `None` for an empty slice.
#[must_use]
pub fn positional_variance(points: &[Point]) -> Option<f64> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let centroid = points
        .iter()
        .fold(Vector2::zeros(), |acc, p| acc + p.coords)
        / n;
    let sum: f64 = points
        .iter()
        .map(|p| (p.coords - centroid).norm_squared())
        .sum();
    Some(sum / n)
}
