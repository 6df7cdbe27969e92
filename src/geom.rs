//! Geometric primitives: points, orientation predicates, and the few
//! intersection routines that the sweep needs.
//!
//! Every predicate here is "fuzzy": a triangle whose doubled signed area is
//! within [`DISTANCE_EPSILON`] of zero counts as collinear, and intersections
//! that land within [`DISTANCE_EPSILON`] of an endpoint don't count.

use std::ops::{Add, Div, Mul, Neg, Sub};

/// Two points closer than this are considered to be the same point.
pub const DISTANCE_EPSILON: f64 = 1e-6;

/// The square of [`DISTANCE_EPSILON`].
pub const SQUARE_OF_DISTANCE_EPSILON: f64 = 1e-12;

/// Tolerance used when deciding whether two segments intersect.
pub const INTERSECTION_EPSILON: f64 = 1e-4;

/// A very small tolerance, used for comparing sweep coordinates.
pub const TOLERANCE: f64 = 1e-8;

/// Below this (absolute) determinant, a 2x2 linear system is considered singular.
const SINGULAR_DETERMINANT: f64 = 1e-8;

/// A two-dimensional point (or vector; we don't distinguish).
#[derive(Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl std::fmt::Debug for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?}, {:?})", self.x, self.y)
    }
}

impl Point {
    /// Create a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// The dot product.
    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// The `z` component of the cross product.
    ///
    /// This is positive if `other` is counter-clockwise from `self`.
    pub fn cross(self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// The Euclidean length.
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// The L1 ("taxicab") length.
    pub fn l1(self) -> f64 {
        self.x.abs() + self.y.abs()
    }

    /// Rotates counter-clockwise by `angle` radians.
    pub fn rotate(self, angle: f64) -> Point {
        let (sin, cos) = angle.sin_cos();
        Point::new(cos * self.x - sin * self.y, sin * self.x + cos * self.y)
    }

    /// Rotates by 90 degrees clockwise.
    pub fn rotate90_cw(self) -> Point {
        Point::new(self.y, -self.x)
    }

    /// Rotates by 90 degrees counter-clockwise.
    pub fn rotate90_ccw(self) -> Point {
        Point::new(-self.y, self.x)
    }

    /// Returns a vector of length one pointing in the same direction, or `None`
    /// if we're too short to have a direction.
    pub fn normalized(self) -> Option<Point> {
        let len = self.length();
        (len > DISTANCE_EPSILON).then(|| self / len)
    }

    /// The point halfway between `self` and `other`.
    pub fn middle(self, other: Point) -> Point {
        (self + other) / 2.0
    }

    /// Are we within [`DISTANCE_EPSILON`] of `other`?
    pub fn close_dist_eps(self, other: Point) -> bool {
        (self - other).length() <= DISTANCE_EPSILON
    }

    /// Are both coordinates finite?
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Are either of the coordinates NaN?
    pub fn is_nan(self) -> bool {
        self.x.is_nan() || self.y.is_nan()
    }

    /// The exact bit patterns of the coordinates, with `-0.0` replaced by `0.0`.
    ///
    /// Two points with the same bits are the same vertex.
    pub(crate) fn bits(self) -> (u64, u64) {
        // Adding 0.0 turns -0.0 into 0.0.
        ((self.x + 0.0).to_bits(), (self.y + 0.0).to_bits())
    }

    /// Converts to a `kurbo` point.
    pub fn to_kurbo(self) -> kurbo::Point {
        kurbo::Point::new(self.x, self.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<kurbo::Point> for Point {
    fn from(p: kurbo::Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<kurbo::Vec2> for Point {
    fn from(v: kurbo::Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Point> for kurbo::Point {
    fn from(p: Point) -> Self {
        p.to_kurbo()
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

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Point {
    type Output = Point;

    fn div(self, rhs: f64) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

/// The orientation of an ordered triple of points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Orientation {
    /// The third point is to the left of the line through the first two.
    Counterclockwise,
    /// The third point is to the right of the line through the first two.
    Clockwise,
    /// The three points are (almost) on a line.
    Collinear,
}

/// Twice the signed area of the triangle `abc`; positive if `abc` is counter-clockwise.
pub fn signed_doubled_triangle_area(a: Point, b: Point, c: Point) -> f64 {
    (b - a).cross(c - a)
}

/// The orientation of `abc`, up to [`DISTANCE_EPSILON`].
pub fn orientation(a: Point, b: Point, c: Point) -> Orientation {
    let area = signed_doubled_triangle_area(a, b, c);
    if area > DISTANCE_EPSILON {
        Orientation::Counterclockwise
    } else if area < -DISTANCE_EPSILON {
        Orientation::Clockwise
    } else {
        Orientation::Collinear
    }
}

/// Is `p` strictly to the left of the line from `l0` to `l1`?
pub fn is_left_of(p: Point, l0: Point, l1: Point) -> bool {
    signed_doubled_triangle_area(p, l0, l1) > 0.0
}

/// Is `p` to the left of, or exactly on, the line from `l0` to `l1`?
pub fn is_left_of_or_on(p: Point, l0: Point, l1: Point) -> bool {
    signed_doubled_triangle_area(p, l0, l1) >= 0.0
}

/// Is `p` strictly to the right of the line from `l0` to `l1`?
pub fn is_right_of(p: Point, l0: Point, l1: Point) -> bool {
    signed_doubled_triangle_area(l0, l1, p) < 0.0
}

/// Is `p` to the right of, or exactly on, the line from `l0` to `l1`?
pub fn is_right_of_or_on(p: Point, l0: Point, l1: Point) -> bool {
    signed_doubled_triangle_area(l0, l1, p) <= 0.0
}

/// Is `p` inside (or on the boundary of) the cone with the given apex, whose
/// left side passes through `left` and whose right side passes through `right`?
pub fn point_in_cone(p: Point, apex: Point, left: Point, right: Point) -> bool {
    is_right_of_or_on(p, apex, left) && is_left_of_or_on(p, apex, right)
}

/// Solves the linear system
///
/// ```text
/// a00 * x + a01 * y = b0
/// a10 * x + a11 * y = b1
/// ```
///
/// returning `None` if it's (close to) singular.
pub fn solve_linear_2x2(
    a00: f64,
    a01: f64,
    b0: f64,
    a10: f64,
    a11: f64,
    b1: f64,
) -> Option<(f64, f64)> {
    let det = a00 * a11 - a10 * a01;
    if det.abs() < SINGULAR_DETERMINANT {
        return None;
    }
    Some(((b0 * a11 - b1 * a01) / det, (a00 * b1 - a10 * b0) / det))
}

/// The intersection of the line through `a` and `b` with the line through `c` and `d`.
pub fn line_line_intersection(a: Point, b: Point, c: Point, d: Point) -> Option<Point> {
    // Solve a + u (b - a) = c + v (d - c).
    let ba = b - a;
    let cd = c - d;
    let ca = c - a;
    let (u, _v) = solve_linear_2x2(ba.x, cd.x, ca.x, ba.y, cd.y, ca.y)?;
    Some(a + ba * u)
}

/// Where does the ray from `origin` in direction `dir` cross the interior of
/// the segment from `start` to `end`?
///
/// Crossings within [`DISTANCE_EPSILON`] of `start`, or at `end` itself, are
/// not reported.
pub fn interval_intersects_ray(start: Point, end: Point, origin: Point, dir: Point) -> Option<Point> {
    let x = line_line_intersection(start, end, origin, origin + dir)?;
    let ds = start - x;
    let de = x - end;
    if ds.dot(de) <= 0.0 {
        return None;
    }
    if (x - origin).dot(dir) < 0.0 {
        return None;
    }
    (ds.dot(ds) > SQUARE_OF_DISTANCE_EPSILON && de.dot(de) >= SQUARE_OF_DISTANCE_EPSILON)
        .then_some(x)
}

/// Where do two rays cross, if they cross away from both of their origins?
pub fn rays_intersect_interiors(
    a_origin: Point,
    a_dir: Point,
    b_origin: Point,
    b_dir: Point,
) -> Option<Point> {
    let x = line_line_intersection(a_origin, a_origin + a_dir, b_origin, b_origin + b_dir)?;
    let beyond = |origin: Point, dir: Point| (x - origin).dot(dir / dir.l1()) > DISTANCE_EPSILON;
    (beyond(a_origin, a_dir) && beyond(b_origin, b_dir)).then_some(x)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::num::tests::Reasonable;
    use proptest::prelude::*;

    impl Reasonable for Point {
        type Strategy = BoxedStrategy<Point>;

        fn reasonable() -> Self::Strategy {
            (f64::reasonable(), f64::reasonable())
                .prop_map(|(x, y)| Point::new(x, y))
                .boxed()
        }
    }

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn orientations() {
        assert_eq!(
            orientation(p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0)),
            Orientation::Counterclockwise
        );
        assert_eq!(
            orientation(p(0.0, 0.0), p(0.0, 1.0), p(1.0, 0.0)),
            Orientation::Clockwise
        );
        assert_eq!(
            orientation(p(0.0, 0.0), p(1.0, 1.0), p(2.0, 2.0 + 1e-9)),
            Orientation::Collinear
        );
    }

    #[test]
    fn rotation_is_counterclockwise() {
        let r = p(1.0, 0.0).rotate(std::f64::consts::FRAC_PI_2);
        assert!(r.close_dist_eps(p(0.0, 1.0)));
        assert_eq!(p(1.0, 0.0).rotate90_cw(), p(0.0, -1.0));
        assert_eq!(p(1.0, 0.0).rotate90_ccw(), p(0.0, 1.0));
    }

    #[test]
    fn cone_membership() {
        let apex = p(0.0, 0.0);
        let left = p(1.0, 1.0);
        let right = p(1.0, -1.0);
        assert!(point_in_cone(p(2.0, 0.0), apex, left, right));
        assert!(point_in_cone(p(2.0, 2.0), apex, left, right));
        assert!(!point_in_cone(p(2.0, 3.0), apex, left, right));
        assert!(!point_in_cone(p(2.0, -3.0), apex, left, right));
    }

    #[test]
    fn singular_systems() {
        assert_eq!(solve_linear_2x2(1.0, 2.0, 0.0, 2.0, 4.0, 1.0), None);
        assert_eq!(
            solve_linear_2x2(2.0, 0.0, 4.0, 0.0, 4.0, 2.0),
            Some((2.0, 0.5))
        );
        assert_eq!(
            line_line_intersection(p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0), p(1.0, 1.0)),
            None
        );
    }

    #[test]
    fn interval_and_ray() {
        let x = interval_intersects_ray(p(1.0, -1.0), p(1.0, 1.0), p(0.0, 0.0), p(1.0, 0.0));
        assert_eq!(x, Some(p(1.0, 0.0)));

        // Behind the ray origin.
        let x = interval_intersects_ray(p(-1.0, -1.0), p(-1.0, 1.0), p(0.0, 0.0), p(1.0, 0.0));
        assert_eq!(x, None);

        // Misses the segment.
        let x = interval_intersects_ray(p(1.0, 1.0), p(1.0, 2.0), p(0.0, 0.0), p(1.0, 0.0));
        assert_eq!(x, None);

        // Crossings at either endpoint don't count.
        let x = interval_intersects_ray(p(1.0, 0.0), p(1.0, 2.0), p(0.0, 0.0), p(1.0, 0.0));
        assert_eq!(x, None);
        let x = interval_intersects_ray(p(1.0, -2.0), p(1.0, 0.0), p(0.0, 0.0), p(1.0, 0.0));
        assert_eq!(x, None);
    }

    #[test]
    fn ray_interiors() {
        let x = rays_intersect_interiors(p(0.0, 0.0), p(1.0, 1.0), p(2.0, 0.0), p(-1.0, 1.0));
        assert!(x.is_some_and(|x| x.close_dist_eps(p(1.0, 1.0))));

        // They'd cross, but behind the second origin.
        let x = rays_intersect_interiors(p(0.0, 0.0), p(1.0, 1.0), p(2.0, 0.0), p(1.0, -1.0));
        assert_eq!(x, None);

        // Crossing exactly at an origin doesn't count.
        let x = rays_intersect_interiors(p(0.0, 0.0), p(1.0, 0.0), p(0.0, 0.0), p(0.0, 1.0));
        assert_eq!(x, None);
    }

    proptest! {
        #[test]
        fn left_and_right_are_exclusive(a in Point::reasonable(), b in Point::reasonable(), c in Point::reasonable()) {
            prop_assert!(!(is_left_of(a, b, c) && is_right_of(a, b, c)));
            prop_assert!(is_left_of_or_on(a, b, c) || is_right_of_or_on(a, b, c));
        }

        #[test]
        fn orientation_is_antisymmetric(a in Point::reasonable(), b in Point::reasonable(), c in Point::reasonable()) {
            let flipped = match orientation(a, b, c) {
                Orientation::Counterclockwise => Orientation::Clockwise,
                Orientation::Clockwise => Orientation::Counterclockwise,
                Orientation::Collinear => Orientation::Collinear,
            };
            prop_assert_eq!(orientation(a, c, b), flipped);
        }
    }
}
