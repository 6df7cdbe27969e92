//! Utilities for fuzz and/or property testing using `arbitrary`.

use arbitrary::Unstructured;

use crate::{Point, Polyline};

/// Generate an arbitrary float in some range.
pub fn float_in_range(
    start: f64,
    end: f64,
    u: &mut Unstructured<'_>,
) -> Result<f64, arbitrary::Error> {
    let num: u32 = u.arbitrary()?;
    let t = num as f64 / u32::MAX as f64;
    Ok((1.0 - t) * start + t * end)
}

/// Generate a float in some range, but give it a chance to be close to another float.
fn another_float_in_range(
    orig: f64,
    start: f64,
    end: f64,
    u: &mut Unstructured<'_>,
) -> Result<f64, arbitrary::Error> {
    let close: bool = u.arbitrary()?;
    if close {
        let ulps: i32 = u.int_in_range(-32..=32)?;
        let scale = 1.0f64 + ulps as f64 * f64::EPSILON;
        Ok((orig * scale).clamp(start, end))
    } else {
        float_in_range(start, end, u)
    }
}

/// Generate a unit-length sweep direction.
///
/// Axis-aligned directions, which line up with the sides of the obstacles
/// from [`grid_obstacles`], are much more likely than they would be by chance.
pub fn direction(u: &mut Unstructured<'_>) -> Result<Point, arbitrary::Error> {
    let axis_aligned: bool = u.arbitrary()?;
    let angle = if axis_aligned {
        let quarter: u8 = u.int_in_range(0..=3)?;
        quarter as f64 * std::f64::consts::FRAC_PI_2
    } else {
        float_in_range(0.0, 2.0 * std::f64::consts::PI, u)?
    };
    Ok(Point::new(angle.cos(), angle.sin()))
}

/// Generate a cone angle between a few degrees and a bit less than π.
pub fn cone_angle(u: &mut Unstructured<'_>) -> Result<f64, arbitrary::Error> {
    float_in_range(0.05, 3.0, u)
}

/// Generate a convex polygon inside the axis-aligned box with corners `min` and
/// `min + (size, size)`, listed clockwise.
///
/// The vertices sit on an ellipse inscribed in the box, at increasing angles,
/// so the polygon is always convex. Neighboring vertices have a chance of
/// being almost (but not quite) the same.
pub fn convex_polygon(min: Point, size: f64, u: &mut Unstructured<'_>) -> Result<Polyline, arbitrary::Error> {
    let n: usize = u.int_in_range(1..=8)?;
    let center = min + Point::new(size, size) / 2.0;
    let rx = float_in_range(size / 8.0, size / 2.0, u)?;
    let ry = another_float_in_range(rx, size / 8.0, size / 2.0, u)?;

    let mut angles = Vec::with_capacity(n);
    for _ in 0..n {
        angles.push(float_in_range(0.0, 2.0 * std::f64::consts::PI, u)?);
    }
    // Decreasing angles go clockwise.
    angles.sort_by(|a, b| b.total_cmp(a));
    let points = angles
        .into_iter()
        .map(|t| center + Point::new(rx * t.cos(), ry * t.sin()));
    let poly = Polyline::closed(points);
    Ok(if poly.is_clockwise() { poly } else { poly.reversed() })
}

/// Generate a collection of disjoint convex obstacles, one per cell of a grid.
pub fn grid_obstacles(u: &mut Unstructured<'_>) -> Result<Vec<Polyline>, arbitrary::Error> {
    let cols: usize = u.int_in_range(1..=4)?;
    let rows: usize = u.int_in_range(1..=4)?;
    let cell = 10.0;
    let mut ret = Vec::new();
    for i in 0..cols {
        for j in 0..rows {
            if u.ratio(1, 4)? {
                continue;
            }
            let min = Point::new(i as f64 * cell, j as f64 * cell);
            let size = float_in_range(2.0, cell * 0.8, u)?;
            ret.push(convex_polygon(min, size, u)?);
        }
    }
    Ok(ret)
}
