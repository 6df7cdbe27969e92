//! Utilities for generating examples, benchmarks, and test cases.

use crate::{Point, Polyline};

/// Generate a bunch of squares, arranged in a `count` by `count` grid.
///
/// The bottom-left of the first square is at (x0, y0). Each square has size `size
/// x size`, and the distance between squares (both horizontally and vertically)
/// is `offset`.
///
/// If `slant` is non-zero, generates parallelograms instead of squares: the
/// right-hand side of each square gets translated up by `slant`.
fn squares((x0, y0): (f64, f64), size: f64, offset: f64, slant: f64, count: usize) -> Vec<Polyline> {
    let mut ret = Vec::new();
    for i in 0..count {
        let x = x0 + i as f64 * offset;
        for j in 0..count {
            let y = y0 + j as f64 * offset;
            ret.push(Polyline::closed([
                (x, y),
                (x, y + size),
                (x + size, y + size + slant),
                (x + size, y + slant),
            ]));
        }
    }
    ret
}

/// An `n` by `n` grid of 30x30 squares, 10 apart.
///
/// Every obstacle side is parallel to one of the axes, which is the worst case
/// for sweeps in axis-aligned directions.
pub fn grid(n: usize) -> Vec<Polyline> {
    squares((0.0, 0.0), 30.0, 40.0, 0.0, n)
}

/// Like [`grid`], but with no exactly-horizontal sides.
pub fn slanted_grid(n: usize) -> Vec<Polyline> {
    squares((0.0, 0.0), 30.0, 40.0, 1.0, n)
}

/// An `n` by `n` grid of diamonds (squares rotated by 45 degrees).
pub fn diamonds(n: usize) -> Vec<Polyline> {
    let mut ret = Vec::new();
    for i in 0..n {
        for j in 0..n {
            let c = Point::new(i as f64 * 40.0, j as f64 * 40.0);
            ret.push(Polyline::closed([
                c + Point::new(0.0, -15.0),
                c + Point::new(-15.0, 0.0),
                c + Point::new(0.0, 15.0),
                c + Point::new(15.0, 0.0),
            ]));
        }
    }
    ret
}

/// `n` long, skinny parallelograms, leaning to the right, side by side.
pub fn slanties(n: usize) -> Vec<Polyline> {
    let h = 20.0 * n as f64;
    (0..n)
        .map(|i| {
            let x_off = 20.0 * i as f64;
            Polyline::closed([
                (x_off, 0.0),
                (x_off + h, h),
                (x_off + h + 10.0, h),
                (x_off + 10.0, 0.0),
            ])
        })
        .collect()
}

/// Regular polygons with `sides` sides, in an `n` by `n` grid.
pub fn polygons(n: usize, sides: usize) -> Vec<Polyline> {
    let mut ret = Vec::new();
    for i in 0..n {
        for j in 0..n {
            let c = Point::new(i as f64 * 40.0, j as f64 * 40.0);
            // Decreasing angles go clockwise.
            let points = (0..sides).map(|k| {
                let t = -(k as f64) * 2.0 * std::f64::consts::PI / sides as f64;
                c + Point::new(15.0 * t.cos(), 15.0 * t.sin())
            });
            ret.push(Polyline::closed(points));
        }
    }
    ret
}

fn ports_between(n: usize, offset: f64) -> Vec<Point> {
    let mut ret = Vec::new();
    for i in 0..n.saturating_sub(1) {
        for j in 0..n.saturating_sub(1) {
            ret.push(Point::new(i as f64 * 40.0 + offset, j as f64 * 40.0 + offset));
        }
    }
    ret
}

/// Ports in the gaps between the cells of an `n` by `n` grid from [`grid`].
pub fn grid_ports(n: usize) -> Vec<Point> {
    ports_between(n, 35.0)
}

/// Ports in the gaps between the cells of an `n` by `n` grid from
/// [`diamonds`] or [`polygons`], which are centered on the grid points.
pub fn centered_ports(n: usize) -> Vec<Point> {
    ports_between(n, 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_obstacles_are_clockwise_and_convex() {
        for obstacles in [grid(3), slanted_grid(3), diamonds(3), slanties(3), polygons(3, 7)] {
            assert_eq!(obstacles.len() % 3, 0);
            for o in &obstacles {
                assert!(o.is_closed());
                assert!(o.is_clockwise(), "{o:?}");
                assert!(o.is_convex(), "{o:?}");
            }
        }
    }

    #[test]
    fn ports_are_outside_obstacles() {
        let inside = |p: Point, o: &Polyline| {
            let b = o.bounding_box().unwrap();
            b.contains(p.to_kurbo())
        };
        for (obstacles, ports) in [(grid(4), grid_ports(4)), (polygons(4, 7), centered_ports(4))] {
            assert_eq!(ports.len(), 9);
            for p in &ports {
                assert!(obstacles.iter().all(|o| !inside(*p, o)), "{p:?}");
            }
        }
    }
}
