//! Orderings along the sweep line.
//!
//! Imagine that the sweep direction points up. The sweep line is then a
//! horizontal line at height `z`, and everything crossing it is ordered from
//! left to right. Everything here takes the sweep line position explicitly, as
//! a [`SweepFrame`], because the order of two sides can change as the line
//! moves.

use std::cmp::Ordering;

use crate::geom::{orientation, Orientation, Point, TOLERANCE};
use crate::sweep::cone::{ConeSide, SideIdx, SideKind, SideVec};
use crate::sweep::obstacle_side::ObstacleSide;

/// The sweep direction, together with a position of the sweep line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepFrame {
    /// The (unit) sweep direction.
    pub direction: Point,
    /// The sweep direction rotated 90 degrees clockwise.
    pub perp: Point,
    /// The position of the sweep line, as measured along `direction`.
    pub z: f64,
}

impl SweepFrame {
    /// Creates a frame with the sweep line at `z`.
    pub fn new(direction: Point, z: f64) -> Self {
        SweepFrame {
            direction,
            perp: direction.rotate90_cw(),
            z,
        }
    }

    /// The same sweep direction, with the sweep line somewhere else.
    pub fn at(&self, z: f64) -> Self {
        SweepFrame { z, ..*self }
    }

    /// The coordinate of `p` along the sweep direction.
    pub fn z_of(&self, p: Point) -> f64 {
        self.direction.dot(p)
    }

    /// The coordinate of `p` along the sweep line.
    pub fn perp_of(&self, p: Point) -> f64 {
        self.perp.dot(p)
    }

    /// Compares two points in sweep order: lower `z` first, and then smaller
    /// perpendicular coordinate first.
    pub fn compare_points(&self, a: Point, b: Point) -> Ordering {
        let za = self.z_of(a);
        let zb = self.z_of(b);
        if za < zb {
            return Ordering::Less;
        }
        if za > zb {
            return Ordering::Greater;
        }
        let pa = self.perp_of(a);
        let pb = self.perp_of(b);
        if pa < pb {
            Ordering::Less
        } else if pa > pb {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    /// Where the line through `start` in direction `dir` crosses the sweep line.
    ///
    /// Lines that are (almost) parallel to the sweep line are treated as
    /// crossing it at `start`.
    pub fn crossing(&self, start: Point, dir: Point) -> Point {
        let den = dir.dot(self.direction);
        if den.abs() <= TOLERANCE {
            return start;
        }
        let t = (self.z - self.z_of(start)) / den;
        start + dir * t
    }
}

fn from_orientation(o: Orientation) -> Ordering {
    match o {
        Orientation::Counterclockwise => Ordering::Less,
        Orientation::Clockwise => Ordering::Greater,
        Orientation::Collinear => Ordering::Equal,
    }
}

fn kind_rank(kind: &SideKind) -> u8 {
    match kind {
        SideKind::Left => 0,
        SideKind::Right => 1,
        SideKind::Broken { .. } => 2,
    }
}

/// Compares two cone sides along the sweep line.
///
/// A side is less than another if it crosses the sweep line to the left of it.
/// Sides that cross at the same place are ordered by what happens just above
/// the sweep line: the side turning more to the left is smaller. Two broken
/// sides that run to the same obstacle vertex are ordered like the straight
/// sides they replaced.
pub fn compare_cone_sides(
    frame: &SweepFrame,
    sides: &SideVec<ConeSide>,
    a: SideIdx,
    b: SideIdx,
) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let sa = &sides[a];
    let sb = &sides[b];

    if let (
        SideKind::Broken {
            end_vertex: end_a,
            original: orig_a,
            ..
        },
        SideKind::Broken {
            end_vertex: end_b,
            original: orig_b,
            ..
        },
    ) = (sa.kind, sb.kind)
    {
        if end_a == end_b && orig_a != orig_b {
            return compare_cone_sides(frame, sides, orig_a, orig_b);
        }
    }

    let ord = if sa.is_plain() && sb.is_plain() {
        // Straight sides in the same tree are parallel, so comparing their
        // starts is the same as comparing their crossings, only more exact.
        from_orientation(orientation(sa.start, sb.start, sb.second_point()))
    } else {
        let x = frame.crossing(sa.start, sa.direction);
        from_orientation(orientation(x, sb.start, sb.second_point()))
    };
    if ord != Ordering::Equal {
        return ord;
    }

    let turn = sb.direction.cross(sa.direction);
    if turn > 0.0 {
        Ordering::Less
    } else if turn < 0.0 {
        Ordering::Greater
    } else {
        kind_rank(&sa.kind).cmp(&kind_rank(&sb.kind))
    }
}

/// Compares two obstacle sides along the sweep line.
///
/// Obstacle sides never cross, so this is just a matter of which side of `b`
/// the crossing of `a` lies on.
pub fn compare_obstacle_sides(frame: &SweepFrame, a: &ObstacleSide, b: &ObstacleSide) -> Ordering {
    let x = frame.crossing(a.start, a.direction());
    match orientation(b.start, b.end, x) {
        Orientation::Collinear => Ordering::Equal,
        Orientation::Clockwise => Ordering::Greater,
        Orientation::Counterclockwise => Ordering::Less,
    }
}
