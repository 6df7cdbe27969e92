//! Obstacle edges, as seen by the sweep line.

use crate::geom::Point;
use crate::polyline::{NodeIdx, Polyline};

/// A vertex of one of the obstacles being swept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexRef {
    /// The index of the obstacle in the sweep's obstacle list.
    pub obstacle: usize,
    /// The vertex within that obstacle.
    pub node: NodeIdx,
}

impl VertexRef {
    /// The position of this vertex.
    pub fn point(self, obstacles: &[Polyline]) -> Point {
        obstacles[self.obstacle].point(self.node)
    }

    /// The next vertex of the obstacle, going clockwise.
    pub fn next(self, obstacles: &[Polyline]) -> VertexRef {
        VertexRef {
            node: obstacles[self.obstacle]
                .next_on_polyline(self.node)
                .unwrap_or(self.node),
            ..self
        }
    }

    /// The previous vertex of the obstacle, going clockwise.
    pub fn prev(self, obstacles: &[Polyline]) -> VertexRef {
        VertexRef {
            node: obstacles[self.obstacle]
                .prev_on_polyline(self.node)
                .unwrap_or(self.node),
            ..self
        }
    }
}

/// Which side of its obstacle an obstacle side bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObstacleSideKind {
    /// A side on the left of the obstacle, running from a vertex to the next one.
    Left,
    /// A side on the right of the obstacle, running from a vertex to the previous one.
    Right,
}

/// An edge of an obstacle that is currently crossed by the sweep line.
///
/// Two obstacle sides are the same side if they have the same kind and the
/// same start vertex; the cached positions are only there for the comparator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObstacleSide {
    /// Left or right.
    pub kind: ObstacleSideKind,
    /// The vertex the side starts at.
    pub start_vertex: VertexRef,
    /// The vertex the side ends at.
    pub end_vertex: VertexRef,
    /// The position of `start_vertex`.
    pub start: Point,
    /// The position of `end_vertex`.
    pub end: Point,
}

impl ObstacleSide {
    /// The left side starting at `v`, which runs to the vertex after `v`.
    pub fn left(v: VertexRef, obstacles: &[Polyline]) -> Self {
        let end_vertex = v.next(obstacles);
        ObstacleSide {
            kind: ObstacleSideKind::Left,
            start_vertex: v,
            end_vertex,
            start: v.point(obstacles),
            end: end_vertex.point(obstacles),
        }
    }

    /// The right side starting at `v`, which runs to the vertex before `v`.
    pub fn right(v: VertexRef, obstacles: &[Polyline]) -> Self {
        let end_vertex = v.prev(obstacles);
        ObstacleSide {
            kind: ObstacleSideKind::Right,
            start_vertex: v,
            end_vertex,
            start: v.point(obstacles),
            end: end_vertex.point(obstacles),
        }
    }

    /// Is this the same side as `other`?
    pub fn same_side(&self, other: &ObstacleSide) -> bool {
        self.kind == other.kind && self.start_vertex == other.start_vertex
    }

    /// The direction of this side, from start to end.
    pub fn direction(&self) -> Point {
        self.end - self.start
    }
}
