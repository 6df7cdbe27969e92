//! Cones and their sides, stored in arenas.
//!
//! A cone is born with two straight sides going out from its apex. When one
//! of those sides runs into an obstacle, it is replaced by a *broken* side that
//! follows the obstacle edge up to its end vertex. Cones refer to their current
//! sides by [`SideIdx`], and sides refer back to their cone by [`ConeIdx`].

use crate::geom::Point;

use super::obstacle_side::VertexRef;

typed_vec!(
    /// Storage for cones, indexed by [`ConeIdx`].
    ConeVec,
    /// A handle to a cone.
    ConeIdx,
    "c"
);

typed_vec!(
    /// Storage for cone sides, indexed by [`SideIdx`].
    SideVec,
    /// A handle to a cone side.
    SideIdx,
    "cs"
);

/// What sort of cone side this is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SideKind {
    /// A straight left side, starting at the apex.
    Left,
    /// A straight right side, starting at the apex.
    Right,
    /// A side running along an obstacle edge, replacing `original`.
    Broken {
        /// The obstacle vertex where this side ends.
        end_vertex: VertexRef,
        /// The position of `end_vertex`.
        end: Point,
        /// The straight side that this one replaced.
        original: SideIdx,
    },
}

/// One side of a cone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConeSide {
    /// Where the side starts: the apex for straight sides, or the point where
    /// a straight side hit an obstacle for broken ones.
    pub start: Point,
    /// The direction of the side. For broken sides, this is `end - start`.
    pub direction: Point,
    /// Straight or broken.
    pub kind: SideKind,
    /// The cone that owns this side.
    pub cone: ConeIdx,
    /// Set once the side has been taken out of its tree.
    pub removed: bool,
}

impl ConeSide {
    /// A second point on the line through this side.
    pub fn second_point(&self) -> Point {
        self.start + self.direction
    }

    /// Is this a straight side?
    pub fn is_plain(&self) -> bool {
        !matches!(self.kind, SideKind::Broken { .. })
    }
}

/// A cone, with its apex at an obstacle vertex or a port.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cone {
    /// The apex.
    pub apex: Point,
    /// The current left side.
    pub left_side: SideIdx,
    /// The current right side.
    pub right_side: SideIdx,
    /// Set once the cone has been closed.
    pub removed: bool,
}

/// The arenas of cones and cone sides for one sweep.
#[derive(Clone, Debug, Default)]
pub struct Cones {
    /// Every cone created so far, including removed ones.
    pub cones: ConeVec<Cone>,
    /// Every cone side created so far, including removed ones.
    pub sides: SideVec<ConeSide>,
}

impl Cones {
    fn push_side(&mut self, cone: ConeIdx, start: Point, direction: Point, kind: SideKind) -> SideIdx {
        self.sides.push(ConeSide {
            start,
            direction,
            kind,
            cone,
            removed: false,
        })
    }

    /// Creates a cone with two straight sides.
    pub fn new_cone(&mut self, apex: Point, left_dir: Point, right_dir: Point) -> ConeIdx {
        let cone = self.cones.next_idx();
        let left_side = self.push_side(cone, apex, left_dir, SideKind::Left);
        let right_side = self.push_side(cone, apex, right_dir, SideKind::Right);
        self.cones.push(Cone {
            apex,
            left_side,
            right_side,
            removed: false,
        })
    }

    /// Replaces the current side of a cone that `original` belongs to by a
    /// broken side from `start` to `end_vertex`.
    ///
    /// `original` must be a straight side. It doesn't need to be the cone's
    /// current side (or to have ever been in a tree): new cones whose side
    /// starts out along an obstacle are built this way.
    pub fn break_side(&mut self, original: SideIdx, start: Point, end_vertex: VertexRef, end: Point) -> SideIdx {
        let orig = self.sides[original];
        debug_assert!(orig.is_plain());
        let broken = self.push_side(
            orig.cone,
            start,
            end - start,
            SideKind::Broken {
                end_vertex,
                end,
                original,
            },
        );
        if self.is_left(original) {
            self.cones[orig.cone].left_side = broken;
        } else {
            self.cones[orig.cone].right_side = broken;
        }
        broken
    }

    /// Creates a cone whose left side starts out broken along an obstacle edge.
    pub fn new_cone_with_broken_left(
        &mut self,
        apex: Point,
        left_dir: Point,
        right_dir: Point,
        end_vertex: VertexRef,
        end: Point,
    ) -> ConeIdx {
        let cone = self.new_cone(apex, left_dir, right_dir);
        let left = self.cones[cone].left_side;
        self.break_side(left, apex, end_vertex, end);
        cone
    }

    /// Creates a cone whose right side starts out broken along an obstacle edge.
    pub fn new_cone_with_broken_right(
        &mut self,
        apex: Point,
        left_dir: Point,
        right_dir: Point,
        end_vertex: VertexRef,
        end: Point,
    ) -> ConeIdx {
        let cone = self.new_cone(apex, left_dir, right_dir);
        let right = self.cones[cone].right_side;
        self.break_side(right, apex, end_vertex, end);
        cone
    }

    /// Is this a left side (straight, or broken from a straight left side)?
    pub fn is_left(&self, side: SideIdx) -> bool {
        match self.sides[side].kind {
            SideKind::Left => true,
            SideKind::Right => false,
            SideKind::Broken { original, .. } => self.sides[original].kind == SideKind::Left,
        }
    }
}
