//! The sweep status: ordered collections of everything the sweep line crosses.
//!
//! There are four of these during a sweep. Left cone sides and right cone
//! sides live in separate [`SideTree`]s, and left and right obstacle sides in
//! separate [`ObstacleSideTree`]s. All of them are ordered from left to right
//! along the sweep line, using the comparators in [`crate::order`].
//!
//! The order is only valid at the current sweep line position, so every
//! operation that needs it takes a [`SweepFrame`]. Searches by predicate don't
//! need the frame, but the predicate has to be monotone over the current order
//! (false, false, ..., true, true for `find_first`; true, ..., false for
//! `find_last`).

use std::cmp::Ordering;

use crate::order::{compare_cone_sides, compare_obstacle_sides, SweepFrame};
use crate::treevec::TreeVec;

use super::cone::{ConeSide, SideIdx, SideVec};
use super::obstacle_side::ObstacleSide;

const CHUNK: usize = 32;

/// Cone sides (all left, or all right) currently crossed by the sweep line.
#[derive(Clone, Debug, Default)]
pub struct SideTree {
    tree: TreeVec<SideIdx, CHUNK>,
}

impl SideTree {
    /// Inserts a side at its place in the order, returning its position.
    ///
    /// Sides comparing equal to existing ones go after them.
    pub fn insert(&mut self, frame: &SweepFrame, sides: &SideVec<ConeSide>, side: SideIdx) -> usize {
        let pos = self
            .tree
            .partition_point(|s| compare_cone_sides(frame, sides, side, *s) != Ordering::Less);
        self.tree.insert(pos, side);
        pos
    }

    /// Finds the position of `side` by binary search.
    ///
    /// This can fail if the sweep line has moved so far that the stored order
    /// no longer agrees with the comparator.
    pub fn position(&self, frame: &SweepFrame, sides: &SideVec<ConeSide>, side: SideIdx) -> Option<usize> {
        let start = self
            .tree
            .partition_point(|s| compare_cone_sides(frame, sides, *s, side) == Ordering::Less);
        (start..self.tree.len())
            .map_while(|i| {
                let s = self.tree[i];
                (compare_cone_sides(frame, sides, s, side) == Ordering::Equal).then_some((i, s))
            })
            .find(|(_, s)| *s == side)
            .map(|(i, _)| i)
    }

    /// Finds the position of `side` by looking at every element.
    pub fn position_linear(&self, side: SideIdx) -> Option<usize> {
        self.tree.iter().position(|s| *s == side)
    }

    /// Removes and returns the side at `pos`.
    pub fn remove_at(&mut self, pos: usize) -> SideIdx {
        self.tree.remove(pos)
    }

    /// The side at `pos`, if there is one.
    pub fn get(&self, pos: usize) -> Option<SideIdx> {
        self.tree.get(pos).copied()
    }

    /// The number of sides.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Is the tree empty?
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Iterates over the sides from left to right.
    pub fn iter(&self) -> impl Iterator<Item = SideIdx> + '_ {
        self.tree.iter().copied()
    }

    /// The position of the first side satisfying `pred`.
    pub fn find_first(&self, mut pred: impl FnMut(SideIdx) -> bool) -> Option<usize> {
        let pos = self.tree.partition_point(|s| !pred(*s));
        (pos < self.tree.len()).then_some(pos)
    }

    /// The position of the last side satisfying `pred`.
    pub fn find_last(&self, mut pred: impl FnMut(SideIdx) -> bool) -> Option<usize> {
        self.tree.partition_point(|s| pred(*s)).checked_sub(1)
    }
}

/// Obstacle sides (all left, or all right) currently crossed by the sweep line.
#[derive(Clone, Debug, Default)]
pub struct ObstacleSideTree {
    tree: TreeVec<ObstacleSide, CHUNK>,
}

impl ObstacleSideTree {
    /// Inserts a side at its place in the order, returning its position.
    pub fn insert(&mut self, frame: &SweepFrame, side: ObstacleSide) -> usize {
        let pos = self
            .tree
            .partition_point(|s| compare_obstacle_sides(frame, &side, s) != Ordering::Less);
        self.tree.insert(pos, side);
        pos
    }

    /// Finds the position of a side that is the [same side](ObstacleSide::same_side)
    /// as `side`, by binary search.
    pub fn position(&self, frame: &SweepFrame, side: &ObstacleSide) -> Option<usize> {
        let start = self
            .tree
            .partition_point(|s| compare_obstacle_sides(frame, s, side) == Ordering::Less);
        (start..self.tree.len())
            .map_while(|i| {
                let s = &self.tree[i];
                (compare_obstacle_sides(frame, s, side) == Ordering::Equal).then_some((i, s))
            })
            .find(|(_, s)| s.same_side(side))
            .map(|(i, _)| i)
    }

    /// Finds the position of a side that is the same side as `side`, by
    /// looking at every element.
    pub fn position_linear(&self, side: &ObstacleSide) -> Option<usize> {
        self.tree.iter().position(|s| s.same_side(side))
    }

    /// Removes and returns the side at `pos`.
    pub fn remove_at(&mut self, pos: usize) -> ObstacleSide {
        self.tree.remove(pos)
    }

    /// The side at `pos`, if there is one.
    pub fn get(&self, pos: usize) -> Option<&ObstacleSide> {
        self.tree.get(pos)
    }

    /// The number of sides.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Is the tree empty?
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Iterates over the sides from left to right.
    pub fn iter(&self) -> impl Iterator<Item = &ObstacleSide> + '_ {
        self.tree.iter()
    }

    /// The first side satisfying `pred`.
    pub fn find_first(&self, mut pred: impl FnMut(&ObstacleSide) -> bool) -> Option<&ObstacleSide> {
        let pos = self.tree.partition_point(|s| !pred(s));
        self.tree.get(pos)
    }

    /// The last side satisfying `pred`.
    pub fn find_last(&self, mut pred: impl FnMut(&ObstacleSide) -> bool) -> Option<&ObstacleSide> {
        let pos = self.tree.partition_point(|s| pred(s)).checked_sub(1)?;
        self.tree.get(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point;
    use crate::polyline::Polyline;
    use crate::sweep::cone::Cones;
    use crate::sweep::obstacle_side::VertexRef;

    fn up(z: f64) -> SweepFrame {
        SweepFrame::new(Point::new(0.0, 1.0), z)
    }

    #[test]
    fn sides_stay_sorted() {
        let frame = up(0.0);
        let mut cones = Cones::default();
        let mut tree = SideTree::default();
        let mut lefts = Vec::new();
        for x in [3.0, -1.0, 7.0, 0.0] {
            let c = cones.new_cone(Point::new(x, 0.0), Point::new(-1.0, 1.0), Point::new(1.0, 1.0));
            let left = cones.cones[c].left_side;
            tree.insert(&frame, &cones.sides, left);
            lefts.push(left);
        }
        let xs: Vec<f64> = tree.iter().map(|s| cones.sides[s].start.x).collect();
        assert_eq!(xs, vec![-1.0, 0.0, 3.0, 7.0]);

        for &s in &lefts {
            let pos = tree.position(&frame, &cones.sides, s).unwrap();
            assert_eq!(tree.get(pos), Some(s));
            assert_eq!(tree.position_linear(s), Some(pos));
        }

        let pos = tree.position(&frame, &cones.sides, lefts[0]).unwrap();
        assert_eq!(tree.remove_at(pos), lefts[0]);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.position(&frame, &cones.sides, lefts[0]), None);
    }

    #[test]
    fn equal_sides_are_told_apart() {
        let frame = up(0.0);
        let mut cones = Cones::default();
        let mut tree = SideTree::default();
        let apex = Point::new(1.0, 1.0);
        let a = cones.new_cone(apex, Point::new(-1.0, 1.0), Point::new(1.0, 1.0));
        let b = cones.new_cone(apex, Point::new(-1.0, 1.0), Point::new(1.0, 1.0));
        let la = cones.cones[a].left_side;
        let lb = cones.cones[b].left_side;
        tree.insert(&frame, &cones.sides, la);
        tree.insert(&frame, &cones.sides, lb);
        assert_eq!(tree.position(&frame, &cones.sides, la), Some(0));
        assert_eq!(tree.position(&frame, &cones.sides, lb), Some(1));
    }

    #[test]
    fn predicate_searches() {
        let frame = up(0.0);
        let mut cones = Cones::default();
        let mut tree = SideTree::default();
        for x in [0.0, 1.0, 2.0, 3.0] {
            let c = cones.new_cone(Point::new(x, 0.0), Point::new(-1.0, 1.0), Point::new(1.0, 1.0));
            tree.insert(&frame, &cones.sides, cones.cones[c].left_side);
        }
        let x = |s: SideIdx| cones.sides[s].start.x;
        assert_eq!(tree.find_first(|s| x(s) > 1.5), Some(2));
        assert_eq!(tree.find_first(|s| x(s) > 10.0), None);
        assert_eq!(tree.find_last(|s| x(s) < 1.5), Some(1));
        assert_eq!(tree.find_last(|s| x(s) < -1.0), None);
    }

    #[test]
    fn obstacle_sides() {
        let obstacles = [
            Polyline::closed([(4.0, 0.0), (4.0, 2.0), (5.0, 2.0), (5.0, 0.0)]),
            Polyline::closed([(0.0, 0.0), (0.0, 2.0), (1.0, 2.0), (1.0, 0.0)]),
        ];
        let frame = up(1.0);
        let v = |obstacle: usize| VertexRef {
            obstacle,
            node: obstacles[obstacle].start().unwrap(),
        };
        let mut tree = ObstacleSideTree::default();
        let far = ObstacleSide::left(v(0), &obstacles);
        let near = ObstacleSide::left(v(1), &obstacles);
        assert_eq!(tree.insert(&frame, far), 0);
        assert_eq!(tree.insert(&frame, near), 0);
        assert_eq!(tree.position(&frame, &far), Some(1));
        assert_eq!(tree.position_linear(&near), Some(0));
        assert_eq!(
            tree.find_first(|s| s.start.x > 2.0).map(|s| s.start_vertex),
            Some(v(0))
        );
        assert_eq!(
            tree.find_last(|s| s.start.x < 2.0).map(|s| s.start_vertex),
            Some(v(1))
        );
        assert!(tree.remove_at(0).same_side(&near));
        assert_eq!(tree.len(), 1);
    }
}
