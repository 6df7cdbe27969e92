//! Polylines stored as linked nodes in an arena.
//!
//! Obstacles are closed polylines that never change during a sweep. The border
//! polyline is different: when a cone reaches the border, the sweep inserts the
//! cone's closing point into it. Node handles stay valid across insertions.

use kurbo::{BezPath, PathEl};

use crate::geom::{orientation, Orientation, Point};

typed_vec!(
    /// Storage for the nodes of a [`Polyline`], indexed by [`NodeIdx`].
    NodeVec,
    /// A handle to a node of a [`Polyline`].
    ///
    /// Handles are only meaningful for the polyline that created them.
    NodeIdx,
    "n"
);

/// One vertex of a polyline, with links to its neighbors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolylineNode {
    /// Where this vertex is.
    pub point: Point,
    prev: Option<NodeIdx>,
    next: Option<NodeIdx>,
}

/// A sequence of points, either open or closed.
///
/// The links between nodes are stored without wrapping around: the first node
/// has no `prev` and the last node has no `next`, even when the polyline is
/// closed. Use [`Polyline::next_on_polyline`] and [`Polyline::prev_on_polyline`]
/// to walk around a closed polyline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polyline {
    nodes: NodeVec<PolylineNode>,
    start: Option<NodeIdx>,
    end: Option<NodeIdx>,
    closed: bool,
}

fn dedup_points(ps: impl IntoIterator<Item = impl Into<Point>>, closed: bool) -> Vec<Point> {
    let mut ret: Vec<Point> = Vec::new();
    for p in ps {
        let p = p.into();
        if ret.last().is_none_or(|q| !q.close_dist_eps(p)) {
            ret.push(p);
        }
    }
    if closed && ret.len() > 1 && ret[0].close_dist_eps(ret[ret.len() - 1]) {
        ret.pop();
    }
    ret
}

impl Polyline {
    fn from_points(points: Vec<Point>, closed: bool) -> Self {
        let mut ret = Polyline {
            closed,
            ..Default::default()
        };
        for p in points {
            match ret.end {
                Some(end) => {
                    ret.insert_after(end, p);
                }
                None => {
                    let idx = ret.nodes.push(PolylineNode {
                        point: p,
                        prev: None,
                        next: None,
                    });
                    ret.start = Some(idx);
                    ret.end = Some(idx);
                }
            }
        }
        ret
    }

    /// Creates a closed polyline through the given points.
    ///
    /// Consecutive points closer than [`DISTANCE_EPSILON`](crate::DISTANCE_EPSILON)
    /// are merged, and the last point is dropped if it coincides with the first.
    pub fn closed<P: Into<Point>>(ps: impl IntoIterator<Item = P>) -> Self {
        Self::from_points(dedup_points(ps, true), true)
    }

    /// Creates an open polyline through the given points.
    pub fn open<P: Into<Point>>(ps: impl IntoIterator<Item = P>) -> Self {
        Self::from_points(dedup_points(ps, false), false)
    }

    /// Converts a path into polylines, one per subpath.
    ///
    /// Curves are flattened to within `tolerance`. Subpaths that end with a
    /// `ClosePath` become closed polylines; the rest stay open.
    pub fn from_bez_path(path: &BezPath, tolerance: f64) -> Vec<Polyline> {
        let mut ret = Vec::new();
        let mut current: Vec<Point> = Vec::new();
        let mut closed = false;
        let mut finish = |current: &mut Vec<Point>, closed: bool| {
            if !current.is_empty() {
                let points = dedup_points(current.drain(..), closed);
                ret.push(Polyline::from_points(points, closed));
            }
        };

        kurbo::flatten(path.iter(), tolerance, |el| match el {
            PathEl::MoveTo(p) => {
                finish(&mut current, std::mem::take(&mut closed));
                current.push(p.into());
            }
            PathEl::LineTo(p) => current.push(p.into()),
            PathEl::ClosePath => closed = true,
            // flatten only emits straight lines
            PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
        });
        finish(&mut current, closed);
        ret
    }

    /// A closed, clockwise rectangle around all the given polylines, with `padding`
    /// added on every side.
    ///
    /// The corners are listed top-left, top-right, bottom-right, bottom-left
    /// (with the `y` axis pointing up). Returns `None` if there are no points.
    pub fn bounding_box_border(obstacles: &[Polyline], padding: f64) -> Option<Polyline> {
        let bbox = obstacles
            .iter()
            .filter_map(Polyline::bounding_box)
            .reduce(|a, b| a.union(b))?
            .inflate(padding, padding);
        Some(Polyline::closed([
            (bbox.x0, bbox.y1),
            (bbox.x1, bbox.y1),
            (bbox.x1, bbox.y0),
            (bbox.x0, bbox.y0),
        ]))
    }

    /// The smallest axis-aligned rectangle containing every point.
    pub fn bounding_box(&self) -> Option<kurbo::Rect> {
        self.points()
            .map(|p| kurbo::Rect::from_points(p.to_kurbo(), p.to_kurbo()))
            .reduce(|a, b| a.union(b))
    }

    /// The first node, if there is one.
    pub fn start(&self) -> Option<NodeIdx> {
        self.start
    }

    /// The last node, if there is one.
    pub fn end(&self) -> Option<NodeIdx> {
        self.end
    }

    /// Is this polyline closed?
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Are there no nodes at all?
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The position of a node.
    pub fn point(&self, idx: NodeIdx) -> Point {
        self.nodes[idx].point
    }

    /// The node after `idx`, not wrapping around.
    pub fn next(&self, idx: NodeIdx) -> Option<NodeIdx> {
        self.nodes[idx].next
    }

    /// The node before `idx`, not wrapping around.
    pub fn prev(&self, idx: NodeIdx) -> Option<NodeIdx> {
        self.nodes[idx].prev
    }

    /// The node after `idx`, wrapping from the end to the start if we're closed.
    pub fn next_on_polyline(&self, idx: NodeIdx) -> Option<NodeIdx> {
        match self.nodes[idx].next {
            Some(next) => Some(next),
            None if self.closed => self.start,
            None => None,
        }
    }

    /// The node before `idx`, wrapping from the start to the end if we're closed.
    pub fn prev_on_polyline(&self, idx: NodeIdx) -> Option<NodeIdx> {
        match self.nodes[idx].prev {
            Some(prev) => Some(prev),
            None if self.closed => self.end,
            None => None,
        }
    }

    /// Inserts a new point right after `node`, returning the new node.
    ///
    /// If `node` was the last node, the new one becomes the last node.
    pub fn insert_after(&mut self, node: NodeIdx, point: Point) -> NodeIdx {
        let next = self.nodes[node].next;
        let new = self.nodes.push(PolylineNode {
            point,
            prev: Some(node),
            next,
        });
        self.nodes[node].next = Some(new);
        match next {
            Some(next) => self.nodes[next].prev = Some(new),
            None => self.end = Some(new),
        }
        new
    }

    /// Iterates over the nodes in polyline order, from start to end.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        std::iter::successors(self.start, |idx| self.nodes[*idx].next)
    }

    /// Iterates over the points in polyline order, from start to end.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.node_indices().map(|idx| self.nodes[idx].point)
    }

    /// Twice the signed area enclosed by this polyline (treating it as closed).
    ///
    /// Positive for counter-clockwise polylines.
    pub fn doubled_signed_area(&self) -> f64 {
        let points: Vec<_> = self.points().collect();
        let Some(&last) = points.last() else {
            return 0.0;
        };
        let mut prev = last;
        let mut area = 0.0;
        for &p in &points {
            area += prev.cross(p);
            prev = p;
        }
        area
    }

    /// Is this polyline oriented clockwise?
    ///
    /// Polylines with fewer than three points (or with zero area) count as clockwise.
    pub fn is_clockwise(&self) -> bool {
        self.doubled_signed_area() <= 0.0
    }

    /// Does this polyline (treated as closed) bound a convex region?
    ///
    /// Either orientation is accepted, and (almost) collinear vertices are
    /// allowed. Polylines with fewer than three points are convex.
    pub fn is_convex(&self) -> bool {
        let points: Vec<_> = self.points().collect();
        let n = points.len();
        if n < 3 {
            return true;
        }
        let mut cw = false;
        let mut ccw = false;
        let mut turning = 0.0f64;
        for i in 0..n {
            let a = points[(i + n - 1) % n];
            let b = points[i];
            let c = points[(i + 1) % n];
            match orientation(a, b, c) {
                Orientation::Clockwise => cw = true,
                Orientation::Counterclockwise => ccw = true,
                Orientation::Collinear => {}
            }
            let (u, v) = (b - a, c - b);
            turning += u.cross(v).atan2(u.dot(v));
        }
        // A star turns the same way at every vertex, but goes around twice.
        !(cw && ccw) && turning.abs() < 3.0 * std::f64::consts::PI
    }

    /// The same points, in the opposite order.
    pub fn reversed(&self) -> Polyline {
        let points: Vec<_> = self.points().collect();
        Polyline::from_points(points.into_iter().rev().collect(), self.closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polyline {
        Polyline::closed([(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)])
    }

    #[test]
    fn closed_wraps_around() {
        let sq = square();
        let start = sq.start().unwrap();
        let end = sq.end().unwrap();
        assert_eq!(sq.len(), 4);
        assert_eq!(sq.next(end), None);
        assert_eq!(sq.next_on_polyline(end), Some(start));
        assert_eq!(sq.prev_on_polyline(start), Some(end));
        assert!(sq.is_clockwise());
        assert!(!sq.reversed().is_clockwise());
    }

    #[test]
    fn open_does_not_wrap() {
        let line = Polyline::open([(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let start = line.start().unwrap();
        let end = line.end().unwrap();
        assert_eq!(line.next_on_polyline(end), None);
        assert_eq!(line.prev_on_polyline(start), None);
    }

    #[test]
    fn dedup() {
        let p = Polyline::closed([(0.0, 0.0), (1.0, 0.0), (1.0, 1e-9), (1.0, 1.0), (0.0, 0.0)]);
        assert_eq!(
            p.points().collect::<Vec<_>>(),
            vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0)
            ]
        );

        let single = Polyline::closed([(2.0, 2.0), (2.0, 2.0)]);
        assert_eq!(single.len(), 1);
        let start = single.start().unwrap();
        assert_eq!(single.next_on_polyline(start), Some(start));
    }

    #[test]
    fn insert_after_keeps_links() {
        let mut line = Polyline::open([(0.0, 0.0), (2.0, 0.0)]);
        let start = line.start().unwrap();
        let mid = line.insert_after(start, Point::new(1.0, 0.0));
        let end = line.end().unwrap();
        assert_eq!(line.next(start), Some(mid));
        assert_eq!(line.prev(end), Some(mid));
        assert_eq!(line.prev(mid), Some(start));
        assert_eq!(line.next(mid), Some(end));

        let new_end = line.insert_after(end, Point::new(3.0, 0.0));
        assert_eq!(line.end(), Some(new_end));
        assert_eq!(line.next(end), Some(new_end));

        for idx in line.node_indices() {
            if let Some(next) = line.next(idx) {
                assert_eq!(line.prev(next), Some(idx));
            }
        }
        assert_eq!(
            line.points().map(|p| p.x).collect::<Vec<_>>(),
            vec![0.0, 1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn convexity() {
        assert!(square().is_convex());
        assert!(square().reversed().is_convex());
        assert!(Polyline::closed([(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (2.0, 2.0), (2.0, 0.0)]).is_convex());
        assert!(Polyline::closed([(3.0, 3.0)]).is_convex());

        let ell = Polyline::closed([
            (0.0, 0.0),
            (0.0, 10.0),
            (3.0, 10.0),
            (3.0, 3.0),
            (10.0, 3.0),
            (10.0, 0.0),
        ]);
        assert!(ell.is_clockwise());
        assert!(!ell.is_convex());
        assert!(!ell.reversed().is_convex());

        let star: Vec<_> = (0..5)
            .map(|i| {
                let theta = -(i as f64) * 4.0 * std::f64::consts::PI / 5.0;
                (10.0 * theta.cos(), 10.0 * theta.sin())
            })
            .collect();
        assert!(!Polyline::closed(star).is_convex());
    }

    #[test]
    fn border_is_clockwise_rectangle() {
        let border = Polyline::bounding_box_border(&[square()], 1.0).unwrap();
        assert!(border.is_closed());
        assert!(border.is_clockwise());
        assert_eq!(
            border.points().collect::<Vec<_>>(),
            vec![
                Point::new(-1.0, 2.0),
                Point::new(2.0, 2.0),
                Point::new(2.0, -1.0),
                Point::new(-1.0, -1.0)
            ]
        );
        assert_eq!(Polyline::bounding_box_border(&[], 1.0), None);
    }

    #[test]
    fn bez_path_subpaths() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((0.0, 1.0));
        path.line_to((1.0, 1.0));
        path.close_path();
        path.move_to((5.0, 5.0));
        path.line_to((6.0, 5.0));

        let polys = Polyline::from_bez_path(&path, 0.1);
        assert_eq!(polys.len(), 2);
        assert!(polys[0].is_closed());
        assert_eq!(polys[0].len(), 3);
        assert!(!polys[1].is_closed());
        assert_eq!(polys[1].len(), 2);
    }
}
